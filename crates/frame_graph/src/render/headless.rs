//! Software backend without a graphics context
//!
//! Records what the graph hands it and rasterizes square point splats into
//! an in-memory identifier target. Used by tests, tools and the demo to drive
//! full draw cycles, including exact picking, without a GPU.

use std::any::Any;

use crate::foundation::math::{Mat4, Point3, Vec4, constants::EPSILON};
use crate::input::picking::{IdColor, IdentifierBuffer};
use crate::render::backend::{RenderBackend, VisualHints};
use crate::render::matrix_handler::ndc_to_pixels;

/// In-memory [`RenderBackend`]
#[derive(Debug, Clone)]
pub struct HeadlessBackend {
    width: u32,
    height: u32,
    projection: Mat4,
    model_view: Mat4,
    supports_identifiers: bool,
    target: Option<IdentifierBuffer>,
    identifier: Option<IdColor>,
    hints: Vec<VisualHints>,
    projection_binds: usize,
    model_view_binds: usize,
    splats: usize,
}

impl HeadlessBackend {
    /// Create a backend with an identifier target of the given size
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            projection: Mat4::identity(),
            model_view: Mat4::identity(),
            supports_identifiers: true,
            target: None,
            identifier: None,
            hints: Vec::new(),
            projection_binds: 0,
            model_view_binds: 0,
            splats: 0,
        }
    }

    /// Builder: drop identifier target support, as on a display-only context
    pub fn without_identifier_target(mut self) -> Self {
        self.supports_identifiers = false;
        self
    }

    /// Projection most recently bound
    pub fn projection(&self) -> &Mat4 {
        &self.projection
    }

    /// Model-view most recently bound
    pub fn model_view(&self) -> &Mat4 {
        &self.model_view
    }

    /// Visual hints drawn since creation or the last [`HeadlessBackend::clear`]
    pub fn hints_drawn(&self) -> &[VisualHints] {
        &self.hints
    }

    /// Number of `(projection, model-view)` binds received
    pub fn bind_counts(&self) -> (usize, usize) {
        (self.projection_binds, self.model_view_binds)
    }

    /// Number of splats drawn outside identifier passes
    pub fn display_splats(&self) -> usize {
        self.splats
    }

    /// Whether an identifier pass is in progress
    pub fn in_identifier_pass(&self) -> bool {
        self.target.is_some()
    }

    /// Forget recorded hints and counters
    pub fn clear(&mut self) {
        self.hints.clear();
        self.projection_binds = 0;
        self.model_view_binds = 0;
        self.splats = 0;
    }

    /// Pixel position and window depth of a point in the bound model space
    pub fn project(&self, local: &Point3) -> Option<Point3> {
        let clip = self.projection * self.model_view * Vec4::new(local.x, local.y, local.z, 1.0);
        if clip.w.abs() < EPSILON {
            return None;
        }
        Some(Point3::from(ndc_to_pixels(&(clip.xyz() / clip.w), self.width, self.height)))
    }

    /// Draw a screen-aligned square of `half_size` pixels around a point
    ///
    /// During an identifier pass the square is filled with the current
    /// identifier color. Points behind the eye or outside the depth range
    /// are dropped. Returns whether anything was drawn.
    pub fn splat(&mut self, local: &Point3, half_size: f32) -> bool {
        let Some(center) = self.project(local) else {
            return false;
        };
        if !(0.0..=1.0).contains(&center.z) {
            return false;
        }
        match (self.target.as_mut(), self.identifier) {
            (Some(target), Some(color)) => {
                target.fill_rect(
                    center.x - half_size,
                    center.y - half_size,
                    center.x + half_size,
                    center.y + half_size,
                    color.to_argb(),
                );
                true
            }
            (Some(_), None) => false,
            (None, _) => {
                self.splats += 1;
                true
            }
        }
    }
}

impl RenderBackend for HeadlessBackend {
    fn bind_projection(&mut self, projection: &Mat4) {
        self.projection = *projection;
        self.projection_binds += 1;
    }

    fn bind_model_view(&mut self, model_view: &Mat4) {
        self.model_view = *model_view;
        self.model_view_binds += 1;
    }

    fn draw_visual_hint(&mut self, hint: VisualHints, _scene_radius: f32) {
        self.hints.push(hint);
    }

    fn begin_identifier_pass(&mut self, width: u32, height: u32) -> bool {
        if !self.supports_identifiers {
            return false;
        }
        self.width = width;
        self.height = height;
        self.target = Some(IdentifierBuffer::new(width, height));
        self.identifier = None;
        true
    }

    fn set_identifier(&mut self, color: IdColor) {
        self.identifier = Some(color);
    }

    fn end_identifier_pass(&mut self) -> Option<IdentifierBuffer> {
        self.identifier = None;
        self.target.take()
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splat_fills_identifier_target() {
        let mut backend = HeadlessBackend::new(100, 100);
        assert!(backend.begin_identifier_pass(100, 100));
        backend.set_identifier(IdColor::from_id(42).unwrap());
        assert!(backend.splat(&Point3::origin(), 5.0));
        let buffer = backend.end_identifier_pass().unwrap();
        assert_eq!(buffer.decode(50.0, 50.0), Some(42));
        assert_eq!(buffer.decode(46.0, 54.0), Some(42));
        assert_eq!(buffer.decode(56.0, 50.0), None);
        assert!(!backend.in_identifier_pass());
    }

    #[test]
    fn test_display_splats_are_counted() {
        let mut backend = HeadlessBackend::new(100, 100);
        assert!(backend.splat(&Point3::new(0.5, 0.5, 0.0), 1.0));
        assert!(!backend.splat(&Point3::new(0.0, 0.0, 3.0), 1.0));
        assert_eq!(backend.display_splats(), 1);
    }

    #[test]
    fn test_display_only_backend_refuses_identifier_pass() {
        let mut backend = HeadlessBackend::new(10, 10).without_identifier_target();
        assert!(!backend.begin_identifier_pass(10, 10));
        assert!(backend.end_identifier_pass().is_none());
    }

    #[test]
    fn test_downcast_from_trait_object() {
        let mut backend = HeadlessBackend::new(10, 10);
        let dynamic: &mut dyn RenderBackend = &mut backend;
        assert!(dynamic.as_any_mut().downcast_mut::<HeadlessBackend>().is_some());
    }
}
