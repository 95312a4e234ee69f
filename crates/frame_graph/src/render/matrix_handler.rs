//! Projection and model-view stacks
//!
//! The handler owns two matrix stacks whose base entries are loaded by
//! [`MatrixHandler::bind`] once per traversal. Every push is paired with a pop
//! through a scoped guard ([`MatrixScope`]) that pops on drop, so early
//! returns and panicking draw callbacks cannot leave a stack unbalanced.
//!
//! The handler also caches `projection * view` and, optionally, its inverse.
//! The inverse is computed eagerly at bind time while caching is enabled and
//! recomputed per query otherwise.

use std::ops::{Deref, DerefMut};

use crate::foundation::math::{Mat4, Point3, Vec3, Vec4, constants::EPSILON};
use crate::geom::Transform;
use crate::scene::error::GraphError;

/// Which of the two stacks an operation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StackKind {
    /// Model-view stack
    ModelView,
    /// Projection stack
    Projection,
}

/// Cached matrix tagged with the bind it was computed for
#[derive(Debug, Clone, Copy)]
struct Stamped {
    matrix: Mat4,
    bind: u64,
}

/// Matrix stacks plus the cached projection-view data of the current bind
#[derive(Debug, Clone)]
pub struct MatrixHandler {
    model_view: Vec<Mat4>,
    projection: Vec<Mat4>,
    view: Mat4,
    projection_view: Mat4,
    projection_view_inverse: Option<Stamped>,
    cache_inverse: bool,
    bind_count: u64,
    width: u32,
    height: u32,
}

impl MatrixHandler {
    /// Create a handler for a viewport of `width` x `height` pixels
    pub fn new(width: u32, height: u32, cache_inverse: bool) -> Self {
        Self {
            model_view: vec![Mat4::identity()],
            projection: vec![Mat4::identity()],
            view: Mat4::identity(),
            projection_view: Mat4::identity(),
            projection_view_inverse: None,
            cache_inverse,
            bind_count: 0,
            width,
            height,
        }
    }

    /// Viewport size in pixels
    pub fn viewport(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Resize the viewport used for pixel conversions
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    /// Number of binds performed so far
    pub fn bind_count(&self) -> u64 {
        self.bind_count
    }

    /// Load fresh projection and view matrices for a new traversal
    ///
    /// Both stacks are reset to a single base entry. Depth left over from the
    /// previous traversal is reported and discarded.
    pub fn bind(&mut self, projection: Mat4, view: Mat4) {
        if self.model_view.len() > 1 || self.projection.len() > 1 {
            log::warn!(
                "Matrix stacks were not balanced at bind (model-view depth {}, projection depth {})",
                self.model_view.len(),
                self.projection.len()
            );
        }
        self.model_view.truncate(1);
        self.projection.truncate(1);
        self.model_view[0] = view;
        self.projection[0] = projection;

        self.view = view;
        self.projection_view = projection * view;
        self.bind_count += 1;

        if self.cache_inverse {
            self.refresh_inverse();
        } else {
            self.projection_view_inverse = None;
        }
    }

    fn refresh_inverse(&mut self) {
        self.projection_view_inverse = match self.projection_view.try_inverse() {
            Some(matrix) => Some(Stamped { matrix, bind: self.bind_count }),
            None => {
                log::warn!("Projection-view matrix is singular, unprojection unavailable");
                None
            }
        };
    }

    /// Whether the projection-view inverse is cached at bind time
    pub fn is_projection_view_inverse_cached(&self) -> bool {
        self.cache_inverse
    }

    /// Enable or disable caching of the projection-view inverse
    ///
    /// Enabling computes the inverse immediately so the very next
    /// unprojection already uses it.
    pub fn cache_projection_view_inverse(&mut self, cache: bool) {
        self.cache_inverse = cache;
        if cache {
            self.refresh_inverse();
        } else {
            self.projection_view_inverse = None;
        }
    }

    /// Current top of the model-view stack
    pub fn model_view(&self) -> Mat4 {
        self.model_view.last().copied().unwrap_or_else(Mat4::identity)
    }

    /// Current top of the projection stack
    pub fn projection(&self) -> Mat4 {
        self.projection.last().copied().unwrap_or_else(Mat4::identity)
    }

    /// View matrix loaded by the last bind
    pub fn view(&self) -> Mat4 {
        self.view
    }

    /// `projection * view` as of the last bind
    pub fn projection_view(&self) -> Mat4 {
        self.projection_view
    }

    /// Depth of a stack, 1 meaning only the bound base entry is present
    pub fn depth(&self, kind: StackKind) -> usize {
        match kind {
            StackKind::ModelView => self.model_view.len(),
            StackKind::Projection => self.projection.len(),
        }
    }

    fn stack_mut(&mut self, kind: StackKind) -> &mut Vec<Mat4> {
        match kind {
            StackKind::ModelView => &mut self.model_view,
            StackKind::Projection => &mut self.projection,
        }
    }

    /// Duplicate the top of a stack
    pub fn push(&mut self, kind: StackKind) {
        let stack = self.stack_mut(kind);
        let top = stack.last().copied().unwrap_or_else(Mat4::identity);
        stack.push(top);
    }

    /// Restore the entry below the top of a stack
    ///
    /// Popping the bound base entry is an error and leaves the stack intact.
    pub fn pop(&mut self, kind: StackKind) -> Result<(), GraphError> {
        let stack = self.stack_mut(kind);
        if stack.len() <= 1 {
            return Err(GraphError::StackUnderflow(kind));
        }
        stack.pop();
        Ok(())
    }

    /// Replace the top of a stack
    pub fn load(&mut self, kind: StackKind, matrix: Mat4) {
        if let Some(top) = self.stack_mut(kind).last_mut() {
            *top = matrix;
        }
    }

    /// Right-multiply the top of a stack
    pub fn multiply(&mut self, kind: StackKind, matrix: &Mat4) {
        if let Some(top) = self.stack_mut(kind).last_mut() {
            *top *= matrix;
        }
    }

    /// Right-multiply the model-view by a translation
    pub fn translate(&mut self, translation: &Vec3) {
        self.multiply(StackKind::ModelView, &Mat4::new_translation(translation));
    }

    /// Right-multiply the model-view by a rotation about `axis`
    pub fn rotate(&mut self, angle: f32, axis: &Vec3) {
        if let Some(axis) = nalgebra::Unit::try_new(*axis, EPSILON) {
            self.multiply(StackKind::ModelView, &Mat4::from_axis_angle(&axis, angle));
        }
    }

    /// Right-multiply the model-view by a per-axis scale
    pub fn scale(&mut self, scale: &Vec3) {
        self.multiply(StackKind::ModelView, &Mat4::new_nonuniform_scaling(scale));
    }

    /// Right-multiply the model-view by a uniform scale
    pub fn scale_uniform(&mut self, factor: f32) {
        self.scale(&Vec3::repeat(factor));
    }

    /// Right-multiply the model-view by a translation in the XY plane
    pub fn translate_2d(&mut self, x: f32, y: f32) {
        self.translate(&Vec3::new(x, y, 0.0));
    }

    /// Right-multiply the model-view by a rotation about +Z
    pub fn rotate_2d(&mut self, angle: f32) {
        self.rotate(angle, &Vec3::z());
    }

    /// Right-multiply the model-view by a scale in the XY plane
    pub fn scale_2d(&mut self, x: f32, y: f32) {
        self.scale(&Vec3::new(x, y, 1.0));
    }

    /// Right-multiply the model-view by `translate * rotate * scale`
    pub fn apply_transform(&mut self, transform: &Transform) {
        self.multiply(StackKind::ModelView, &transform.to_matrix());
    }

    /// Reload the top of a stack with the matrix of the last bind
    pub fn reset(&mut self, kind: StackKind) {
        let base = match kind {
            StackKind::ModelView => self.view,
            StackKind::Projection => self.projection.first().copied().unwrap_or_else(Mat4::identity),
        };
        self.load(kind, base);
    }

    /// Push the model-view stack, popping it when the guard drops
    pub fn model_view_scope(&mut self) -> MatrixScope<'_> {
        self.push(StackKind::ModelView);
        MatrixScope { handler: self, model_view: true, projection: false }
    }

    /// Push the projection stack, popping it when the guard drops
    pub fn projection_scope(&mut self) -> MatrixScope<'_> {
        self.push(StackKind::Projection);
        MatrixScope { handler: self, model_view: false, projection: true }
    }

    /// Switch both stacks to a pixel-space mapping for the guard's lifetime
    ///
    /// Inside the scope, `(x, y)` model coordinates are pixels with the origin
    /// at the top-left corner, and `z` in `[-1, 1]` is passed through.
    pub fn screen_space_scope(&mut self) -> MatrixScope<'_> {
        let width = self.width.max(1) as f32;
        let height = self.height.max(1) as f32;
        self.push(StackKind::Projection);
        self.push(StackKind::ModelView);
        self.load(
            StackKind::Projection,
            Mat4::new_orthographic(0.0, width, height, 0.0, -1.0, 1.0),
        );
        self.load(StackKind::ModelView, Mat4::identity());
        MatrixScope { handler: self, model_view: true, projection: true }
    }

    /// Map a world point to pixel coordinates using the bound matrices
    ///
    /// The returned `z` is the window depth in `[0, 1]` for points between the
    /// near and far planes. Returns `None` for points on the eye plane.
    pub fn projected_coordinates_of(&self, point: &Point3) -> Option<Vec3> {
        self.project_with(&self.projection_view, point)
    }

    /// Map a point given in the current model-view space to pixel coordinates
    pub fn projected_local_coordinates_of(&self, point: &Point3) -> Option<Vec3> {
        self.project_with(&(self.projection() * self.model_view()), point)
    }

    fn project_with(&self, matrix: &Mat4, point: &Point3) -> Option<Vec3> {
        let clip = matrix * Vec4::new(point.x, point.y, point.z, 1.0);
        if clip.w.abs() < EPSILON {
            return None;
        }
        let ndc = clip.xyz() / clip.w;
        Some(ndc_to_pixels(&ndc, self.width, self.height))
    }

    /// Map pixel coordinates plus window depth back to a world point
    ///
    /// Uses the inverse cached at bind time when caching is on and the cache
    /// belongs to the current bind. Otherwise the inverse is computed here.
    pub fn unprojected_coordinates_of(&self, window: &Vec3) -> Option<Point3> {
        let inverse = match self.projection_view_inverse {
            Some(cached) if self.cache_inverse && cached.bind == self.bind_count => cached.matrix,
            _ => self.projection_view.try_inverse()?,
        };
        let ndc = pixels_to_ndc(window, self.width, self.height);
        let world = inverse * Vec4::new(ndc.x, ndc.y, ndc.z, 1.0);
        if world.w.abs() < EPSILON {
            return None;
        }
        Some(Point3::from(world.xyz() / world.w))
    }
}

/// Convert normalized device coordinates to top-left pixel coordinates
pub fn ndc_to_pixels(ndc: &Vec3, width: u32, height: u32) -> Vec3 {
    Vec3::new(
        (ndc.x + 1.0) * 0.5 * width as f32,
        (1.0 - ndc.y) * 0.5 * height as f32,
        (ndc.z + 1.0) * 0.5,
    )
}

/// Convert top-left pixel coordinates back to normalized device coordinates
pub fn pixels_to_ndc(window: &Vec3, width: u32, height: u32) -> Vec3 {
    Vec3::new(
        window.x / width.max(1) as f32 * 2.0 - 1.0,
        1.0 - window.y / height.max(1) as f32 * 2.0,
        window.z * 2.0 - 1.0,
    )
}

/// Scoped push on one or both stacks of a [`MatrixHandler`]
///
/// Dereferences to the handler, so nested scopes and matrix operations work
/// through the guard. Dropping it pops exactly what it pushed.
#[derive(Debug)]
pub struct MatrixScope<'a> {
    handler: &'a mut MatrixHandler,
    model_view: bool,
    projection: bool,
}

impl Deref for MatrixScope<'_> {
    type Target = MatrixHandler;

    fn deref(&self) -> &MatrixHandler {
        self.handler
    }
}

impl DerefMut for MatrixScope<'_> {
    fn deref_mut(&mut self) -> &mut MatrixHandler {
        self.handler
    }
}

impl Drop for MatrixScope<'_> {
    fn drop(&mut self) {
        if self.model_view {
            if let Err(err) = self.handler.pop(StackKind::ModelView) {
                log::error!("Scoped pop failed: {err}");
            }
        }
        if self.projection {
            if let Err(err) = self.handler.pop(StackKind::Projection) {
                log::error!("Scoped pop failed: {err}");
            }
        }
    }
}
