//! Frames: nodes of the scene tree
//!
//! A frame carries a local [`Transform`] relative to its reference frame,
//! picking settings, and an optional draw callback. Parent and child links
//! are owned by the graph; a `Frame` value that has not been inserted is
//! detached.

use std::fmt;
use std::rc::Rc;

use crate::foundation::collections::FrameId;
use crate::foundation::math::{Quat, Vec3};
use crate::geom::Transform;
use crate::input::picking::Precision;
use crate::render::DrawContext;

/// Draw callback invoked when the frame is visited
pub type DrawFn = Rc<dyn Fn(&mut DrawContext<'_>)>;

/// Node of the scene tree
#[derive(Clone)]
pub struct Frame {
    transform: Transform,
    pub(crate) reference: Option<FrameId>,
    pub(crate) children: Vec<FrameId>,
    precision: Precision,
    pick_threshold: Option<f32>,
    pub(crate) pick_id: u32,
    draw: Option<DrawFn>,
    version: u64,
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("transform", &self.transform)
            .field("reference", &self.reference)
            .field("children", &self.children)
            .field("precision", &self.precision)
            .field("pick_threshold", &self.pick_threshold)
            .field("pick_id", &self.pick_id)
            .field("has_draw", &self.draw.is_some())
            .finish()
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}

impl Frame {
    /// Create a detached frame with an identity transform
    pub fn new() -> Self {
        Self {
            transform: Transform::identity(),
            reference: None,
            children: Vec::new(),
            precision: Precision::default(),
            pick_threshold: None,
            pick_id: 0,
            draw: None,
            version: 0,
        }
    }

    /// Builder: set the local transform
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Builder: set the local translation
    pub fn with_translation(mut self, translation: Vec3) -> Self {
        self.transform.set_translation(translation);
        self
    }

    /// Builder: set the local rotation
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.transform.set_rotation(rotation);
        self
    }

    /// Builder: set a uniform local scale; zero or non-finite values are ignored
    pub fn with_scaling(mut self, scale: f32) -> Self {
        self.transform.set_scale(Vec3::repeat(scale));
        self
    }

    /// Builder: set the picking precision
    pub fn with_precision(mut self, precision: Precision) -> Self {
        self.precision = precision;
        self
    }

    /// Builder: set the picking threshold
    ///
    /// Pixels for [`Precision::Bound`], world units for
    /// [`Precision::Adaptive`]. Frames without one use the graph default.
    pub fn with_pick_threshold(mut self, threshold: f32) -> Self {
        self.pick_threshold = Some(threshold.abs());
        self
    }

    /// Builder: set the draw callback
    pub fn with_draw(mut self, draw: impl Fn(&mut DrawContext<'_>) + 'static) -> Self {
        self.draw = Some(Rc::new(draw));
        self
    }

    pub(crate) fn detach(&mut self) {
        self.reference = None;
        self.children.clear();
        self.pick_id = 0;
    }

    pub(crate) fn touch(&mut self) {
        self.version = self.version.wrapping_add(1);
    }

    /// Local transform relative to the reference frame
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Replace the local transform
    pub fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
        self.touch();
    }

    /// Local translation
    pub fn translation(&self) -> Vec3 {
        self.transform.translation()
    }

    /// Set the local translation
    pub fn set_translation(&mut self, translation: Vec3) {
        self.transform.set_translation(translation);
        self.touch();
    }

    /// Translate in the reference frame's space
    pub fn translate(&mut self, delta: &Vec3) {
        let translation = self.transform.translation() + delta;
        self.set_translation(translation);
    }

    /// Local rotation
    pub fn rotation(&self) -> Quat {
        self.transform.rotation()
    }

    /// Set the local rotation
    pub fn set_rotation(&mut self, rotation: Quat) {
        self.transform.set_rotation(rotation);
        self.touch();
    }

    /// Rotate about the frame's own axes
    pub fn rotate(&mut self, rotation: &Quat) {
        let rotation = self.transform.rotation() * rotation;
        self.set_rotation(rotation);
    }

    /// Local per-axis scale
    pub fn scaling(&self) -> Vec3 {
        self.transform.scale()
    }

    /// Set the local per-axis scale; returns `false` and keeps the old scale
    /// when a component is zero or not finite
    pub fn set_scaling(&mut self, scale: Vec3) -> bool {
        let accepted = self.transform.set_scale(scale);
        if accepted {
            self.touch();
        }
        accepted
    }

    /// Multiply the local scale uniformly
    pub fn scale_by(&mut self, factor: f32) -> bool {
        let scale = self.transform.scale() * factor;
        self.set_scaling(scale)
    }

    /// Parent frame, `None` for leading or detached frames
    pub fn reference(&self) -> Option<FrameId> {
        self.reference
    }

    /// Children in insertion order
    pub fn children(&self) -> &[FrameId] {
        &self.children
    }

    /// Whether `child` is listed among this frame's children
    pub fn has_child(&self, child: FrameId) -> bool {
        self.children.contains(&child)
    }

    /// Picking precision
    pub fn precision(&self) -> Precision {
        self.precision
    }

    /// Set the picking precision
    pub fn set_precision(&mut self, precision: Precision) {
        self.precision = precision;
    }

    /// Picking threshold, if the frame overrides the graph default
    pub fn pick_threshold(&self) -> Option<f32> {
        self.pick_threshold
    }

    /// Override the picking threshold; `None` restores the graph default
    pub fn set_pick_threshold(&mut self, threshold: Option<f32>) {
        self.pick_threshold = threshold.map(f32::abs);
    }

    /// Identifier encoded in the identifier buffer; 0 until inserted
    pub fn pick_id(&self) -> u32 {
        self.pick_id
    }

    /// Draw callback, if any
    pub fn draw(&self) -> Option<&DrawFn> {
        self.draw.as_ref()
    }

    /// Replace the draw callback
    pub fn set_draw(&mut self, draw: impl Fn(&mut DrawContext<'_>) + 'static) {
        self.draw = Some(Rc::new(draw));
    }

    /// Remove the draw callback
    pub fn clear_draw(&mut self) {
        self.draw = None;
    }

    /// Counter bumped by every transform mutation
    pub fn version(&self) -> u64 {
        self.version
    }
}
