//! Backend abstraction traits for the rendering system
//!
//! This module defines the capability the graph needs from whatever actually
//! draws pixels: loading matrices, drawing debug overlays, and optionally an
//! off-screen identifier target for exact picking.

use std::any::Any;

use crate::foundation::collections::FrameId;
use crate::foundation::math::Mat4;
use crate::input::picking::{IdColor, IdentifierBuffer};

bitflags::bitflags! {
    /// Categories of debug overlays drawn by [`crate::scene::Graph::pre_draw`]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct VisualHints: u8 {
        /// World axes
        const AXES = 1 << 0;
        /// Ground grid
        const GRID = 1 << 1;
        /// Picking regions around pickable frames
        const PICKING = 1 << 2;
    }
}

/// Which traversal a draw callback is running in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPass {
    /// Regular on-screen traversal
    Display,
    /// Off-screen traversal filling the identifier buffer with flat id colors
    Identifier,
}

/// Main rendering backend trait
///
/// Implementations receive fully composed matrices; the graph keeps the
/// push/pop discipline on its side (see [`crate::render::MatrixHandler`]).
pub trait RenderBackend {
    /// Load the projection matrix used by subsequent drawing commands
    fn bind_projection(&mut self, projection: &Mat4);

    /// Load the model-view matrix used by subsequent drawing commands
    fn bind_model_view(&mut self, model_view: &Mat4);

    /// Draw a debug overlay; `scene_radius` sizes axes and grids
    fn draw_visual_hint(&mut self, _hint: VisualHints, _scene_radius: f32) {}

    /// Start an off-screen identifier pass sized to the viewport
    ///
    /// Returns `false` when the backend has no identifier target, in which
    /// case exact picking degrades to "no hit".
    fn begin_identifier_pass(&mut self, _width: u32, _height: u32) -> bool {
        false
    }

    /// Flat color that subsequent identifier-pass drawing must use
    fn set_identifier(&mut self, _color: IdColor) {}

    /// Finish the identifier pass and read the target back
    fn end_identifier_pass(&mut self) -> Option<IdentifierBuffer> {
        None
    }

    /// Downcast to the concrete backend type from inside draw callbacks
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Everything a draw callback may use while its frame is being visited
///
/// The context exposes the backend but not the graph: callbacks cannot mutate
/// the tree they are called from.
pub struct DrawContext<'a> {
    /// Frame being drawn
    pub frame: FrameId,
    /// Traversal the callback runs in
    pub pass: RenderPass,
    /// Model-view matrix currently bound (view times the frame's world matrix)
    pub model_view: Mat4,
    /// Projection matrix currently bound
    pub projection: Mat4,
    /// Identifier color in effect during [`RenderPass::Identifier`]
    pub identifier: Option<IdColor>,
    /// Backend to issue drawing commands against
    pub backend: &'a mut dyn RenderBackend,
}

impl std::fmt::Debug for DrawContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DrawContext")
            .field("frame", &self.frame)
            .field("pass", &self.pass)
            .field("model_view", &self.model_view)
            .field("projection", &self.projection)
            .field("identifier", &self.identifier)
            .finish_non_exhaustive()
    }
}

impl DrawContext<'_> {
    /// Downcast the backend to a concrete type
    pub fn backend_as<T: 'static>(&mut self) -> Option<&mut T> {
        self.backend.as_any_mut().downcast_mut::<T>()
    }
}
