//! Draw cycle: binding, traversal and the identifier pass
//!
//! One cycle is [`Graph::pre_draw`], [`Graph::traverse`], [`Graph::post_draw`]
//! ([`Graph::render`] runs all three). Traversal visits leading frames in
//! registration order and each subtree depth-first, applying every frame's
//! local transform inside a scoped model-view push.

use crate::foundation::collections::{FrameArena, FrameId, FrameSet};
use crate::foundation::math::{Point3, Vec3};
use crate::input::picking::{IdColor, Precision};
use crate::render::{DrawContext, MatrixHandler, MatrixScope, RenderBackend, RenderPass, StackKind, VisualHints};
use crate::scene::error::GraphError;
use crate::scene::eye::Frustum;
use crate::scene::frame::Frame;
use crate::scene::Graph;

/// Which frames get their callback invoked during a traversal
struct PassFilter<'a> {
    pass: RenderPass,
    eye: FrameId,
    pickables: &'a FrameSet,
}

impl PassFilter<'_> {
    fn identifier(&self, id: FrameId, frame: &Frame) -> Option<IdColor> {
        match self.pass {
            RenderPass::Display => None,
            RenderPass::Identifier => {
                let eligible = id != self.eye
                    && frame.precision() == Precision::Exact
                    && self.pickables.contains(&id);
                if eligible { IdColor::from_id(frame.pick_id) } else { None }
            }
        }
    }
}

fn visit(
    frames: &FrameArena<Frame>,
    matrices: &mut MatrixHandler,
    backend: &mut dyn RenderBackend,
    filter: &PassFilter<'_>,
    id: FrameId,
) {
    let Some(frame) = frames.get(id) else {
        log::warn!("Skipping dangling frame {:?} during traversal", id);
        return;
    };
    let mut scope = matrices.model_view_scope();
    scope.apply_transform(frame.transform());

    let identifier = filter.identifier(id, frame);
    let draws = match filter.pass {
        RenderPass::Display => true,
        RenderPass::Identifier => identifier.is_some(),
    };
    if draws {
        if let Some(draw) = frame.draw() {
            let model_view = scope.model_view();
            backend.bind_model_view(&model_view);
            if let Some(color) = identifier {
                backend.set_identifier(color);
            }
            let mut context = DrawContext {
                frame: id,
                pass: filter.pass,
                model_view,
                projection: scope.projection(),
                identifier,
                backend: &mut *backend,
            };
            draw(&mut context);
        }
    }

    for &child in frame.children() {
        visit(frames, &mut scope, backend, filter, child);
    }
}

impl Graph {
    /// Compute the eye matrices and load them into the stacks
    pub fn bind_matrices(&mut self) -> Result<(), GraphError> {
        let view = self.view_matrix()?;
        let projection = self.eye.projection_matrix(&self.projection_inputs(&view));
        self.matrices.bind(projection, view);
        Ok(())
    }

    /// Start a draw cycle
    ///
    /// Binds the eye matrices, hands them to the backend, refreshes the
    /// boundary planes when enabled and the eye changed, then draws the
    /// enabled visual hints.
    pub fn pre_draw(&mut self, backend: &mut dyn RenderBackend) -> Result<(), GraphError> {
        self.bind_matrices()?;
        backend.bind_projection(&self.matrices.projection());
        backend.bind_model_view(&self.matrices.model_view());

        self.refresh_eye_update();
        if self.eye.boundary_equations && self.boundary_equations_outdated() {
            self.eye.frustum = Frustum::from_matrix(&self.matrices.projection_view());
            self.eye.last_equations_update = Some(self.eye.last_update);
            log::trace!("Boundary equations updated at eye update {}", self.eye.last_update);
        }

        self.draw_visual_hints(backend);
        Ok(())
    }

    fn draw_visual_hints(&mut self, backend: &mut dyn RenderBackend) {
        let radius = self.eye.scene_radius();
        for hint in [VisualHints::AXES, VisualHints::GRID] {
            if self.visual_hints.contains(hint) {
                backend.draw_visual_hint(hint, radius);
            }
        }
        if self.visual_hints.contains(VisualHints::PICKING) {
            {
                let scope = self.matrices.screen_space_scope();
                backend.bind_projection(&scope.projection());
                backend.bind_model_view(&scope.model_view());
                backend.draw_visual_hint(VisualHints::PICKING, radius);
            }
            backend.bind_projection(&self.matrices.projection());
            backend.bind_model_view(&self.matrices.model_view());
        }
    }

    /// Visit every reachable frame and invoke its draw callback
    pub fn traverse(&mut self, backend: &mut dyn RenderBackend) {
        let filter = PassFilter {
            pass: RenderPass::Display,
            eye: self.eye.frame,
            pickables: &self.pickables,
        };
        for &root in &self.leading {
            visit(&self.frames, &mut self.matrices, backend, &filter, root);
        }
    }

    /// Finish a draw cycle: run due timing tasks and count the frame
    pub fn post_draw(&mut self) {
        self.timing.handle();
        self.frame_count += 1;
    }

    /// Run a full draw cycle
    pub fn render(&mut self, backend: &mut dyn RenderBackend) -> Result<(), GraphError> {
        self.pre_draw(backend)?;
        self.traverse(backend);
        self.post_draw();
        Ok(())
    }

    /// Render pickable exact frames into the backend's identifier target
    ///
    /// Each eligible frame's draw callback runs with its [`IdColor`] set.
    /// Returns whether a new identifier buffer was stored for
    /// [`Graph::track`] and [`Graph::cast`].
    pub fn render_identifiers(&mut self, backend: &mut dyn RenderBackend) -> Result<bool, GraphError> {
        let has_exact = self.pickables.iter().any(|&id| {
            self.frames
                .get(id)
                .is_some_and(|frame| frame.precision() == Precision::Exact)
        });
        if !has_exact {
            self.picker.set_buffer(None);
            return Ok(false);
        }

        self.bind_matrices()?;
        let (width, height) = self.matrices.viewport();
        if !backend.begin_identifier_pass(width, height) {
            self.warnings
                .warn_once("Backend has no identifier target; exact picking will report no hits");
            self.picker.set_buffer(None);
            return Ok(false);
        }
        backend.bind_projection(&self.matrices.projection());

        let filter = PassFilter {
            pass: RenderPass::Identifier,
            eye: self.eye.frame,
            pickables: &self.pickables,
        };
        for &root in &self.leading {
            visit(&self.frames, &mut self.matrices, backend, &filter, root);
        }

        let buffer = backend.end_identifier_pass();
        let produced = buffer.is_some();
        self.picker.set_buffer(buffer);
        Ok(produced)
    }

    fn fresh_matrices(&self) -> Option<MatrixHandler> {
        let mut handler = self.matrices.clone();
        let view = self.view_matrix().ok()?;
        let projection = self.eye.projection_matrix(&self.projection_inputs(&view));
        handler.bind(projection, view);
        Some(handler)
    }

    /// Map a world point to pixel coordinates plus window depth
    ///
    /// Uses the matrices of the last bind; before the first bind the current
    /// eye is used.
    pub fn projected_coordinates_of(&self, point: &Point3) -> Option<Vec3> {
        if self.matrices.bind_count() > 0 {
            self.matrices.projected_coordinates_of(point)
        } else {
            self.fresh_matrices()?.projected_coordinates_of(point)
        }
    }

    /// Map pixel coordinates plus window depth back to a world point
    ///
    /// Same matrix source as [`Graph::projected_coordinates_of`].
    pub fn unprojected_coordinates_of(&self, window: &Vec3) -> Option<Point3> {
        if self.matrices.bind_count() > 0 {
            self.matrices.unprojected_coordinates_of(window)
        } else {
            self.fresh_matrices()?.unprojected_coordinates_of(window)
        }
    }

    /// Mutable access to the matrix stacks for drawing outside traversal
    pub fn matrix_handler_mut(&mut self) -> &mut MatrixHandler {
        &mut self.matrices
    }

    /// Push the model-view stack until the returned guard drops
    pub fn model_view_scope(&mut self) -> MatrixScope<'_> {
        self.matrices.model_view_scope()
    }

    /// Switch to pixel coordinates until the returned guard drops
    pub fn screen_space_scope(&mut self) -> MatrixScope<'_> {
        self.matrices.screen_space_scope()
    }

    /// Multiply the model-view by the frame's local transform
    pub fn apply_transformation(&mut self, id: FrameId) -> Result<(), GraphError> {
        let transform = *self
            .frames
            .get(id)
            .ok_or(GraphError::UnknownFrame(id))?
            .transform();
        self.matrices.apply_transform(&transform);
        Ok(())
    }

    /// Multiply the model-view by the frame's world matrix, ancestors first
    pub fn apply_world_transformation(&mut self, id: FrameId) -> Result<(), GraphError> {
        let reference = self
            .frames
            .get(id)
            .ok_or(GraphError::UnknownFrame(id))?
            .reference();
        if let Some(parent) = reference {
            self.apply_world_transformation(parent)?;
        }
        self.apply_transformation(id)
    }

    /// Model-view stack depth, 1 meaning balanced
    pub fn model_view_depth(&self) -> usize {
        self.matrices.depth(StackKind::ModelView)
    }
}
