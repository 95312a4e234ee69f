//! # Frame Graph
//!
//! Scene-graph and coordinate-transformation core for interactive 2D/3D
//! visualization.
//!
//! ## Features
//!
//! - **Frame tree**: frames with local transforms, leading frames, pruning and
//!   re-appending of whole branches
//! - **Eye**: perspective and orthographic projection, scene fitting and
//!   frustum visibility queries
//! - **Matrix stacks**: scoped model-view and projection pushes with a cached
//!   projection-view inverse for unprojection
//! - **Picking**: bound, adaptive and exact (identifier buffer) precision
//! - **Timing**: periodic tasks driven by the draw cycle
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use frame_graph::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut graph = Graph::new(&GraphConfig::new(800, 600))?;
//!     let body = graph.spawn(Frame::new().with_draw(|ctx| {
//!         if let Some(backend) = ctx.backend_as::<HeadlessBackend>() {
//!             backend.splat(&Point3::origin(), 4.0);
//!         }
//!     }))?;
//!
//!     let mut backend = HeadlessBackend::new(800, 600);
//!     graph.render(&mut backend)?;
//!     let hit = graph.cast(400.0, 300.0);
//!     assert_eq!(hit, Some(body));
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod core;
pub mod foundation;
pub mod geom;
pub mod input;
pub mod render;
pub mod scene;
pub mod timing;

/// Common imports for graph users
pub mod prelude {
    pub use crate::{
        core::{Config, Dimension, GraphConfig, Handedness, ProjectionType},
        foundation::{
            collections::FrameId,
            math::{Mat4, Point3, Quat, Vec2, Vec3},
        },
        geom::Transform,
        input::{IdColor, IdentifierBuffer, Precision},
        render::{DrawContext, HeadlessBackend, MatrixHandler, RenderBackend, RenderPass, StackKind, VisualHints},
        scene::{Eye, Frame, Graph, GraphError, Visibility},
        timing::{TaskId, TimingHandler},
    };
}
