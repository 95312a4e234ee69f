//! Scene graph: frames, the eye, and the per-cycle draw protocol

pub mod error;
pub mod eye;
pub mod frame;
pub mod graph;
pub mod traversal;

pub use error::GraphError;
pub use eye::{Eye, Frustum, Plane, Visibility};
pub use frame::{DrawFn, Frame};
pub use graph::Graph;

#[cfg(test)]
mod tests;
