//! Rendering seam
//!
//! The graph never talks to a graphics API directly. It keeps its own matrix
//! stacks in a [`MatrixHandler`] and hands the resulting matrices to a
//! [`RenderBackend`], which owns the actual graphics context.
//!
//! ## Pixel convention
//!
//! Screen coordinates are pixels with the origin at the top-left corner and
//! rows growing downward, for every handedness. Handedness is folded into the
//! projection matrix, so backends map NDC to pixels with
//! `x = (ndc.x + 1) / 2 * width` and `y = (1 - ndc.y) / 2 * height`.

pub mod backend;
pub mod matrix_handler;
pub mod headless;

pub use backend::{RenderBackend, DrawContext, RenderPass, VisualHints};
pub use matrix_handler::{MatrixHandler, MatrixScope, StackKind};
pub use headless::HeadlessBackend;
