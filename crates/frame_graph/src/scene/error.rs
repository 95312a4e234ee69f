//! Error type for graph operations

use thiserror::Error;

use crate::foundation::collections::FrameId;
use crate::render::StackKind;

/// Errors reported by [`crate::scene::Graph`] and the matrix stacks
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// The handle does not name a live frame
    #[error("Unknown frame {0:?}")]
    UnknownFrame(FrameId),

    /// Re-parenting would make a frame its own ancestor
    #[error("Making {parent:?} the reference of {frame:?} would create a cycle")]
    Cycle {
        /// Frame being re-parented
        frame: FrameId,
        /// Requested reference frame
        parent: FrameId,
    },

    /// The operation needs a frame reachable from a leading frame
    #[error("Frame {0:?} is not reachable from any leading frame")]
    Unreachable(FrameId),

    /// The frame is already registered as leading
    #[error("Frame {0:?} is already a leading frame")]
    AlreadyLeading(FrameId),

    /// Only frames without a reference can be leading
    #[error("Frame {0:?} has a reference frame and cannot be leading")]
    HasReference(FrameId),

    /// Some branch entries could not be re-attached
    #[error("{} frame(s) could not be re-attached", .rejected.len())]
    PartialAppend {
        /// Entries whose parent was missing or unreachable
        rejected: Vec<FrameId>,
    },

    /// Pop attempted on a stack holding only its bound base entry
    #[error("{0:?} stack underflow")]
    StackUnderflow(StackKind),

    /// A matrix that must be inverted is singular
    #[error("{0} matrix is not invertible")]
    SingularMatrix(&'static str),

    /// No identifier left that fits in 24-bit color
    #[error("Pick identifiers exhausted")]
    PickIdsExhausted,

    /// Viewport dimensions must be positive
    #[error("Invalid viewport {width}x{height}")]
    InvalidViewport {
        /// Requested width
        width: u32,
        /// Requested height
        height: u32,
    },
}
