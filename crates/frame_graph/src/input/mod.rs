//! Input-side queries: mapping screen positions back to frames

pub mod picking;

pub use picking::{IdColor, IdentifierBuffer, Picker, Precision};
