//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the crate:
//! - Math types and operations
//! - Arena handles for frames
//! - Logging utilities and the deduplicating warning log

pub mod math;
pub mod collections;
pub mod logging;
