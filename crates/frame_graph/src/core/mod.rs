//! # Core Module
//!
//! Shared configuration for the graph, its eye and its matrix handler.

pub mod config;

pub use config::{
    Config,
    ConfigError,
    Dimension,
    GraphConfig,
    Handedness,
    ProjectionType,
    VisualHintsConfig,
};
