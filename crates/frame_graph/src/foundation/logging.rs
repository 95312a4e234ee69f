//! Logging setup for binaries and the per-graph warning log

use std::collections::HashSet;

/// Initialize `env_logger`, falling back to `default_level` when `RUST_LOG`
/// is unset
pub fn init(default_level: log::LevelFilter) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level.to_string()))
        .init();
}

/// Reporter that emits each distinct warning message once
///
/// Per-frame code paths (visibility queries on a stale frustum, 3D-only calls
/// on a 2D graph, exact picking without an identifier buffer) would otherwise
/// flood the log. Messages are deduplicated by their full text.
#[derive(Debug, Default, Clone)]
pub struct WarningLog {
    emitted: HashSet<String>,
}

impl WarningLog {
    /// Create an empty warning log
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit `message` through `log::warn!` unless it was already emitted
    ///
    /// Returns `true` when the message was emitted by this call.
    pub fn warn_once(&mut self, message: impl Into<String>) -> bool {
        let message = message.into();
        if self.emitted.contains(&message) {
            return false;
        }
        log::warn!("{}", message);
        self.emitted.insert(message);
        true
    }

    /// Warn that `method` only makes sense for 3D graphs
    pub fn depth_warning(&mut self, method: &str) -> bool {
        self.warn_once(format!("{method}() is not available in 2d"))
    }

    /// Warn that `method` only makes sense for 2D graphs
    pub fn flat_warning(&mut self, method: &str) -> bool {
        self.warn_once(format!("{method}() is not available in 3d"))
    }

    /// Warn that `method` requires the frame to be (or not be) the eye frame
    pub fn only_eye_warning(&mut self, method: &str, eye: bool) -> bool {
        if eye {
            self.warn_once(format!("{method}() is meaningful only when frame is attached to an eye."))
        } else {
            self.warn_once(format!("{method}() is meaningful only when frame is detached from an eye."))
        }
    }

    /// Whether `message` has been emitted
    pub fn was_emitted(&self, message: &str) -> bool {
        self.emitted.contains(message)
    }

    /// Number of distinct messages emitted so far
    pub fn emitted_count(&self) -> usize {
        self.emitted.len()
    }
}
