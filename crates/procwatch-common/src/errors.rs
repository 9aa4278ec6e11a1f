//! Error types for procwatch.
//!
//! The taxonomy follows the supervision policy: configuration errors abort
//! startup, access errors are skipped during a scan, spawn failures end the
//! supervision of one target, and transient poll errors are logged and
//! retried on the next interval.

use thiserror::Error;

/// Result alias used throughout procwatch.
pub type WatchdogResult<T> = std::result::Result<T, WatchdogError>;

/// Main error type for watchdog operations.
#[derive(Debug, Error)]
pub enum WatchdogError {
    /// Missing or invalid configuration. Supervision never starts.
    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    /// The OS refused to reveal a process's image path (protected process).
    #[error("Access denied reading image path of process {pid}")]
    AccessDenied { pid: u32 },

    /// The image path could not be read for any other reason.
    #[error("Image path of process {pid} unreadable: {reason}")]
    PathUnreadable { pid: u32, reason: String },

    /// Launching the executable failed (missing file, permission denied).
    #[error("Process spawn failed: {path} - {reason}")]
    SpawnFailed { path: String, reason: String },

    /// Any other failure inside one monitoring cycle.
    #[error("Monitoring poll failed: {path} - {reason}")]
    TransientPoll { path: String, reason: String },

    /// Forced termination failed.
    #[error("Process kill failed: {pid} - {reason}")]
    KillFailed { pid: u32, reason: String },

    /// A state transition not allowed by the supervision state machine.
    #[error("Invalid state transition for {path}: {from} -> {to}")]
    InvalidTransition {
        path: String,
        from: String,
        to: String,
    },

    /// Window registry lookup failed.
    #[error("Window lookup failed: {reason}")]
    Window { reason: String },

    /// I/O error (wraps std::io::Error).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WatchdogError {
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    pub fn access_denied(pid: u32) -> Self {
        Self::AccessDenied { pid }
    }

    pub fn path_unreadable(pid: u32, reason: impl Into<String>) -> Self {
        Self::PathUnreadable {
            pid,
            reason: reason.into(),
        }
    }

    pub fn spawn_failed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SpawnFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn transient_poll(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::TransientPoll {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn kill_failed(pid: u32, reason: impl Into<String>) -> Self {
        Self::KillFailed {
            pid,
            reason: reason.into(),
        }
    }

    pub fn invalid_transition(
        path: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self::InvalidTransition {
            path: path.into(),
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn window(reason: impl Into<String>) -> Self {
        Self::Window {
            reason: reason.into(),
        }
    }

    /// Whether the component that observed this error can keep going.
    ///
    /// Configuration and spawn failures are fatal (for the whole watchdog and
    /// for one target respectively); everything else is skipped or retried.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Self::Configuration { .. } | Self::SpawnFailed { .. } | Self::InvalidTransition { .. }
        )
    }
}
