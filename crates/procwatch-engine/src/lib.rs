//! # procwatch engine
//!
//! Keeps a fixed set of executables running.
//!
//! This crate provides:
//! - [`normalize`]: path keys for matching running images to configured paths
//! - [`ProcessScanner`]: adopt a running instance or spawn one
//! - [`HangDetector`]: window-title based "not responding" detection
//! - [`WatchdogLoop`]: the per-target supervision loop
//! - [`WatchManager`]: one loop per configured target, with shutdown
//! - [`WatchdogService`]: the [`HostedService`] a host binary drives
//!
//! Platform specifics stay behind the `procwatch-process` traits.

pub mod config;
pub mod hang;
pub mod host;
pub mod manager;
pub mod path;
pub mod scanner;
pub mod supervised;
pub mod watchdog;

#[cfg(test)]
pub(crate) mod testing;

// Re-export main types
pub use config::{
    default_log_directory, HangDetectionConfig, WatchdogConfig, WatchdogSettings, WindowOwnership,
};
pub use hang::HangDetector;
pub use host::{HostedService, WatchdogService};
pub use manager::WatchManager;
pub use path::{normalize, normalize_path, PathKey};
pub use scanner::{ProcessScanner, PROTECTED_PROCESS_NAMES};
pub use supervised::SupervisedProcess;
pub use watchdog::{SupervisionOptions, WatchdogLoop, WatchdogStatus};
