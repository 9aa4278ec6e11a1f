//! # procwatch process
//!
//! The process control boundary the watchdog engine depends on.
//!
//! This crate provides:
//! - [`ProcessControl`] / [`ProcessHandle`]: listing processes, reading image
//!   paths, spawning, attaching, waiting, killing and releasing
//! - [`WindowInspector`]: top-level window lookup by class name
//! - [`NativeProcessControl`] and [`platform_window_inspector`]: the adapters
//!   for the current OS
//!
//! Everything platform-specific lives here so the engine stays portable.

pub mod attach;
pub mod check;
pub mod control;
pub mod execute;
pub mod image;
pub mod native;
pub mod terminate;
pub mod window;

#[cfg(windows)]
pub mod window_windows;

// Re-export main types
pub use attach::AttachedProcess;
pub use check::process_exists;
pub use control::{ProcessControl, ProcessEntry, ProcessExit, ProcessHandle};
pub use execute::{spawn_process, SpawnedProcess};
pub use image::executable_path;
pub use native::NativeProcessControl;
pub use terminate::force_kill;
pub use window::{platform_window_inspector, HeadlessWindowInspector, WindowHandle, WindowInspector};
