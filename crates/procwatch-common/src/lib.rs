//! # procwatch common
//!
//! Error taxonomy and domain types shared by every procwatch crate.
//!
//! The watchdog engine, the platform process boundary and the log sink all
//! report failures through [`WatchdogError`], so the recoverable/fatal split
//! is decided in one place.

pub mod errors;
pub mod types;

// Re-export commonly used items
pub use errors::{WatchdogError, WatchdogResult};
pub use types::WatchedTarget;
