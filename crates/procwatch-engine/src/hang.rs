//! Window-title based hang detection.
//!
//! A frozen application keeps its process alive, so exit detection never
//! fires. The window manager notices the stalled message loop instead and
//! marks the window title (or a placeholder window drawn in its place) with
//! a "not responding" marker. That marker is the only hang signal used.

use crate::config::{HangDetectionConfig, WindowOwnership};
use procwatch_common::WatchdogResult;
use procwatch_process::{ProcessHandle, WindowInspector};
use std::sync::Arc;
use tracing::debug;

pub struct HangDetector {
    inspector: Arc<dyn WindowInspector>,
    settings: HangDetectionConfig,
}

impl HangDetector {
    pub fn new(inspector: Arc<dyn WindowInspector>, settings: HangDetectionConfig) -> Self {
        Self {
            inspector,
            settings,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.settings.enabled
    }

    /// Whether the process behind `handle` shows a hung window.
    ///
    /// No matching window means not hung: the process may not have built
    /// its UI yet.
    pub fn is_unresponsive(&self, handle: &dyn ProcessHandle) -> WatchdogResult<bool> {
        if !self.settings.enabled {
            return Ok(false);
        }

        let pid = handle.pid();
        for window in self
            .inspector
            .find_windows_by_class(&self.settings.window_class)?
        {
            if self.settings.ownership == WindowOwnership::Process
                && self.inspector.window_owner(window) != Some(pid)
            {
                continue;
            }

            match self.inspector.window_title(window) {
                Ok(title) if self.is_hung_title(&title) => {
                    debug!("Window {:?} of pid {} reports hung: {}", window, pid, title);
                    return Ok(true);
                }
                Ok(_) => {}
                // Destroyed between enumeration and title read
                Err(e) => debug!("Skipping window {:?}: {}", window, e),
            }
        }

        Ok(false)
    }

    /// Whether `title` carries one of the configured markers.
    pub fn is_hung_title(&self, title: &str) -> bool {
        self.settings
            .markers
            .iter()
            .filter(|marker| !marker.is_empty())
            .any(|marker| title.contains(marker.as_str()))
    }
}
