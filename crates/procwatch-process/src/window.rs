//! Top-level window lookup.
//!
//! Hang detection reads window titles from the OS window registry. Only
//! Windows has one the watchdog can query; elsewhere the headless inspector
//! reports no windows, which the engine treats as "not hung".

use procwatch_common::WatchdogResult;
use std::sync::Arc;

/// Opaque top-level window identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowHandle(pub isize);

/// Window-registry queries used by the hang detector.
pub trait WindowInspector: Send + Sync {
    /// All top-level windows whose class name equals `class_name`.
    fn find_windows_by_class(&self, class_name: &str) -> WatchdogResult<Vec<WindowHandle>>;

    /// Current title of `window`.
    fn window_title(&self, window: WindowHandle) -> WatchdogResult<String>;

    /// Pid of the process that created `window`, if known.
    fn window_owner(&self, window: WindowHandle) -> Option<u32>;
}

/// Inspector for platforms without a queryable window registry.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessWindowInspector;

impl WindowInspector for HeadlessWindowInspector {
    fn find_windows_by_class(&self, _class_name: &str) -> WatchdogResult<Vec<WindowHandle>> {
        Ok(Vec::new())
    }

    fn window_title(&self, _window: WindowHandle) -> WatchdogResult<String> {
        Ok(String::new())
    }

    fn window_owner(&self, _window: WindowHandle) -> Option<u32> {
        None
    }
}

/// The window inspector for the running OS.
pub fn platform_window_inspector() -> Arc<dyn WindowInspector> {
    #[cfg(windows)]
    {
        Arc::new(crate::window_windows::DesktopWindowInspector::new())
    }

    #[cfg(not(windows))]
    {
        Arc::new(HeadlessWindowInspector)
    }
}
