//! Windows window registry access via `EnumWindows`.

use crate::window::{WindowHandle, WindowInspector};
use procwatch_common::{WatchdogError, WatchdogResult};
use windows::Win32::Foundation::{BOOL, HWND, LPARAM};
use windows::Win32::UI::WindowsAndMessaging::{
    EnumWindows, GetClassNameW, GetWindowTextW, GetWindowThreadProcessId,
};

/// Enumeration state passed through `EnumWindows`' LPARAM.
struct ClassSearch {
    class_name: String,
    found: Vec<WindowHandle>,
}

unsafe extern "system" fn collect_by_class(hwnd: HWND, lparam: LPARAM) -> BOOL {
    let search = &mut *(lparam.0 as *mut ClassSearch);

    let mut buffer = [0u16; 256];
    let len = GetClassNameW(hwnd, &mut buffer);
    if len > 0 && String::from_utf16_lossy(&buffer[..len as usize]) == search.class_name {
        search.found.push(WindowHandle(hwnd.0));
    }

    // Keep enumerating
    BOOL(1)
}

/// Queries the interactive desktop's top-level windows.
#[derive(Debug, Default)]
pub struct DesktopWindowInspector;

impl DesktopWindowInspector {
    pub fn new() -> Self {
        Self
    }
}

impl WindowInspector for DesktopWindowInspector {
    fn find_windows_by_class(&self, class_name: &str) -> WatchdogResult<Vec<WindowHandle>> {
        let mut search = ClassSearch {
            class_name: class_name.to_string(),
            found: Vec::new(),
        };

        unsafe {
            EnumWindows(
                Some(collect_by_class),
                LPARAM(&mut search as *mut ClassSearch as isize),
            )
        }
        .map_err(|e| WatchdogError::window(format!("EnumWindows failed: {}", e)))?;

        Ok(search.found)
    }

    fn window_title(&self, window: WindowHandle) -> WatchdogResult<String> {
        let mut buffer = [0u16; 512];
        let len = unsafe { GetWindowTextW(HWND(window.0), &mut buffer) };
        if len < 0 {
            return Err(WatchdogError::window("GetWindowTextW failed"));
        }
        Ok(String::from_utf16_lossy(&buffer[..len as usize]))
    }

    fn window_owner(&self, window: WindowHandle) -> Option<u32> {
        let mut pid: u32 = 0;
        unsafe {
            GetWindowThreadProcessId(HWND(window.0), Some(&mut pid as *mut u32));
        }
        (pid != 0).then_some(pid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_class_has_no_windows() {
        let inspector = DesktopWindowInspector::new();
        let found = inspector
            .find_windows_by_class("procwatch-no-such-class")
            .unwrap();
        assert!(found.is_empty());
    }
}
