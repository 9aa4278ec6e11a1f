//! Executable image path lookup.

use procwatch_common::{WatchdogError, WatchdogResult};
use std::path::PathBuf;

/// Read the full path of the executable image backing `pid`.
///
/// Protected processes yield [`WatchdogError::AccessDenied`]; vanished
/// processes, kernel threads and other failures yield
/// [`WatchdogError::PathUnreadable`].
pub fn executable_path(pid: u32) -> WatchdogResult<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        executable_path_linux(pid)
    }

    #[cfg(all(unix, not(target_os = "linux")))]
    {
        executable_path_sysinfo(pid)
    }

    #[cfg(windows)]
    {
        executable_path_windows(pid)
    }
}

#[cfg(target_os = "linux")]
fn executable_path_linux(pid: u32) -> WatchdogResult<PathBuf> {
    use std::io::ErrorKind;

    match std::fs::read_link(format!("/proc/{}/exe", pid)) {
        Ok(path) => Ok(strip_deleted_suffix(path)),
        Err(e) if e.kind() == ErrorKind::PermissionDenied => Err(WatchdogError::access_denied(pid)),
        Err(e) => Err(WatchdogError::path_unreadable(pid, e.to_string())),
    }
}

/// The kernel appends " (deleted)" when the binary was replaced on disk.
#[cfg(target_os = "linux")]
fn strip_deleted_suffix(path: PathBuf) -> PathBuf {
    match path.to_str().and_then(|s| s.strip_suffix(" (deleted)")) {
        Some(stripped) => PathBuf::from(stripped),
        None => path,
    }
}

#[cfg(all(unix, not(target_os = "linux")))]
fn executable_path_sysinfo(pid: u32) -> WatchdogResult<PathBuf> {
    use sysinfo::{Pid, ProcessRefreshKind, System, UpdateKind};

    let mut system = System::new();
    let sysinfo_pid = Pid::from_u32(pid);
    system.refresh_process_specifics(
        sysinfo_pid,
        ProcessRefreshKind::new().with_exe(UpdateKind::Always),
    );

    let process = system
        .process(sysinfo_pid)
        .ok_or_else(|| WatchdogError::path_unreadable(pid, "process no longer exists"))?;

    // sysinfo reports no exe when the OS refused the query
    process
        .exe()
        .map(|path| path.to_path_buf())
        .ok_or_else(|| WatchdogError::access_denied(pid))
}

#[cfg(windows)]
fn executable_path_windows(pid: u32) -> WatchdogResult<PathBuf> {
    use windows::core::PWSTR;
    use windows::Win32::Foundation::{CloseHandle, E_ACCESSDENIED};
    use windows::Win32::System::Threading::{
        OpenProcess, QueryFullProcessImageNameW, PROCESS_NAME_WIN32,
        PROCESS_QUERY_LIMITED_INFORMATION,
    };

    unsafe {
        let handle = OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, pid).map_err(|e| {
            if e.code() == E_ACCESSDENIED {
                WatchdogError::access_denied(pid)
            } else {
                WatchdogError::path_unreadable(pid, e.to_string())
            }
        })?;

        let mut buffer = [0u16; 1024];
        let mut size = buffer.len() as u32;
        let result = QueryFullProcessImageNameW(
            handle,
            PROCESS_NAME_WIN32,
            PWSTR(buffer.as_mut_ptr()),
            &mut size,
        );
        let _ = CloseHandle(handle);

        result.map_err(|e| {
            if e.code() == E_ACCESSDENIED {
                WatchdogError::access_denied(pid)
            } else {
                WatchdogError::path_unreadable(pid, e.to_string())
            }
        })?;

        Ok(PathBuf::from(String::from_utf16_lossy(&buffer[..size as usize])))
    }
}
