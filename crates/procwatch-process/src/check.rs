//! Process existence checking.

use procwatch_common::{WatchdogError, WatchdogResult};

/// Check if a process with the given PID exists and is running.
///
/// On Unix this sends signal 0 (no signal, existence check only). On Windows
/// it opens the process and inspects its exit code.
///
/// # Returns
///
/// * `Ok(true)` - Process exists and is running
/// * `Ok(false)` - Process does not exist
/// * `Err(_)` - The check itself failed
pub fn process_exists(pid: u32) -> WatchdogResult<bool> {
    #[cfg(unix)]
    {
        process_exists_unix(pid)
    }

    #[cfg(windows)]
    {
        process_exists_windows(pid)
    }
}

#[cfg(unix)]
fn process_exists_unix(pid: u32) -> WatchdogResult<bool> {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    let raw = i32::try_from(pid)
        .map_err(|_| WatchdogError::transient_poll(pid.to_string(), "pid out of range"))?;

    match kill(Pid::from_raw(raw), None) {
        Ok(_) => Ok(true),
        Err(nix::errno::Errno::ESRCH) => Ok(false),
        // Exists, but belongs to someone else
        Err(nix::errno::Errno::EPERM) => Ok(true),
        Err(e) => Err(WatchdogError::transient_poll(
            pid.to_string(),
            format!("Failed to check process: {}", e),
        )),
    }
}

#[cfg(windows)]
fn process_exists_windows(pid: u32) -> WatchdogResult<bool> {
    use windows::Win32::Foundation::CloseHandle;
    use windows::Win32::System::Threading::{
        GetExitCodeProcess, OpenProcess, PROCESS_QUERY_LIMITED_INFORMATION,
    };

    const STILL_ACTIVE: u32 = 259;

    unsafe {
        let handle = match OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, pid) {
            Ok(h) => h,
            // Invalid parameter: no such pid
            Err(_) => return Ok(false),
        };

        let mut exit_code: u32 = 0;
        let result = GetExitCodeProcess(handle, &mut exit_code);
        let _ = CloseHandle(handle);

        match result {
            Ok(()) => Ok(exit_code == STILL_ACTIVE),
            Err(e) => Err(WatchdogError::transient_poll(
                pid.to_string(),
                format!("GetExitCodeProcess failed: {}", e),
            )),
        }
    }
}
