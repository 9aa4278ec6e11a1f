//! Process termination primitives.

use procwatch_common::{WatchdogError, WatchdogResult};

/// Force kill a process (SIGKILL on Unix, TerminateProcess on Windows).
///
/// A process that is already gone counts as killed.
pub fn force_kill(pid: u32) -> WatchdogResult<()> {
    #[cfg(unix)]
    {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        let raw = i32::try_from(pid)
            .map_err(|_| WatchdogError::kill_failed(pid, "pid out of range"))?;

        match kill(Pid::from_raw(raw), Signal::SIGKILL) {
            Ok(()) | Err(nix::errno::Errno::ESRCH) => Ok(()),
            Err(e) => Err(WatchdogError::kill_failed(pid, e.to_string())),
        }
    }

    #[cfg(windows)]
    {
        use windows::Win32::Foundation::CloseHandle;
        use windows::Win32::System::Threading::{OpenProcess, TerminateProcess, PROCESS_TERMINATE};

        unsafe {
            let handle = match OpenProcess(PROCESS_TERMINATE, false, pid) {
                Ok(h) if !h.is_invalid() => h,
                _ => {
                    return Err(WatchdogError::kill_failed(
                        pid,
                        "Failed to open process for termination",
                    ));
                }
            };

            let result = TerminateProcess(handle, 1);
            let _ = CloseHandle(handle);

            result.map_err(|e| WatchdogError::kill_failed(pid, format!("TerminateProcess failed: {}", e)))
        }
    }
}
