//! Attaching to processes the watchdog did not start.
//!
//! An attached process is not our child, so its exit cannot be awaited
//! directly; liveness is polled instead.

use crate::control::{ProcessExit, ProcessHandle};
use async_trait::async_trait;
use procwatch_common::{WatchdogError, WatchdogResult};
use std::time::Duration;
use tracing::debug;

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// A pre-existing process adopted by the watchdog.
#[derive(Debug)]
pub struct AttachedProcess {
    pid: u32,
    #[cfg(windows)]
    handle: windows::Win32::Foundation::HANDLE,
}

impl AttachedProcess {
    /// Bind to `pid`, failing if it is no longer running.
    pub fn attach(pid: u32) -> WatchdogResult<Self> {
        #[cfg(unix)]
        {
            if !crate::check::process_exists(pid)? {
                return Err(WatchdogError::path_unreadable(
                    pid,
                    "process exited before it could be attached",
                ));
            }
            Ok(Self { pid })
        }

        #[cfg(windows)]
        {
            use windows::Win32::System::Threading::{
                OpenProcess, PROCESS_QUERY_LIMITED_INFORMATION, PROCESS_TERMINATE,
            };

            let access = PROCESS_QUERY_LIMITED_INFORMATION | PROCESS_TERMINATE;
            let handle = unsafe { OpenProcess(access, false, pid) }
                .map_err(|e| WatchdogError::path_unreadable(pid, format!("OpenProcess failed: {}", e)))?;
            Ok(Self { pid, handle })
        }
    }

    fn is_alive(&self) -> WatchdogResult<Option<ProcessExit>> {
        #[cfg(unix)]
        {
            if crate::check::process_exists(self.pid)? {
                Ok(None)
            } else {
                Ok(Some(ProcessExit { code: None }))
            }
        }

        #[cfg(windows)]
        {
            use windows::Win32::System::Threading::GetExitCodeProcess;

            const STILL_ACTIVE: u32 = 259;

            let mut exit_code: u32 = 0;
            unsafe { GetExitCodeProcess(self.handle, &mut exit_code) }.map_err(|e| {
                WatchdogError::transient_poll(self.pid.to_string(), format!("GetExitCodeProcess failed: {}", e))
            })?;

            if exit_code == STILL_ACTIVE {
                Ok(None)
            } else {
                Ok(Some(ProcessExit {
                    code: Some(exit_code as i32),
                }))
            }
        }
    }
}

#[async_trait]
impl ProcessHandle for AttachedProcess {
    fn pid(&self) -> u32 {
        self.pid
    }

    async fn wait_for_exit(&mut self) -> WatchdogResult<ProcessExit> {
        loop {
            if let Some(exit) = self.is_alive()? {
                return Ok(exit);
            }
            tokio::time::sleep(EXIT_POLL_INTERVAL).await;
        }
    }

    fn kill(&mut self) -> WatchdogResult<()> {
        #[cfg(unix)]
        {
            crate::terminate::force_kill(self.pid)
        }

        #[cfg(windows)]
        {
            use windows::Win32::System::Threading::TerminateProcess;

            unsafe { TerminateProcess(self.handle, 1) }
                .map_err(|e| WatchdogError::kill_failed(self.pid, format!("TerminateProcess failed: {}", e)))
        }
    }

    fn close(self: Box<Self>) {
        debug!("Released attached PID {}", self.pid);
    }
}

#[cfg(windows)]
impl Drop for AttachedProcess {
    fn drop(&mut self) {
        use windows::Win32::Foundation::CloseHandle;

        unsafe {
            let _ = CloseHandle(self.handle);
        }
    }
}
