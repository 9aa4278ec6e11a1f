//! Process spawning.

use crate::control::{ProcessExit, ProcessHandle};
use async_trait::async_trait;
use procwatch_common::{WatchdogError, WatchdogResult};
use std::path::Path;
use std::process::Stdio;
use tokio::process::{Child, Command};
use tracing::debug;

/// A process launched by the watchdog.
#[derive(Debug)]
pub struct SpawnedProcess {
    child: Child,
    pid: u32,
}

/// Launch `path` with no arguments.
///
/// The working directory is the executable's own directory and standard
/// streams are detached. Must be called from within a tokio runtime.
pub fn spawn_process(path: &Path) -> WatchdogResult<SpawnedProcess> {
    let mut command = Command::new(path);
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        command.current_dir(dir);
    }
    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    let child = command
        .spawn()
        .map_err(|e| WatchdogError::spawn_failed(path.display().to_string(), e.to_string()))?;

    let pid = child.id().ok_or_else(|| {
        WatchdogError::spawn_failed(
            path.display().to_string(),
            "process exited before its pid could be read",
        )
    })?;

    debug!("Spawned {} (PID: {})", path.display(), pid);
    Ok(SpawnedProcess { child, pid })
}

#[async_trait]
impl ProcessHandle for SpawnedProcess {
    fn pid(&self) -> u32 {
        self.pid
    }

    async fn wait_for_exit(&mut self) -> WatchdogResult<ProcessExit> {
        let status = self.child.wait().await.map_err(|e| {
            WatchdogError::transient_poll(self.pid.to_string(), format!("wait failed: {}", e))
        })?;
        Ok(ProcessExit {
            code: status.code(),
        })
    }

    fn kill(&mut self) -> WatchdogResult<()> {
        self.child
            .start_kill()
            .map_err(|e| WatchdogError::kill_failed(self.pid, e.to_string()))
    }

    fn close(self: Box<Self>) {
        debug!("Released handle of PID {}", self.pid);
    }
}
