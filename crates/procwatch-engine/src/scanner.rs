//! Spawn-or-adopt resolution for watched targets.

use crate::path::{normalize_path, PathKey};
use crate::supervised::SupervisedProcess;
use procwatch_common::{WatchdogError, WatchdogResult, WatchedTarget};
use procwatch_log::EventLog;
use procwatch_process::{ProcessControl, ProcessEntry, ProcessHandle};
use std::sync::Arc;
use tracing::debug;

/// Kernel pseudo-processes whose image path is never read.
pub const PROTECTED_PROCESS_NAMES: &[&str] = &["System", "Idle"];

/// Matches configured executables against running processes.
pub struct ProcessScanner {
    control: Arc<dyn ProcessControl>,
    log: EventLog,
}

impl ProcessScanner {
    pub fn new(control: Arc<dyn ProcessControl>, log: EventLog) -> Self {
        Self { control, log }
    }

    /// Bind `target` to a running instance, or launch one.
    ///
    /// The first enumerated process whose image path matches wins; further
    /// instances of the same executable stay unsupervised. A spawn failure is
    /// returned to the caller and never retried here.
    pub fn resolve_or_spawn(&self, target: Arc<WatchedTarget>) -> WatchdogResult<SupervisedProcess> {
        let key = normalize_path(target.path());

        for entry in self.matching_processes(&key)? {
            match self.control.attach(entry.pid) {
                Ok(handle) => {
                    self.log.info(format!(
                        "{} is already running (pid {}), watching it",
                        target, entry.pid
                    ));
                    return Ok(SupervisedProcess::adopted(target, handle));
                }
                Err(e) => {
                    // Exited between enumeration and attach, or not ours to open
                    debug!("Could not attach to {} (pid {}): {}", target, entry.pid, e);
                }
            }
        }

        let handle = self.spawn(&target)?;
        self.log.info(format!(
            "{} was not running, started it (pid {})",
            target,
            handle.pid()
        ));
        Ok(SupervisedProcess::spawned(target, handle))
    }

    /// Launch a fresh instance of `target`.
    pub fn spawn(&self, target: &WatchedTarget) -> WatchdogResult<Box<dyn ProcessHandle>> {
        self.control.spawn(target.path())
    }

    /// Running processes whose image matches `key`, in enumeration order.
    fn matching_processes(&self, key: &PathKey) -> WatchdogResult<Vec<ProcessEntry>> {
        let mut matches = Vec::new();

        for entry in self.control.list_processes()? {
            if PROTECTED_PROCESS_NAMES.contains(&entry.name.as_str()) {
                continue;
            }

            match self.control.executable_path(entry.pid) {
                Ok(path) => {
                    if key.matches(&normalize_path(&path)) {
                        matches.push(entry);
                    }
                }
                Err(WatchdogError::AccessDenied { pid }) => {
                    self.log.warn(format!(
                        "Access denied reading image path of {} (pid {}), skipped",
                        entry.name, pid
                    ));
                }
                Err(e) => {
                    debug!("Skipping {} (pid {}): {}", entry.name, entry.pid, e);
                }
            }
        }

        Ok(matches)
    }
}
