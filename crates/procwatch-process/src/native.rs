//! Native [`ProcessControl`] adapter for the running OS.

use crate::attach::AttachedProcess;
use crate::control::{ProcessControl, ProcessEntry, ProcessHandle};
use crate::execute::spawn_process;
use crate::image::executable_path;
use parking_lot::Mutex;
use procwatch_common::WatchdogResult;
use std::path::{Path, PathBuf};
use sysinfo::System;

/// Process control backed by `sysinfo` enumeration and the OS primitives in
/// this crate.
pub struct NativeProcessControl {
    system: Mutex<System>,
}

impl NativeProcessControl {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }
}

impl Default for NativeProcessControl {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessControl for NativeProcessControl {
    fn list_processes(&self) -> WatchdogResult<Vec<ProcessEntry>> {
        let mut system = self.system.lock();
        // Fresh snapshot every call; images change between scans
        system.refresh_processes();

        let mut entries: Vec<ProcessEntry> = system
            .processes()
            .iter()
            .map(|(pid, process)| ProcessEntry::new(pid.as_u32(), process.name()))
            .collect();
        entries.sort_by_key(|entry| entry.pid);

        Ok(entries)
    }

    fn executable_path(&self, pid: u32) -> WatchdogResult<PathBuf> {
        executable_path(pid)
    }

    fn spawn(&self, path: &Path) -> WatchdogResult<Box<dyn ProcessHandle>> {
        Ok(Box::new(spawn_process(path)?))
    }

    fn attach(&self, pid: u32) -> WatchdogResult<Box<dyn ProcessHandle>> {
        Ok(Box::new(AttachedProcess::attach(pid)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lists_current_process() {
        let control = NativeProcessControl::new();
        let entries = control.list_processes().unwrap();

        let me = std::process::id();
        assert!(entries.iter().any(|entry| entry.pid == me));
        assert!(entries.windows(2).all(|pair| pair[0].pid < pair[1].pid));
    }

    #[test]
    fn test_attach_current_process() {
        let control = NativeProcessControl::new();
        let handle = control.attach(std::process::id()).unwrap();
        assert_eq!(handle.pid(), std::process::id());
        handle.close();
    }
}
