//! Process control traits
//!
//! The watchdog engine only ever talks to these traits. [`NativeProcessControl`]
//! implements them for the running OS; tests substitute fakes.
//!
//! [`NativeProcessControl`]: crate::NativeProcessControl

use async_trait::async_trait;
use procwatch_common::WatchdogResult;
use std::fmt;
use std::path::{Path, PathBuf};

/// One row of a process enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEntry {
    pub pid: u32,
    pub name: String,
}

impl ProcessEntry {
    pub fn new(pid: u32, name: impl Into<String>) -> Self {
        Self {
            pid,
            name: name.into(),
        }
    }
}

/// How a process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessExit {
    /// Exit code, when the OS reports one
    pub code: Option<i32>,
}

impl fmt::Display for ProcessExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit code {}", code),
            None => write!(f, "unknown exit status"),
        }
    }
}

/// An OS process owned by one supervisor.
///
/// Dropping or [closing](ProcessHandle::close) the handle releases the OS
/// resources it holds but never terminates the process.
#[async_trait]
pub trait ProcessHandle: Send + fmt::Debug {
    /// OS process id
    fn pid(&self) -> u32;

    /// Resolve once the process has terminated.
    ///
    /// Cancel-safe: dropping the future before completion loses nothing, so it
    /// can sit in a `tokio::select!` next to a poll timer.
    async fn wait_for_exit(&mut self) -> WatchdogResult<ProcessExit>;

    /// Forcibly terminate the process. Does not wait for it to disappear.
    fn kill(&mut self) -> WatchdogResult<()>;

    /// Release the OS handle.
    fn close(self: Box<Self>);
}

/// Process-level operations of the host OS.
pub trait ProcessControl: Send + Sync {
    /// Enumerate currently running processes, in a stable order.
    fn list_processes(&self) -> WatchdogResult<Vec<ProcessEntry>>;

    /// Image path of a running process.
    ///
    /// Returns `AccessDenied` for protected processes and `PathUnreadable`
    /// for anything else that prevents the read.
    fn executable_path(&self, pid: u32) -> WatchdogResult<PathBuf>;

    /// Launch `path` as a new process.
    fn spawn(&self, path: &Path) -> WatchdogResult<Box<dyn ProcessHandle>>;

    /// Take ownership of an already-running process.
    fn attach(&self, pid: u32) -> WatchdogResult<Box<dyn ProcessHandle>>;
}
