//! In-memory process and window fakes for engine tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use procwatch_common::{WatchdogError, WatchdogResult};
use procwatch_log::{EventLog, MemorySink};
use procwatch_process::{
    ProcessControl, ProcessEntry, ProcessExit, ProcessHandle, WindowHandle, WindowInspector,
};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Title the window manager gives a hung window in the fakes
pub const HUNG_TITLE: &str = "Kiosk App (Not Responding)";

pub fn memory_log() -> (EventLog, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    (EventLog::new(sink.clone()), sink)
}

/// Poll `condition` until it holds or `timeout` elapses.
pub async fn wait_until<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

struct FakeProcess {
    name: String,
    path: PathBuf,
    exit: Arc<watch::Sender<Option<i32>>>,
}

impl FakeProcess {
    fn is_alive(&self) -> bool {
        self.exit.borrow().is_none()
    }
}

#[derive(Default)]
struct FakeState {
    next_pid: u32,
    processes: BTreeMap<u32, FakeProcess>,
    spawned: Vec<PathBuf>,
    closed: Vec<u32>,
    killed: Vec<u32>,
    path_reads: Vec<u32>,
    denied: HashSet<u32>,
    unattachable: HashSet<u32>,
    spawn_failure: bool,
    spawn_exit_code: Option<i32>,
    failing_waits: u32,
}

/// Scriptable [`ProcessControl`]. Clones share state.
#[derive(Clone)]
pub struct FakeProcessControl {
    state: Arc<Mutex<FakeState>>,
}

impl FakeProcessControl {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState {
                next_pid: 100,
                ..FakeState::default()
            })),
        }
    }

    fn insert(&self, name: &str, path: &Path) -> u32 {
        let mut state = self.state.lock();
        let pid = state.next_pid;
        state.next_pid += 1;
        let (exit, _) = watch::channel(None);
        state.processes.insert(
            pid,
            FakeProcess {
                name: name.to_string(),
                path: path.to_path_buf(),
                exit: Arc::new(exit),
            },
        );
        pid
    }

    /// A process that was running before the watchdog started.
    pub fn add_running(&self, path: impl AsRef<Path>) -> u32 {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        self.insert(&name, path)
    }

    pub fn add_named(&self, name: &str, path: impl AsRef<Path>) -> u32 {
        self.insert(name, path.as_ref())
    }

    pub fn deny_access(&self, pid: u32) {
        self.state.lock().denied.insert(pid);
    }

    pub fn refuse_attach(&self, pid: u32) {
        self.state.lock().unattachable.insert(pid);
    }

    pub fn fail_spawns(&self, fail: bool) {
        self.state.lock().spawn_failure = fail;
    }

    /// Spawns succeed but the new process exits at once with `code`.
    pub fn crash_spawns(&self, code: Option<i32>) {
        self.state.lock().spawn_exit_code = code;
    }

    /// The next `count` exit waits fail.
    pub fn fail_waits(&self, count: u32) {
        self.state.lock().failing_waits = count;
    }

    /// Terminate a process from outside the watchdog.
    pub fn exit_process(&self, pid: u32, code: i32) {
        if let Some(process) = self.state.lock().processes.get(&pid) {
            process.exit.send_replace(Some(code));
        }
    }

    pub fn is_alive(&self, pid: u32) -> bool {
        self.state
            .lock()
            .processes
            .get(&pid)
            .map(FakeProcess::is_alive)
            .unwrap_or(false)
    }

    pub fn spawned(&self) -> Vec<PathBuf> {
        self.state.lock().spawned.clone()
    }

    pub fn spawn_count(&self, path: impl AsRef<Path>) -> usize {
        let path = path.as_ref();
        self.state
            .lock()
            .spawned
            .iter()
            .filter(|spawned| spawned.as_path() == path)
            .count()
    }

    pub fn closed(&self) -> Vec<u32> {
        self.state.lock().closed.clone()
    }

    pub fn killed(&self) -> Vec<u32> {
        self.state.lock().killed.clone()
    }

    pub fn path_reads(&self) -> Vec<u32> {
        self.state.lock().path_reads.clone()
    }
}

impl ProcessControl for FakeProcessControl {
    fn list_processes(&self) -> WatchdogResult<Vec<ProcessEntry>> {
        Ok(self
            .state
            .lock()
            .processes
            .iter()
            .filter(|(_, process)| process.is_alive())
            .map(|(pid, process)| ProcessEntry::new(*pid, process.name.clone()))
            .collect())
    }

    fn executable_path(&self, pid: u32) -> WatchdogResult<PathBuf> {
        let mut state = self.state.lock();
        state.path_reads.push(pid);
        if state.denied.contains(&pid) {
            return Err(WatchdogError::access_denied(pid));
        }
        state
            .processes
            .get(&pid)
            .map(|process| process.path.clone())
            .ok_or_else(|| WatchdogError::path_unreadable(pid, "no such process"))
    }

    fn spawn(&self, path: &Path) -> WatchdogResult<Box<dyn ProcessHandle>> {
        if self.state.lock().spawn_failure {
            return Err(WatchdogError::spawn_failed(
                path.display().to_string(),
                "No such file or directory",
            ));
        }
        let pid = self.add_running(path);
        self.state.lock().spawned.push(path.to_path_buf());
        let handle = self.attach(pid)?;

        let crash = self.state.lock().spawn_exit_code;
        if let Some(code) = crash {
            self.exit_process(pid, code);
        }
        Ok(handle)
    }

    fn attach(&self, pid: u32) -> WatchdogResult<Box<dyn ProcessHandle>> {
        let state = self.state.lock();
        if state.unattachable.contains(&pid) {
            return Err(WatchdogError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "attach refused",
            )));
        }
        let process = state
            .processes
            .get(&pid)
            .filter(|process| process.is_alive())
            .ok_or_else(|| {
                WatchdogError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("process {} not found", pid),
                ))
            })?;

        Ok(Box::new(FakeHandle {
            pid,
            exit: process.exit.clone(),
            exit_rx: process.exit.subscribe(),
            state: self.state.clone(),
        }))
    }
}

pub struct FakeHandle {
    pid: u32,
    exit: Arc<watch::Sender<Option<i32>>>,
    exit_rx: watch::Receiver<Option<i32>>,
    state: Arc<Mutex<FakeState>>,
}

impl fmt::Debug for FakeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FakeHandle").field("pid", &self.pid).finish()
    }
}

#[async_trait]
impl ProcessHandle for FakeHandle {
    fn pid(&self) -> u32 {
        self.pid
    }

    async fn wait_for_exit(&mut self) -> WatchdogResult<ProcessExit> {
        {
            let mut state = self.state.lock();
            if state.failing_waits > 0 {
                state.failing_waits -= 1;
                return Err(WatchdogError::transient_poll(
                    self.pid.to_string(),
                    "wait interrupted",
                ));
            }
        }

        let code = self
            .exit_rx
            .wait_for(Option::is_some)
            .await
            .map(|code| *code)
            .map_err(|_| WatchdogError::transient_poll(self.pid.to_string(), "exit channel closed"))?;
        Ok(ProcessExit { code })
    }

    fn kill(&mut self) -> WatchdogResult<()> {
        self.state.lock().killed.push(self.pid);
        self.exit.send_replace(Some(-9));
        Ok(())
    }

    fn close(self: Box<Self>) {
        self.state.lock().closed.push(self.pid);
    }
}

struct FakeWindow {
    handle: WindowHandle,
    class_name: String,
    title: String,
    owner: Option<u32>,
}

#[derive(Default)]
struct WindowState {
    windows: Vec<FakeWindow>,
    next_handle: isize,
    queries: u32,
    failing: bool,
}

/// Scriptable [`WindowInspector`]. Clones share state.
#[derive(Clone, Default)]
pub struct FakeWindowInspector {
    state: Arc<Mutex<WindowState>>,
}

impl FakeWindowInspector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_window(&self, class_name: &str, title: &str, owner: Option<u32>) -> WindowHandle {
        let mut state = self.state.lock();
        state.next_handle += 1;
        let handle = WindowHandle(state.next_handle);
        state.windows.push(FakeWindow {
            handle,
            class_name: class_name.to_string(),
            title: title.to_string(),
            owner,
        });
        handle
    }

    pub fn remove_window(&self, handle: WindowHandle) {
        self.state.lock().windows.retain(|window| window.handle != handle);
    }

    pub fn fail_lookups(&self, fail: bool) {
        self.state.lock().failing = fail;
    }

    /// Number of class lookups performed so far
    pub fn queries(&self) -> u32 {
        self.state.lock().queries
    }
}

impl WindowInspector for FakeWindowInspector {
    fn find_windows_by_class(&self, class_name: &str) -> WatchdogResult<Vec<WindowHandle>> {
        let mut state = self.state.lock();
        state.queries += 1;
        if state.failing {
            return Err(WatchdogError::window("desktop unavailable"));
        }
        Ok(state
            .windows
            .iter()
            .filter(|window| window.class_name == class_name)
            .map(|window| window.handle)
            .collect())
    }

    fn window_title(&self, window: WindowHandle) -> WatchdogResult<String> {
        self.state
            .lock()
            .windows
            .iter()
            .find(|candidate| candidate.handle == window)
            .map(|candidate| candidate.title.clone())
            .ok_or_else(|| WatchdogError::window("window destroyed"))
    }

    fn window_owner(&self, window: WindowHandle) -> Option<u32> {
        self.state
            .lock()
            .windows
            .iter()
            .find(|candidate| candidate.handle == window)
            .and_then(|candidate| candidate.owner)
    }
}
