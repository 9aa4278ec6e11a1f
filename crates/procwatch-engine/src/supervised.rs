//! Runtime binding between a watched target and one OS process.

use procwatch_common::{WatchdogResult, WatchedTarget};
use procwatch_process::ProcessHandle;
use procwatch_state::{SupervisedState, SupervisionStateMachine};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A watched target bound to the process currently standing in for it.
///
/// Owned by exactly one watchdog loop. Holds at most one live handle;
/// [`replace_handle`](Self::replace_handle) closes the previous one before
/// binding the next, and dropping the binding releases whatever is left.
pub struct SupervisedProcess {
    target: Arc<WatchedTarget>,
    handle: Option<Box<dyn ProcessHandle>>,
    machine: SupervisionStateMachine,
    restarts: u32,
    spawned_at: Option<Instant>,
}

impl SupervisedProcess {
    /// Bind to a process found already running.
    pub fn adopted(target: Arc<WatchedTarget>, handle: Box<dyn ProcessHandle>) -> Self {
        Self::bind(target, handle, SupervisedState::Running, None)
    }

    /// Bind to a process the scanner just launched.
    pub fn spawned(target: Arc<WatchedTarget>, handle: Box<dyn ProcessHandle>) -> Self {
        Self::bind(target, handle, SupervisedState::Starting, Some(Instant::now()))
    }

    fn bind(
        target: Arc<WatchedTarget>,
        handle: Box<dyn ProcessHandle>,
        initial: SupervisedState,
        spawned_at: Option<Instant>,
    ) -> Self {
        let machine = SupervisionStateMachine::new(target.display(), initial);
        Self {
            target,
            handle: Some(handle),
            machine,
            restarts: 0,
            spawned_at,
        }
    }

    pub fn target(&self) -> &Arc<WatchedTarget> {
        &self.target
    }

    pub fn pid(&self) -> Option<u32> {
        self.handle.as_ref().map(|handle| handle.pid())
    }

    pub fn state(&self) -> SupervisedState {
        self.machine.current_state()
    }

    /// Why the binding entered its current state
    pub fn last_reason(&self) -> Option<&str> {
        self.machine.last_reason()
    }

    /// Completed restart episodes
    pub fn restarts(&self) -> u32 {
        self.restarts
    }

    /// Time since the current process was launched by the watchdog.
    /// `None` for an adopted process.
    pub fn since_spawn(&self) -> Option<Duration> {
        self.spawned_at.map(|at| at.elapsed())
    }

    pub fn handle(&self) -> Option<&dyn ProcessHandle> {
        self.handle.as_deref()
    }

    pub fn handle_mut(&mut self) -> Option<&mut (dyn ProcessHandle + 'static)> {
        self.handle.as_deref_mut()
    }

    pub fn transition(&mut self, state: SupervisedState, reason: Option<String>) -> WatchdogResult<()> {
        self.machine.transition_to(state, reason)
    }

    /// Bind a replacement process, closing the previous handle first.
    pub fn replace_handle(&mut self, handle: Box<dyn ProcessHandle>) {
        self.release();
        self.handle = Some(handle);
        self.spawned_at = Some(Instant::now());
        self.restarts += 1;
    }

    /// Close the current handle, if any. The process itself keeps running.
    pub fn release(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.close();
        }
    }
}

impl Drop for SupervisedProcess {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for SupervisedProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupervisedProcess")
            .field("target", &self.target.display())
            .field("pid", &self.pid())
            .field("state", &self.state())
            .field("restarts", &self.restarts)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeProcessControl;
    use procwatch_process::ProcessControl;
    use std::path::Path;

    #[tokio::test]
    async fn test_replace_closes_previous_handle() {
        let control = FakeProcessControl::new();
        let target = Arc::new(WatchedTarget::new("/bin/appA"));

        let first = control.spawn(Path::new("/bin/appA")).unwrap();
        let first_pid = first.pid();
        let mut process = SupervisedProcess::spawned(target, first);
        assert_eq!(process.state(), SupervisedState::Starting);

        let second = control.spawn(Path::new("/bin/appA")).unwrap();
        let second_pid = second.pid();
        process.replace_handle(second);

        assert_eq!(control.closed(), vec![first_pid]);
        assert_eq!(process.pid(), Some(second_pid));
        assert_eq!(process.restarts(), 1);

        drop(process);
        assert_eq!(control.closed(), vec![first_pid, second_pid]);
    }

    #[tokio::test]
    async fn test_adopted_starts_running() {
        let control = FakeProcessControl::new();
        let pid = control.add_running("/bin/appA");
        let handle = control.attach(pid).unwrap();

        let mut process = SupervisedProcess::adopted(Arc::new(WatchedTarget::new("/bin/appA")), handle);
        assert_eq!(process.state(), SupervisedState::Running);
        assert_eq!(process.since_spawn(), None);
        assert!(process.transition(SupervisedState::Starting, None).is_err());
        assert_eq!(process.last_reason(), None);

        process.release();
        assert_eq!(process.pid(), None);
        assert_eq!(control.closed(), vec![pid]);
    }
}
