//! Per-target supervision loop.
//!
//! One loop owns one [`SupervisedProcess`] and is its only writer. Each
//! iteration races three things: host cancellation, the OS exit wait and the
//! poll timer. Exit wins over the timer, so a process that died is never
//! mistaken for a hung one. On the timer the hang detector is consulted.
//!
//! ```text
//! exit      -> Dead -> (wait one poll, spawn) Starting -> Running
//! hang      -> Unresponsive -> Restarting -> kill, wait -> (spawn) Starting -> Running
//! spawn err -> Failed, loop ends
//! cancel    -> Stopped, loop ends
//! ```

use crate::config::WatchdogConfig;
use crate::hang::HangDetector;
use crate::scanner::ProcessScanner;
use crate::supervised::SupervisedProcess;
use procwatch_common::WatchdogError;
use procwatch_log::EventLog;
use procwatch_process::ProcessExit;
use procwatch_state::SupervisedState;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// Timing and policy knobs for one loop.
#[derive(Debug, Clone)]
pub struct SupervisionOptions {
    pub poll_interval: Duration,
    pub kill_timeout: Duration,
    /// Hung polls in a row before restarting
    pub hang_polls: u32,
    pub startup_grace: Duration,
    pub terminate_on_stop: bool,
}

impl SupervisionOptions {
    pub fn from_config(config: &WatchdogConfig) -> Self {
        Self {
            poll_interval: config.watchdog.poll_interval,
            kill_timeout: config.watchdog.kill_timeout,
            hang_polls: config.hang_detection.consecutive_polls.max(1),
            startup_grace: config.hang_detection.startup_grace,
            terminate_on_stop: config.watchdog.terminate_on_stop,
        }
    }
}

impl Default for SupervisionOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(3),
            kill_timeout: Duration::from_secs(5),
            hang_polls: 1,
            startup_grace: Duration::from_secs(10),
            terminate_on_stop: false,
        }
    }
}

/// Read-only snapshot of a loop, published after every transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchdogStatus {
    pub path: String,
    pub pid: Option<u32>,
    pub state: SupervisedState,
    pub restarts: u32,
    /// Reason given for the latest transition
    pub reason: Option<String>,
}

impl WatchdogStatus {
    fn of(process: &SupervisedProcess) -> Self {
        Self {
            path: process.target().display(),
            pid: process.pid(),
            state: process.state(),
            restarts: process.restarts(),
            reason: process.last_reason().map(str::to_string),
        }
    }
}

enum LoopEvent {
    Cancelled,
    Exited(ProcessExit),
    Hung,
}

enum Wake {
    Tick,
    PollFailed(WatchdogError),
}

pub struct WatchdogLoop {
    process: SupervisedProcess,
    scanner: Arc<ProcessScanner>,
    detector: Arc<HangDetector>,
    options: SupervisionOptions,
    log: EventLog,
    cancel: CancellationToken,
    status: watch::Sender<WatchdogStatus>,
    hung_polls: u32,
}

impl WatchdogLoop {
    pub fn new(
        process: SupervisedProcess,
        scanner: Arc<ProcessScanner>,
        detector: Arc<HangDetector>,
        options: SupervisionOptions,
        log: EventLog,
        cancel: CancellationToken,
    ) -> (Self, watch::Receiver<WatchdogStatus>) {
        let (status, receiver) = watch::channel(WatchdogStatus::of(&process));
        let watchdog = Self {
            process,
            scanner,
            detector,
            options,
            log,
            cancel,
            status,
            hung_polls: 0,
        };
        (watchdog, receiver)
    }

    /// Supervise until the host cancels or the target can no longer be
    /// spawned. Returns the final status.
    pub async fn run(mut self) -> WatchdogStatus {
        if self.process.state() == SupervisedState::Starting {
            self.enter(SupervisedState::Running, Some("process bound".to_string()));
        }
        self.log.info(format!(
            "Watching {} (pid {})",
            self.process.target(),
            self.pid_label()
        ));

        loop {
            let restarted = match self.next_event().await {
                LoopEvent::Cancelled => break,
                LoopEvent::Exited(exit) => self.recover_from_exit(exit).await,
                LoopEvent::Hung => self.restart_hung().await,
            };
            let Some(restarted) = restarted else {
                break;
            };

            if !restarted {
                return self.finish();
            }
        }

        self.stop();
        self.finish()
    }

    /// Wait for the next thing the loop must react to.
    async fn next_event(&mut self) -> LoopEvent {
        let mut ticker = tokio::time::interval(self.options.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately
        ticker.tick().await;

        loop {
            let Some(handle) = self.process.handle_mut() else {
                return LoopEvent::Exited(ProcessExit { code: None });
            };

            let wake = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return LoopEvent::Cancelled,
                result = handle.wait_for_exit() => match result {
                    Ok(exit) => return LoopEvent::Exited(exit),
                    Err(e) => Wake::PollFailed(e),
                },
                _ = ticker.tick() => Wake::Tick,
            };

            match wake {
                Wake::Tick => {
                    if self.poll_hang() {
                        return LoopEvent::Hung;
                    }
                }
                Wake::PollFailed(e) => {
                    self.report_poll_failure(e);
                    tokio::select! {
                        _ = self.cancel.cancelled() => return LoopEvent::Cancelled,
                        _ = tokio::time::sleep(self.options.poll_interval) => {}
                    }
                }
            }
        }
    }

    /// One hang poll. True once the configured number of hung polls in a
    /// row has been reached.
    fn poll_hang(&mut self) -> bool {
        if !self.detector.is_enabled() {
            return false;
        }
        let grace = self.options.startup_grace;
        if self.process.since_spawn().is_some_and(|elapsed| elapsed < grace) {
            self.hung_polls = 0;
            return false;
        }
        let Some(handle) = self.process.handle() else {
            return false;
        };

        match self.detector.is_unresponsive(handle) {
            Ok(true) => {
                self.hung_polls += 1;
                debug!(
                    "{} hung poll {}/{}",
                    self.process.target(),
                    self.hung_polls,
                    self.options.hang_polls
                );
                self.hung_polls >= self.options.hang_polls
            }
            Ok(false) => {
                self.hung_polls = 0;
                false
            }
            Err(e) => {
                self.report_poll_failure(e);
                false
            }
        }
    }

    /// Log a failed poll against this loop's target. Supervision goes on.
    fn report_poll_failure(&self, e: WatchdogError) {
        let reason = match e {
            WatchdogError::TransientPoll { reason, .. } => reason,
            other => other.to_string(),
        };
        self.log.warn(
            WatchdogError::transient_poll(self.process.target().display(), reason).to_string(),
        );
    }

    /// Running -> Dead -> Starting.
    ///
    /// The re-spawn waits one poll interval so an executable that dies on
    /// launch is restarted at the poll rate. `None` if cancelled during that
    /// wait, otherwise whether the re-spawn succeeded.
    async fn recover_from_exit(&mut self, exit: ProcessExit) -> Option<bool> {
        let reason = format!("process exited ({})", exit);
        self.log.warn(format!(
            "{} (pid {}) exited with {}, restarting it",
            self.process.target(),
            self.pid_label(),
            exit
        ));
        self.enter(SupervisedState::Dead, Some(reason));
        self.process.release();

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return None,
            _ = tokio::time::sleep(self.options.poll_interval) => {}
        }
        Some(self.respawn())
    }

    /// Running -> Unresponsive -> Restarting -> Starting.
    ///
    /// `None` if cancelled while waiting for the hung instance to die,
    /// otherwise whether the re-spawn succeeded.
    async fn restart_hung(&mut self) -> Option<bool> {
        self.log.warn(format!(
            "{} (pid {}) is not responding, restarting it",
            self.process.target(),
            self.pid_label()
        ));
        self.enter(
            SupervisedState::Unresponsive,
            Some("window reported not responding".to_string()),
        );
        self.enter(
            SupervisedState::Restarting,
            Some("terminating hung instance".to_string()),
        );

        if !self.terminate().await {
            return None;
        }
        Some(self.respawn())
    }

    /// Kill the current process and wait, bounded, for it to go away.
    /// False if cancelled while waiting.
    async fn terminate(&mut self) -> bool {
        let target = self.process.target().clone();
        let Some(handle) = self.process.handle_mut() else {
            return true;
        };
        let pid = handle.pid();

        if let Err(e) = handle.kill() {
            self.log.warn(format!("Failed to kill {} (pid {}): {}", target, pid, e));
        }

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return false,
            result = tokio::time::timeout(self.options.kill_timeout, handle.wait_for_exit()) => {
                match result {
                    Ok(Ok(exit)) => debug!("{} (pid {}) terminated with {}", target, pid, exit),
                    Ok(Err(e)) => debug!("Wait after kill of {} (pid {}) failed: {}", target, pid, e),
                    Err(_) => self.log.warn(format!(
                        "{} (pid {}) did not exit within {:?} of being killed",
                        target, pid, self.options.kill_timeout
                    )),
                }
            }
        }

        self.process.release();
        true
    }

    /// Spawn a replacement and go back to Running, or end in Failed.
    fn respawn(&mut self) -> bool {
        match self.scanner.spawn(self.process.target()) {
            Ok(handle) => {
                self.process.replace_handle(handle);
                self.hung_polls = 0;
                self.enter(
                    SupervisedState::Starting,
                    Some("process re-spawned".to_string()),
                );
                self.enter(SupervisedState::Running, Some("process bound".to_string()));
                self.log.info(format!(
                    "Restarted {} (pid {})",
                    self.process.target(),
                    self.pid_label()
                ));
                true
            }
            Err(e) => {
                self.enter(SupervisedState::Failed, Some(e.to_string()));
                self.log.error(format!(
                    "Giving up on {}: {}",
                    self.process.target(),
                    e
                ));
                false
            }
        }
    }

    /// Host cancellation: release the handle, optionally killing first.
    fn stop(&mut self) {
        let target = self.process.target().clone();
        if self.options.terminate_on_stop {
            if let Some(handle) = self.process.handle_mut() {
                let pid = handle.pid();
                if let Err(e) = handle.kill() {
                    self.log.warn(format!(
                        "Failed to kill {} (pid {}) on stop: {}",
                        target, pid, e
                    ));
                }
            }
        }

        self.process.release();
        self.enter(
            SupervisedState::Stopped,
            Some("supervision cancelled".to_string()),
        );
        self.log.info(format!("Stopped watching {}", target));
    }

    fn finish(self) -> WatchdogStatus {
        WatchdogStatus::of(&self.process)
    }

    fn enter(&mut self, state: SupervisedState, reason: Option<String>) {
        if let Err(e) = self.process.transition(state, reason) {
            error!("{}", e);
        }
        self.publish();
    }

    fn publish(&self) {
        self.status.send_replace(WatchdogStatus::of(&self.process));
    }

    fn pid_label(&self) -> String {
        self.process
            .pid()
            .map(|pid| pid.to_string())
            .unwrap_or_else(|| "none".to_string())
    }
}
