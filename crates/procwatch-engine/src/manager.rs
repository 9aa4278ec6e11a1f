//! Top-level coordinator: one watchdog loop per configured target.

use crate::config::WatchdogConfig;
use crate::hang::HangDetector;
use crate::path::{normalize_path, PathKey};
use crate::scanner::ProcessScanner;
use crate::watchdog::{SupervisionOptions, WatchdogLoop, WatchdogStatus};
use parking_lot::Mutex;
use procwatch_common::WatchedTarget;
use procwatch_log::EventLog;
use procwatch_process::{ProcessControl, WindowInspector};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

struct LoopEntry {
    status: watch::Receiver<WatchdogStatus>,
    task: JoinHandle<WatchdogStatus>,
}

/// Launches and tracks the watchdog loops.
///
/// Loops share nothing but the event log; one target failing never affects
/// another. [`shutdown`](Self::shutdown) cancels every loop through a shared
/// parent token and waits for them to release their handles.
pub struct WatchManager {
    scanner: Arc<ProcessScanner>,
    detector: Arc<HangDetector>,
    options: SupervisionOptions,
    log: EventLog,
    cancel: CancellationToken,
    loops: Mutex<Vec<LoopEntry>>,
}

impl WatchManager {
    pub fn new(
        config: &WatchdogConfig,
        control: Arc<dyn ProcessControl>,
        inspector: Arc<dyn WindowInspector>,
        log: EventLog,
    ) -> Self {
        Self {
            scanner: Arc::new(ProcessScanner::new(control, log.clone())),
            detector: Arc::new(HangDetector::new(inspector, config.hang_detection.clone())),
            options: SupervisionOptions::from_config(config),
            log,
            cancel: CancellationToken::new(),
            loops: Mutex::new(Vec::new()),
        }
    }

    /// Resolve every usable target and launch its loop.
    ///
    /// Blank entries, paths missing on disk and repeats of an earlier entry
    /// are skipped. A target whose process cannot be found or spawned is
    /// logged and skipped. Returns the number of loops launched; does not
    /// wait for them. Must be called from within a tokio runtime.
    pub fn start_all(&self, targets: &[WatchedTarget]) -> usize {
        let mut seen: HashSet<PathKey> = HashSet::new();
        let mut launched = 0;

        for target in targets {
            if target.is_blank() {
                debug!("Ignoring blank target entry");
                continue;
            }
            if !target.path().exists() {
                self.log
                    .warn(format!("Configured path {} does not exist, skipped", target));
                continue;
            }
            if !seen.insert(normalize_path(target.path())) {
                self.log
                    .warn(format!("{} is configured more than once, watching it once", target));
                continue;
            }

            let process = match self.scanner.resolve_or_spawn(Arc::new(target.clone())) {
                Ok(process) => process,
                Err(e) => {
                    self.log.error(format!("Cannot supervise {}: {}", target, e));
                    continue;
                }
            };

            let (watchdog, status) = WatchdogLoop::new(
                process,
                self.scanner.clone(),
                self.detector.clone(),
                self.options.clone(),
                self.log.clone(),
                self.cancel.child_token(),
            );
            let task = tokio::spawn(watchdog.run());

            self.loops.lock().push(LoopEntry { status, task });
            launched += 1;
        }

        launched
    }

    /// Loops launched and not yet shut down
    pub fn loop_count(&self) -> usize {
        self.loops.lock().len()
    }

    /// Latest status of every loop, in launch order.
    pub fn statuses(&self) -> Vec<WatchdogStatus> {
        self.loops
            .lock()
            .iter()
            .map(|entry| entry.status.borrow().clone())
            .collect()
    }

    /// Cancel every loop and wait for it to finish.
    ///
    /// Returns the final status of each loop in launch order.
    pub async fn shutdown(&self) -> Vec<WatchdogStatus> {
        self.cancel.cancel();
        let entries: Vec<LoopEntry> = std::mem::take(&mut *self.loops.lock());

        let mut reports = Vec::with_capacity(entries.len());
        for entry in entries {
            match entry.task.await {
                Ok(report) => reports.push(report),
                Err(e) => {
                    error!("Watchdog task failed: {}", e);
                    reports.push(entry.status.borrow().clone());
                }
            }
        }
        reports
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{memory_log, wait_until, FakeProcessControl, FakeWindowInspector};
    use procwatch_log::MemorySink;
    use procwatch_state::SupervisedState;
    use std::path::PathBuf;
    use std::time::Duration;

    const WAIT: Duration = Duration::from_secs(5);

    fn fast_config() -> WatchdogConfig {
        let mut config = WatchdogConfig::from_process_address("/unused").unwrap();
        config.watchdog.poll_interval = Duration::from_millis(20);
        config.watchdog.kill_timeout = Duration::from_millis(500);
        config
    }

    fn manager(control: &FakeProcessControl) -> (WatchManager, Arc<MemorySink>) {
        let (log, sink) = memory_log();
        let manager = WatchManager::new(
            &fast_config(),
            Arc::new(control.clone()),
            Arc::new(FakeWindowInspector::new()),
            log,
        );
        (manager, sink)
    }

    fn touch(dir: &tempfile::TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, b"").unwrap();
        path
    }

    fn target(path: &std::path::Path) -> WatchedTarget {
        WatchedTarget::new(path.to_string_lossy())
    }

    #[tokio::test]
    async fn test_one_loop_per_target() {
        let dir = tempfile::tempdir().unwrap();
        let app_a = touch(&dir, "appA");
        let app_b = touch(&dir, "appB");

        let control = FakeProcessControl::new();
        let running_a = control.add_running(&app_a);
        let (manager, _) = manager(&control);

        let targets = vec![target(&app_a), target(&app_b), WatchedTarget::new("")];
        assert_eq!(manager.start_all(&targets), 2);
        assert_eq!(manager.loop_count(), 2);

        assert_eq!(control.spawn_count(&app_a), 0);
        assert_eq!(control.spawn_count(&app_b), 1);

        assert!(
            wait_until(WAIT, || manager
                .statuses()
                .iter()
                .all(|status| status.state == SupervisedState::Running))
            .await
        );
        let statuses = manager.statuses();
        assert_eq!(statuses[0].pid, Some(running_a));
        assert_eq!(statuses[1].path, app_b.display().to_string());

        let reports = manager.shutdown().await;
        assert_eq!(reports.len(), 2);
        assert!(reports
            .iter()
            .all(|report| report.state == SupervisedState::Stopped));
        assert_eq!(manager.loop_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_paths_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let present = touch(&dir, "present");
        let missing = dir.path().join("missing");

        let control = FakeProcessControl::new();
        let (manager, sink) = manager(&control);

        assert_eq!(manager.start_all(&[target(&missing), target(&present)]), 1);
        assert!(sink.contains("does not exist"));
        assert_eq!(control.spawned(), vec![present.clone()]);

        manager.shutdown().await;
    }

    #[tokio::test]
    async fn test_duplicate_entries_watched_once() {
        let dir = tempfile::tempdir().unwrap();
        let app = touch(&dir, "app");

        let control = FakeProcessControl::new();
        let (manager, sink) = manager(&control);

        let padded = WatchedTarget::new(format!("  {}  ", app.display()));
        assert_eq!(manager.start_all(&[target(&app), padded]), 1);
        assert_eq!(control.spawn_count(&app), 1);
        assert!(sink.contains("configured more than once"));

        manager.shutdown().await;
    }

    #[tokio::test]
    async fn test_spawn_failure_isolated_to_target() {
        let dir = tempfile::tempdir().unwrap();
        let broken = touch(&dir, "broken");
        let healthy = touch(&dir, "healthy");

        let control = FakeProcessControl::new();
        let running = control.add_running(&healthy);
        control.fail_spawns(true);
        let (manager, sink) = manager(&control);

        assert_eq!(manager.start_all(&[target(&broken), target(&healthy)]), 1);
        assert!(sink.contains("Cannot supervise"));
        assert_eq!(manager.statuses()[0].pid, Some(running));

        manager.shutdown().await;
    }

    #[tokio::test]
    async fn test_failed_loop_does_not_affect_others() {
        let dir = tempfile::tempdir().unwrap();
        let app_a = touch(&dir, "appA");
        let app_b = touch(&dir, "appB");

        let control = FakeProcessControl::new();
        let pid_a = control.add_running(&app_a);
        let pid_b = control.add_running(&app_b);
        let (manager, _) = manager(&control);
        assert_eq!(manager.start_all(&[target(&app_a), target(&app_b)]), 2);

        control.fail_spawns(true);
        control.exit_process(pid_a, 3);

        assert!(wait_until(WAIT, || manager.statuses()[0].state == SupervisedState::Failed).await);
        let statuses = manager.statuses();
        assert_eq!(statuses[1].state, SupervisedState::Running);
        assert_eq!(statuses[1].pid, Some(pid_b));

        let reports = manager.shutdown().await;
        assert_eq!(reports[0].state, SupervisedState::Failed);
        assert_eq!(reports[1].state, SupervisedState::Stopped);
        assert!(control.is_alive(pid_b));
    }
}
