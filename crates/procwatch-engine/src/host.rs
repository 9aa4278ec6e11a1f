//! Host-facing lifecycle.
//!
//! The hosting environment (service control manager, init system, a plain
//! binary) drives the watchdog through [`HostedService`] and nothing else.

use crate::config::WatchdogConfig;
use crate::manager::WatchManager;
use crate::watchdog::WatchdogStatus;
use async_trait::async_trait;
use parking_lot::Mutex;
use procwatch_common::{WatchdogError, WatchdogResult, WatchedTarget};
use procwatch_log::EventLog;
use procwatch_process::{ProcessControl, WindowInspector};
use std::sync::Arc;
use tracing::debug;

/// Start/stop hooks a hosting environment calls.
#[async_trait]
pub trait HostedService: Send + Sync {
    /// Begin supervision. `args` are host start parameters.
    async fn on_start(&self, args: &[String]) -> WatchdogResult<()>;

    /// Stop supervision and release every process handle.
    async fn on_stop(&self) -> WatchdogResult<()>;
}

/// The watchdog as a hosted service.
///
/// Non-empty start parameters replace the configured target list, one path
/// per parameter (each may itself be a comma-separated list).
pub struct WatchdogService {
    config: WatchdogConfig,
    control: Arc<dyn ProcessControl>,
    inspector: Arc<dyn WindowInspector>,
    log: EventLog,
    manager: Mutex<Option<Arc<WatchManager>>>,
}

impl WatchdogService {
    pub fn new(
        config: WatchdogConfig,
        control: Arc<dyn ProcessControl>,
        inspector: Arc<dyn WindowInspector>,
        log: EventLog,
    ) -> Self {
        Self {
            config,
            control,
            inspector,
            log,
            manager: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.manager.lock().is_some()
    }

    /// Current status of every loop; empty when not started.
    pub fn statuses(&self) -> Vec<WatchdogStatus> {
        match self.manager.lock().as_ref() {
            Some(manager) => manager.statuses(),
            None => Vec::new(),
        }
    }

    fn targets(&self, args: &[String]) -> Vec<WatchedTarget> {
        if args.iter().all(|arg| arg.trim().is_empty()) {
            return self.config.targets();
        }
        args.iter()
            .flat_map(|arg| arg.split(','))
            .map(WatchedTarget::new)
            .filter(|target| !target.is_blank())
            .collect()
    }
}

#[async_trait]
impl HostedService for WatchdogService {
    async fn on_start(&self, args: &[String]) -> WatchdogResult<()> {
        if self.is_running() {
            debug!("on_start called while already running");
            return Ok(());
        }

        let targets = self.targets(args);
        if targets.is_empty() {
            let error = WatchdogError::configuration(
                "process_address is not configured: no executable paths to supervise",
            );
            self.log.error(error.to_string());
            return Err(error);
        }

        self.log.info(format!(
            "procwatch starting, {} target(s) configured",
            targets.len()
        ));

        let manager = Arc::new(WatchManager::new(
            &self.config,
            self.control.clone(),
            self.inspector.clone(),
            self.log.clone(),
        ));
        let launched = manager.start_all(&targets);
        self.log.info(format!("procwatch started, {} target(s) supervised", launched));

        *self.manager.lock() = Some(manager);
        Ok(())
    }

    async fn on_stop(&self) -> WatchdogResult<()> {
        let manager = self.manager.lock().take();
        let Some(manager) = manager else {
            debug!("on_stop called while not running");
            return Ok(());
        };

        let reports = manager.shutdown().await;
        for report in &reports {
            debug!(
                "{} finished in state {} after {} restart(s)",
                report.path, report.state, report.restarts
            );
        }
        self.log.info(format!(
            "procwatch stopped, {} loop(s) shut down",
            reports.len()
        ));
        Ok(())
    }
}
