//! Event log façade shared by every watchdog component.

use crate::output::LogSink;
use chrono::{DateTime, Local};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Source of timestamps for log lines.
pub type Clock = Arc<dyn Fn() -> DateTime<Local> + Send + Sync>;

/// Shared logger: one `tracing` event plus one sink line per call.
///
/// Sink failures are discarded; logging never interrupts supervision.
#[derive(Clone)]
pub struct EventLog {
    sink: Arc<dyn LogSink>,
    clock: Clock,
}

impl fmt::Debug for EventLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLog").finish_non_exhaustive()
    }
}

impl EventLog {
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self::with_clock(sink, Arc::new(Local::now))
    }

    pub fn with_clock(sink: Arc<dyn LogSink>, clock: Clock) -> Self {
        Self { sink, clock }
    }

    pub fn info(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        info!("{}", message);
        self.record(message);
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        warn!("{}", message);
        self.record(message);
    }

    pub fn error(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        error!("{}", message);
        self.record(message);
    }

    fn record(&self, message: &str) {
        if let Err(e) = self.sink.record((self.clock)(), message) {
            debug!("Dropped log line: {}", e);
        }
    }
}
