//! # procwatch log
//!
//! Operator-facing event log for the watchdog.
//!
//! This crate provides:
//! - [`LogSink`], the collaborator that persists one timestamped line per event
//! - [`DailyFileSink`], one `YYYYMMDD.log` file per calendar day
//! - [`MemorySink`], an in-memory sink for tests and embedding hosts
//! - [`EventLog`], the shared façade every engine component receives; it
//!   forwards each event to `tracing` and to the sink, swallowing sink errors

pub mod event;
pub mod output;

pub use event::{Clock, EventLog};
pub use output::{format_line, log_file_name, DailyFileSink, LogSink, MemorySink};
