//! Log sinks

use chrono::{DateTime, Local, NaiveDate};
use parking_lot::Mutex;
use procwatch_common::{WatchdogError, WatchdogResult};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Persists one event line. Implementations serialise concurrent writers.
pub trait LogSink: Send + Sync {
    /// Write `message` stamped with `timestamp`.
    fn record(&self, timestamp: DateTime<Local>, message: &str) -> WatchdogResult<()>;
}

/// Format: `[2024-01-01 08:30:00]：message`
pub fn format_line(timestamp: DateTime<Local>, message: &str) -> String {
    format!("[{}]：{}", timestamp.format("%Y-%m-%d %H:%M:%S"), message)
}

/// `20240101.log`
pub fn log_file_name(date: NaiveDate) -> String {
    format!("{}.log", date.format("%Y%m%d"))
}

struct OpenLog {
    date: NaiveDate,
    writer: BufWriter<File>,
}

/// Appends lines to `<directory>/<YYYYMMDD>.log`, rolling over at midnight.
/// Dates only move forward: once a day's file is open, earlier days are
/// never reopened.
///
/// The directory is created on first use. The whole
/// open-append-flush sequence runs under one lock so lines from concurrent
/// loops never interleave.
pub struct DailyFileSink {
    directory: PathBuf,
    current: Mutex<Option<OpenLog>>,
}

impl DailyFileSink {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            current: Mutex::new(None),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Path of the file that receives lines stamped on `date`.
    pub fn file_for(&self, date: NaiveDate) -> PathBuf {
        self.directory.join(log_file_name(date))
    }

    fn open(&self, date: NaiveDate) -> WatchdogResult<OpenLog> {
        std::fs::create_dir_all(&self.directory)?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.file_for(date))?;

        Ok(OpenLog {
            date,
            writer: BufWriter::new(file),
        })
    }
}

impl LogSink for DailyFileSink {
    fn record(&self, timestamp: DateTime<Local>, message: &str) -> WatchdogResult<()> {
        let mut current = self.current.lock();

        // A line stamped just before midnight can arrive after the roll-over;
        // it stays in the newer file instead of reopening yesterday's.
        let open_date = current.as_ref().map(|log| log.date);
        let date = match open_date {
            Some(open) if open > timestamp.date_naive() => open,
            _ => timestamp.date_naive(),
        };
        if open_date != Some(date) {
            *current = Some(self.open(date)?);
        }

        let line = format_line(timestamp, message);
        let result = match current.as_mut() {
            Some(log) => writeln!(log.writer, "{}", line).and_then(|_| log.writer.flush()),
            None => return Err(WatchdogError::configuration("log file not open")),
        };

        if let Err(e) = result {
            // Reopen on the next call; the file may have been removed.
            *current = None;
            return Err(e.into());
        }

        Ok(())
    }
}

/// Keeps formatted lines in memory.
#[derive(Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    /// True if any recorded line contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.lines.lock().iter().any(|line| line.contains(needle))
    }

    /// Number of recorded lines containing `needle`.
    pub fn count(&self, needle: &str) -> usize {
        self.lines
            .lock()
            .iter()
            .filter(|line| line.contains(needle))
            .count()
    }
}

impl LogSink for MemorySink {
    fn record(&self, timestamp: DateTime<Local>, message: &str) -> WatchdogResult<()> {
        self.lines.lock().push(format_line(timestamp, message));
        Ok(())
    }
}
