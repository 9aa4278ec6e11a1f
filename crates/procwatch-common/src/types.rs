//! Core domain types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// One configured executable that must be kept running.
///
/// Created once from configuration at startup and never mutated afterwards;
/// supervision loops hold it behind an `Arc`.
///
/// # Example
/// ```
/// use procwatch_common::WatchedTarget;
///
/// let target = WatchedTarget::new("  /opt/kiosk/app  ");
/// assert_eq!(target.path().to_str(), Some("/opt/kiosk/app"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WatchedTarget {
    path: PathBuf,
}

impl WatchedTarget {
    /// Creates a target from a configured path, trimming surrounding whitespace.
    pub fn new(path: impl AsRef<str>) -> Self {
        Self {
            path: PathBuf::from(path.as_ref().trim()),
        }
    }

    /// Returns the executable path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the path as it should appear in log lines.
    pub fn display(&self) -> String {
        self.path.display().to_string()
    }

    /// True when the configured entry was blank.
    pub fn is_blank(&self) -> bool {
        self.path.as_os_str().is_empty()
    }
}

impl fmt::Display for WatchedTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

impl From<&str> for WatchedTarget {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for WatchedTarget {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_trims_whitespace() {
        let target = WatchedTarget::from("\t/bin/appA \n");
        assert_eq!(target.path(), Path::new("/bin/appA"));
        assert_eq!(target.to_string(), "/bin/appA");
    }

    #[test]
    fn test_blank_target() {
        assert!(WatchedTarget::from("   ").is_blank());
        assert!(!WatchedTarget::from("/bin/appB").is_blank());
    }
}
