//! Path normalisation for executable matching.

use std::fmt;
use std::path::Path;

/// Comparison-ready form of an executable path.
///
/// Derived on demand and never cached across process enumerations.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathKey(String);

impl PathKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// An empty key never identifies a real executable.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `self` and `other` name the same executable.
    pub fn matches(&self, other: &PathKey) -> bool {
        !self.is_empty() && self == other
    }
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalise a path string: trim whitespace, strip trailing separators and
/// case-fold.
pub fn normalize(path: impl AsRef<str>) -> PathKey {
    let trimmed = path
        .as_ref()
        .trim_start()
        .trim_end_matches(|c: char| c == '\\' || c == '/' || c.is_whitespace());

    PathKey(trimmed.to_lowercase())
}

/// Normalise a filesystem path.
pub fn normalize_path(path: &Path) -> PathKey {
    normalize(path.to_string_lossy())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_and_trailing_separator() {
        assert_eq!(normalize("C:\\App\\x.exe\\"), normalize("c:\\app\\x.exe"));
        assert_eq!(normalize("  /opt/App/run/ "), normalize("/opt/app/run"));
    }

    #[test]
    fn test_idempotent() {
        let cases = [
            "",
            "   ",
            "/",
            "C:\\App\\x.exe\\",
            "C:\\App\\x.exe \\ ",
            "/usr/bin//",
            "  /Opt/Kiosk/App  ",
            "D:\\未响应\\程序.EXE",
        ];

        for case in cases {
            let once = normalize(case);
            let twice = normalize(once.as_str());
            assert_eq!(once, twice, "normalize not idempotent for {:?}", case);
        }
    }

    #[test]
    fn test_empty_never_matches() {
        let empty = normalize("   ");
        assert!(empty.is_empty());
        assert!(!empty.matches(&normalize("")));
        assert!(normalize("/a").matches(&normalize("/A/")));
    }

    #[test]
    fn test_distinct_paths_differ() {
        assert_ne!(normalize("/opt/app"), normalize("/opt/app2"));
        assert!(!normalize("/opt/app").matches(&normalize("/opt/ap")));
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(Path::new("/Opt/App")), normalize("/opt/app"));
    }
}
