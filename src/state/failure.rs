/// Failure taxonomy for pages and candidates
///
/// Every failure that the crawl recovers from is tagged with one of these
/// kinds, logged inline and counted in the run summary.
use std::fmt;

/// Why a page or candidate could not be processed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FailureKind {
    /// Timeout, connection error, 429 or 5xx after retries were exhausted
    Transient,

    /// 4xx other than 429; never retried
    TerminalHttp,

    /// Malformed HTML or embedded JSON, or a failed structured search
    Extraction,

    /// Disk full, permission denied and similar filesystem errors
    Storage,

    /// Unreadable container; the container itself is kept
    Archive,

    /// Unreadable or unwritable product manifest
    Manifest,
}

impl FailureKind {
    /// Maps a fetch status to a failure kind
    ///
    /// Status 0 stands for "no response at all" and counts as transient,
    /// as do 429 and 5xx that survived the retry loop. Anything below 400
    /// is not a failure.
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            0 | 429 => Some(Self::Transient),
            s if s >= 500 => Some(Self::Transient),
            s if s >= 400 => Some(Self::TerminalHttp),
            _ => None,
        }
    }

    /// Stable string used in the run summary
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transient => "transient",
            Self::TerminalHttp => "terminal_http",
            Self::Extraction => "extraction",
            Self::Storage => "storage",
            Self::Archive => "archive",
            Self::Manifest => "manifest",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status() {
        assert_eq!(FailureKind::from_status(200), None);
        assert_eq!(FailureKind::from_status(304), None);
        assert_eq!(FailureKind::from_status(0), Some(FailureKind::Transient));
        assert_eq!(FailureKind::from_status(429), Some(FailureKind::Transient));
        assert_eq!(FailureKind::from_status(503), Some(FailureKind::Transient));
        assert_eq!(FailureKind::from_status(404), Some(FailureKind::TerminalHttp));
        assert_eq!(FailureKind::from_status(403), Some(FailureKind::TerminalHttp));
    }

    #[test]
    fn test_display_matches_summary_string() {
        for kind in [
            FailureKind::Transient,
            FailureKind::TerminalHttp,
            FailureKind::Manifest,
        ] {
            assert_eq!(kind.to_string(), kind.as_str());
        }
    }
}
