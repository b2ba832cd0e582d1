//! What a fetch flow reports back to its caller.

/// Outcome of one end-to-end fetch-and-merge pass.
///
/// This is the only thing that crosses the coordinator boundary: internal
/// errors collapse into [`FetchSummary::Failed`], and a genuinely empty
/// feed (including a 204/404 "no data" answer) is a success with zero new
/// records. A malformed response is reported as a failure, so callers can
/// tell it apart from an empty one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchSummary {
    Merged { new_records: usize },
    Failed { reason: String },
}

impl FetchSummary {
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, FetchSummary::Failed { .. })
    }

    /// New-record count, or `None` for a failure.
    #[must_use]
    pub fn new_records(&self) -> Option<usize> {
        match self {
            FetchSummary::Merged { new_records } => Some(*new_records),
            FetchSummary::Failed { .. } => None,
        }
    }
}

impl std::fmt::Display for FetchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchSummary::Merged { new_records } => {
                write!(f, "{new_records} new records merged")
            }
            FetchSummary::Failed { reason } => write!(f, "fetch failed: {reason}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_reads_like_a_status_line() {
        let merged = FetchSummary::Merged { new_records: 3 };
        assert_eq!(merged.to_string(), "3 new records merged");
        assert_eq!(merged.new_records(), Some(3));
        assert!(!merged.is_failure());

        let failed = FetchSummary::Failed {
            reason: "connection refused".to_string(),
        };
        assert_eq!(failed.to_string(), "fetch failed: connection refused");
        assert_eq!(failed.new_records(), None);
        assert!(failed.is_failure());
    }
}
