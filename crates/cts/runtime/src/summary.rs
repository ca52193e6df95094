//! Run summary.

use std::fmt;

use chrono::{DateTime, Utc};
use cts_framework::{GroupResult, Status};
use serde::Serialize;

/// Aggregate counts over one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub specs: usize,
    pub total: usize,
    pub passed: usize,
    pub warned: usize,
    pub failed: usize,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl RunSummary {
    pub fn from_results(groups: &[GroupResult], started_at: DateTime<Utc>) -> Self {
        let count = |status: Status| {
            groups
                .iter()
                .flat_map(|g| g.cases.iter())
                .filter(|c| c.status == status)
                .count()
        };
        Self {
            specs: groups.len(),
            total: groups.iter().map(|g| g.cases.len()).sum(),
            passed: count(Status::Pass),
            warned: count(Status::Warn),
            failed: count(Status::Fail),
            started_at,
            completed_at: Utc::now(),
        }
    }

    /// Warnings do not fail a run.
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    pub fn duration_ms(&self) -> i64 {
        (self.completed_at - self.started_at).num_milliseconds()
    }

    pub fn to_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "+-------------------------------------------------+")?;
        writeln!(f, "|   CTS Run Summary                               |")?;
        writeln!(f, "+-------------------------------------------------+")?;
        writeln!(
            f,
            "| Total: {:4}  Passed: {:4}  Warned: {:4}  Failed: {:4}",
            self.total, self.passed, self.warned, self.failed,
        )?;
        writeln!(
            f,
            "| Specs: {:4}  Took: {}ms  Finished: {}",
            self.specs,
            self.duration_ms(),
            self.completed_at.format("%Y-%m-%d %H:%M:%S UTC"),
        )?;
        writeln!(f, "+-------------------------------------------------+")?;
        if self.all_passed() {
            write!(f, "  ALL TESTS PASSED")
        } else {
            write!(f, "  {} TEST(S) FAILED", self.failed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cts_framework::CaseResult;

    fn case(name: &str, status: Status) -> CaseResult {
        CaseResult {
            name: name.into(),
            params: None,
            status,
            logs: Vec::new(),
            timems: 0.0,
        }
    }

    #[test]
    fn test_counts_by_status() {
        let groups = vec![
            GroupResult {
                spec: "cts:a".into(),
                cases: vec![case("x", Status::Pass), case("y", Status::Warn)],
            },
            GroupResult {
                spec: "cts:b".into(),
                cases: vec![case("z", Status::Fail)],
            },
        ];
        let summary = RunSummary::from_results(&groups, Utc::now());
        assert_eq!(summary.specs, 2);
        assert_eq!(summary.total, 3);
        assert_eq!((summary.passed, summary.warned, summary.failed), (1, 1, 1));
        assert!(!summary.all_passed());
        assert!(summary.to_text().contains("1 TEST(S) FAILED"));
    }

    #[test]
    fn test_warnings_still_pass() {
        let groups = vec![GroupResult {
            spec: "cts:a".into(),
            cases: vec![case("w", Status::Warn)],
        }];
        let summary = RunSummary::from_results(&groups, Utc::now());
        assert!(summary.all_passed());
        assert!(summary.to_text().ends_with("ALL TESTS PASSED"));
    }
}
