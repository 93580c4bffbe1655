//! Run summary: the one artifact a run hands to its caller and to notification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::outcome::{TargetOutcome, TargetStatus};

/// Aggregate status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverallStatus {
    AllSuccess,
    PartialFailure,
    AllFailed,
}

impl OverallStatus {
    /// Derive the overall status from per-target statuses.
    ///
    /// ALL_SUCCESS iff every outcome succeeded, ALL_FAILED iff every outcome
    /// failed, PARTIAL_FAILURE otherwise. SKIPPED is non-success, non-fatal.
    /// An empty set counts as ALL_SUCCESS.
    pub fn from_statuses<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = TargetStatus>,
    {
        let mut all_success = true;
        let mut all_failed = true;
        for status in statuses {
            all_success &= status == TargetStatus::Success;
            all_failed &= status == TargetStatus::Failed;
        }

        if all_success {
            OverallStatus::AllSuccess
        } else if all_failed {
            OverallStatus::AllFailed
        } else {
            OverallStatus::PartialFailure
        }
    }

    pub fn from_outcomes(outcomes: &[TargetOutcome]) -> Self {
        Self::from_statuses(outcomes.iter().map(|o| o.status))
    }
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OverallStatus::AllSuccess => "ALL_SUCCESS",
            OverallStatus::PartialFailure => "PARTIAL_FAILURE",
            OverallStatus::AllFailed => "ALL_FAILED",
        };
        f.write_str(s)
    }
}

/// Summary of one run across all enabled targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub outcomes: Vec<TargetOutcome>,
    pub overall_status: OverallStatus,
}

impl RunSummary {
    /// Begin accumulating a run.
    pub fn start(run_id: impl Into<String>) -> RunSummaryBuilder {
        RunSummaryBuilder {
            run_id: run_id.into(),
            start_time: Utc::now(),
            outcomes: Vec::new(),
        }
    }

    pub fn total_duration_ms(&self) -> i64 {
        (self.end_time - self.start_time).num_milliseconds()
    }

    pub fn count(&self, status: TargetStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }
}

/// Accumulator owned by the orchestrator while a run is in flight.
#[derive(Debug)]
pub struct RunSummaryBuilder {
    run_id: String,
    start_time: DateTime<Utc>,
    outcomes: Vec<TargetOutcome>,
}

impl RunSummaryBuilder {
    pub fn push(&mut self, outcome: TargetOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Seal the run: compute the overall status and stamp the end time.
    pub fn finish(self) -> RunSummary {
        let overall_status = OverallStatus::from_outcomes(&self.outcomes);
        RunSummary {
            run_id: self.run_id,
            start_time: self.start_time,
            end_time: Utc::now(),
            outcomes: self.outcomes,
            overall_status,
        }
    }
}
