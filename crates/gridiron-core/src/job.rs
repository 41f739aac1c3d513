use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::GridironError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    CompletedWithErrors,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::CompletedWithErrors => "completed_with_errors",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(JobStatus::Pending),
            "running" => Some(JobStatus::Running),
            "completed" => Some(JobStatus::Completed),
            "completed_with_errors" => Some(JobStatus::CompletedWithErrors),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::CompletedWithErrors)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemStatus {
    #[serde(rename = "success")]
    Success,
    #[serde(rename = "skipped (dry_run)")]
    Skipped,
    #[serde(rename = "failed")]
    Failed,
}

/// Outcome of one requested stat. `record_count` is set only on success,
/// `error_detail` only on failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatResult {
    pub stat: String,
    pub status: ItemStatus,
    #[serde(rename = "records", default, skip_serializing_if = "Option::is_none")]
    pub record_count: Option<usize>,
    #[serde(rename = "error", default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

impl StatResult {
    pub fn success(stat: impl Into<String>, record_count: usize) -> Self {
        Self {
            stat: stat.into(),
            status: ItemStatus::Success,
            record_count: Some(record_count),
            error_detail: None,
        }
    }

    pub fn skipped(stat: impl Into<String>) -> Self {
        Self {
            stat: stat.into(),
            status: ItemStatus::Skipped,
            record_count: None,
            error_detail: None,
        }
    }

    pub fn failed(stat: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            stat: stat.into(),
            status: ItemStatus::Failed,
            record_count: None,
            error_detail: Some(error.into()),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == ItemStatus::Failed
    }
}

/// One batch request's lifecycle: PENDING -> RUNNING -> COMPLETED[_WITH_ERRORS].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeJob {
    /// Storage identity; `None` until the job store has written the row.
    pub id: Option<i64>,
    pub season: i32,
    pub requested_stats: Vec<String>,
    pub dry_run: bool,
    pub status: JobStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub results: Vec<StatResult>,
}

impl ScrapeJob {
    pub fn new(season: i32, requested_stats: Vec<String>, dry_run: bool) -> Self {
        Self {
            id: None,
            season,
            requested_stats,
            dry_run,
            status: JobStatus::Pending,
            started_at: None,
            finished_at: None,
            results: Vec::new(),
        }
    }

    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), GridironError> {
        if self.status != JobStatus::Pending {
            return Err(self.transition_error("start"));
        }
        self.status = JobStatus::Running;
        self.started_at = Some(now);
        Ok(())
    }

    /// Appends the next item's outcome; results must arrive in request order.
    pub fn record(&mut self, result: StatResult) -> Result<(), GridironError> {
        if self.status != JobStatus::Running {
            return Err(self.transition_error("record a result on"));
        }
        let expected = self.requested_stats.get(self.results.len());
        if expected != Some(&result.stat) {
            return Err(GridironError::Validation(format!(
                "result for {} out of order (expected {:?})",
                result.stat, expected
            )));
        }
        self.results.push(result);
        Ok(())
    }

    pub fn finish(&mut self, now: DateTime<Utc>) -> Result<(), GridironError> {
        if self.status != JobStatus::Running {
            return Err(self.transition_error("finish"));
        }
        if self.results.len() != self.requested_stats.len() {
            return Err(GridironError::Validation(format!(
                "job has {} results for {} requested stats",
                self.results.len(),
                self.requested_stats.len()
            )));
        }
        self.finished_at = Some(now);
        self.status = derive_status(&self.results);
        Ok(())
    }

    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_failed()).count()
    }

    fn transition_error(&self, action: &str) -> GridironError {
        GridironError::Validation(format!(
            "cannot {action} a job in state {}",
            self.status.as_str()
        ))
    }
}

/// Terminal status as a pure function of the results.
pub fn derive_status(results: &[StatResult]) -> JobStatus {
    if results.iter().any(StatResult::is_failed) {
        JobStatus::CompletedWithErrors
    } else {
        JobStatus::Completed
    }
}
