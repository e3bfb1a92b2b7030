use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::answer::Provenance;
use crate::domain::job::{JobId, JobPosting};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Submitted,
    StoppedBeforeSubmit,
    Skipped,
    Failed,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::StoppedBeforeSubmit => "stopped_before_submit",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        }
    }
}

/// The system-of-record entry for one job in one run. Appended to the
/// ledger exactly once per job per run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub outcome_id: String,
    pub job_id: JobId,
    pub title: String,
    pub company: String,
    pub url: String,
    pub status: RunStatus,
    pub reason: String,
    pub resume_path: Option<PathBuf>,
    pub answer_provenance: Vec<Provenance>,
    pub recorded_at: DateTime<Utc>,
}

impl RunOutcome {
    pub fn new(job: &JobPosting, status: RunStatus, reason: impl Into<String>) -> Self {
        Self {
            outcome_id: Uuid::new_v4().to_string(),
            job_id: job.id.clone(),
            title: job.title.clone(),
            company: job.company.clone(),
            url: job.url.clone(),
            status,
            reason: reason.into(),
            resume_path: None,
            answer_provenance: Vec::new(),
            recorded_at: Utc::now(),
        }
    }

    pub fn with_resume_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.resume_path = Some(path.into());
        self
    }

    pub fn with_answer_provenance(mut self, tags: Vec<Provenance>) -> Self {
        self.answer_provenance = tags;
        self
    }
}
