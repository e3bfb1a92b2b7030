use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::debug;

use crate::domain::outcome::RunOutcome;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("could not open ledger `{path}`: {source}")]
    Open { path: PathBuf, source: std::io::Error },
    #[error("could not serialize outcome for job `{job_id}`: {source}")]
    Serialize { job_id: String, source: serde_json::Error },
    #[error("could not append outcome for job `{job_id}`: {source}")]
    Append { job_id: String, source: std::io::Error },
}

/// Destination for per-job run outcomes. Append is the only mutation.
pub trait OutcomeSink: Send + Sync {
    fn record(&self, outcome: &RunOutcome) -> Result<(), LedgerError>;
}

/// Append-only JSON Lines ledger, one outcome per line. The full line is
/// written with a single `write_all` under a mutex so concurrent appends
/// for different jobs never interleave partial records. The file is never
/// rewritten or compacted here; retention is an external concern.
#[derive(Debug)]
pub struct JsonlLedger {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonlLedger {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|source| LedgerError::Open { path: path.clone(), source })?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| LedgerError::Open { path: path.clone(), source })?;

        Ok(Self { path, file: Mutex::new(file) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl OutcomeSink for JsonlLedger {
    fn record(&self, outcome: &RunOutcome) -> Result<(), LedgerError> {
        let mut line = serde_json::to_string(outcome).map_err(|source| {
            LedgerError::Serialize { job_id: outcome.job_id.0.clone(), source }
        })?;
        line.push('\n');

        let mut file = match self.file.lock() {
            Ok(file) => file,
            Err(poisoned) => poisoned.into_inner(),
        };
        file.write_all(line.as_bytes())
            .and_then(|()| file.flush())
            .map_err(|source| LedgerError::Append { job_id: outcome.job_id.0.clone(), source })?;

        debug!(
            job_id = %outcome.job_id.0,
            status = outcome.status.as_str(),
            "outcome appended to ledger"
        );
        Ok(())
    }
}

/// In-memory sink for tests and dry inspection.
#[derive(Clone, Default)]
pub struct MemoryLedger {
    outcomes: Arc<Mutex<Vec<RunOutcome>>>,
}

impl MemoryLedger {
    pub fn outcomes(&self) -> Vec<RunOutcome> {
        match self.outcomes.lock() {
            Ok(outcomes) => outcomes.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl OutcomeSink for MemoryLedger {
    fn record(&self, outcome: &RunOutcome) -> Result<(), LedgerError> {
        match self.outcomes.lock() {
            Ok(mut outcomes) => outcomes.push(outcome.clone()),
            Err(poisoned) => poisoned.into_inner().push(outcome.clone()),
        }
        Ok(())
    }
}
