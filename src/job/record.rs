use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{Result, WorkerError};
use crate::scheduler::options::WorkerOptions;
use crate::scheduler::SchedulerKind;

/// Worker settings of a submitted job
///
/// The submission record only holds scheduler arguments, so the settings the front end consumes
/// itself (core count, port) are kept here for resubmission.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct JobRecord {
    pub scheduler: SchedulerKind,
    pub item_count: usize,
    pub separator: String,
    pub worker: WorkerOptions,
    pub submitted_at: DateTime<Utc>,
    pub job_id: Option<String>,
}

impl JobRecord {
    pub fn new(scheduler: SchedulerKind, item_count: usize, separator: &str, worker: &WorkerOptions) -> JobRecord {
        JobRecord {
            scheduler,
            item_count,
            separator: separator.to_string(),
            worker: WorkerOptions { num_cores: worker.num_cores, port: worker.port, ..Default::default() },
            submitted_at: Utc::now(),
            job_id: None,
        }
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        info!("Writing job record to {}", path.display());
        let json = serde_json::to_string_pretty(self).map_err(|err| WorkerError::Io(err.to_string()))?;
        fs::write(path, json).map_err(|err| WorkerError::io(path, err))
    }

    /// Read a job record, `None` if the job left none behind
    pub fn read(path: &Path) -> Result<Option<JobRecord>> {
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(path).map_err(|err| WorkerError::io(path, err))?;
        serde_json::from_str(&json)
            .map(Some)
            .map_err(|err| WorkerError::WorkerDirectory(format!("invalid job record {}: {}", path.display(), err)))
    }
}
