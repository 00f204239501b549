//! Job artifacts written at submission and read back on resubmission

/// Render job script templates
pub mod template;
/// Job metadata persisted next to the artifacts
pub mod record;
/// Run the scheduler's submission command
pub mod submit;

use std::path::{Path, PathBuf};

use crate::error::{Result, WorkerError};

static WORKFILE: &str = "workfile.txt";
static JOB_SCRIPT: &str = "jobscript.sh";
static SUBMIT_RECORD: &str = "submit.sh";
static JOB_RECORD: &str = "job.json";
static LOG: &str = "server.log";

/// Directory holding one job's artifacts
///
/// A JobDirectory contains:
/// - workfile.txt -> one block per work item
/// - jobscript.sh -> rendered job script handed to the scheduler
/// - submit.sh -> submission command line, shell quoted
/// - job.json -> worker settings and job id
/// - server.log -> work item start/done lines, written by the running job
#[derive(Debug, Clone)]
pub struct JobDirectory {
    pub path: PathBuf,
}

impl JobDirectory {
    /// Open the directory of a previous job, which must exist
    pub fn existing(path: &Path) -> Result<JobDirectory> {
        if !path.exists() {
            return Err(WorkerError::WorkerDirectory(format!("{} does not exist", path.display())));
        }
        if !path.is_dir() {
            return Err(WorkerError::WorkerDirectory(format!("{} is not a directory", path.display())));
        }
        Ok(JobDirectory { path: path.to_path_buf() })
    }

    pub fn workfile(&self) -> PathBuf {
        self.path.join(WORKFILE)
    }

    pub fn job_script(&self) -> PathBuf {
        self.path.join(JOB_SCRIPT)
    }

    pub fn submit_record(&self) -> PathBuf {
        self.path.join(SUBMIT_RECORD)
    }

    pub fn job_record(&self) -> PathBuf {
        self.path.join(JOB_RECORD)
    }

    pub fn log(&self) -> PathBuf {
        self.path.join(LOG)
    }

    /// Path of an artifact a previous job must have left behind
    pub fn require(&self, path: PathBuf) -> Result<PathBuf> {
        match path.is_file() {
            true => Ok(path),
            false => Err(WorkerError::WorkerDirectory(format!("missing {}", path.display()))),
        }
    }
}
