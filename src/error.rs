use std::io;
use std::path::Path;

use thiserror::Error;

/// Every failure the front end can report to the user
///
/// Each kind maps to its own process exit status, so a wrapper script can tell a bad data file
/// apart from a scheduler that refused the job.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("configuration issue, {0}")]
    Configuration(String),
    #[error("batch file issue, {0}")]
    BatchFile(String),
    #[error("data source issue, {0}")]
    DataSource(String),
    #[error("invalid scheduler argument, {0}")]
    SchedulerOption(String),
    #[error("job submission issue, {0}")]
    Submission(String),
    #[error("log file issue, {0}")]
    LogFile(String),
    #[error("worker directory issue, {0}")]
    WorkerDirectory(String),
    #[error("log parse issue, {0}")]
    LogParse(String),
    #[error("i/o issue, {0}")]
    Io(String),
}

pub type Result<T> = std::result::Result<T, WorkerError>;

impl WorkerError {
    pub fn exit_code(&self) -> i32 {
        match self {
            WorkerError::Io(_) => 1,
            WorkerError::BatchFile(_) => 2,
            WorkerError::Configuration(_) => 3,
            WorkerError::DataSource(_) => 10,
            WorkerError::SchedulerOption(_) => 11,
            WorkerError::Submission(_) => 12,
            WorkerError::LogFile(_) => 13,
            WorkerError::WorkerDirectory(_) => 14,
            WorkerError::LogParse(_) => 15,
        }
    }

    /// Wrap an artifact write failure with the offending path
    pub fn io(path: &Path, err: io::Error) -> WorkerError {
        WorkerError::Io(format!("{}: {}", path.display(), err))
    }
}
