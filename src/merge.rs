//! Reconcile command-line arguments, script directives and a previous submission into one option set
//!
//! Precedence, lowest first:
//! - submit: script directives < command line
//! - resubmit: script directives < previous submission < command line

use std::fs;
use std::path::Path;

use log::info;

use crate::error::{Result, WorkerError};
use crate::job::record::JobRecord;
use crate::job::JobDirectory;
use crate::scheduler::flags::Strictness;
use crate::scheduler::options::OptionSet;
use crate::scheduler::Scheduler;
use crate::script::{self, ParsedScript};

/// Options plus the job script they were partly read from
#[derive(Debug)]
pub struct Merged {
    pub options: OptionSet,
    pub script: ParsedScript,
}

/// Options for a new submission: the command line wins over the job script's directives
pub fn submit(scheduler: &dyn Scheduler, cli_args: &[String]) -> Result<Merged> {
    let cli = scheduler.parse_args(cli_args, Strictness::Strict)?;
    let batch = cli
        .worker
        .batch
        .clone()
        .ok_or_else(|| WorkerError::SchedulerOption("the job script must be given with --batch".to_string()))?;
    let prefix = cli.directive_prefix_or(scheduler.default_directive_prefix()).to_string();

    let script = script::parse(&batch, &prefix)?;
    let directives = scheduler.parse_args(&script.args, Strictness::Lenient)?;

    Ok(Merged { options: directives.overlay(cli), script })
}

/// Options for resubmitting the job in `--dir`
///
/// The previous job's script is parsed from its directory again, so the resubmission carries the
/// same directives, resources and worker settings unless the command line overrides them.
pub fn resubmit(scheduler: &dyn Scheduler, cli_args: &[String]) -> Result<Merged> {
    let cli = scheduler.parse_args(cli_args, Strictness::Strict)?;
    let dir = cli
        .worker
        .dir
        .clone()
        .ok_or_else(|| WorkerError::SchedulerOption("the previous job directory must be given with --dir".to_string()))?;
    let job = JobDirectory::existing(&dir)?;

    let prior_args = read_submit_record(&job.require(job.submit_record())?)?;
    let mut merged = scheduler.merge_options(cli_args, &prior_args)?;
    if let Some(record) = JobRecord::read(&job.job_record())? {
        merged.worker = record.worker.overlay(merged.worker);
    }

    let prefix = merged.directive_prefix_or(scheduler.default_directive_prefix()).to_string();
    let script = script::parse(&job.require(job.job_script())?, &prefix)?;
    let directives = scheduler.parse_args(&script.args, Strictness::Lenient)?;

    Ok(Merged { options: directives.overlay(merged), script })
}

/// Arguments of a recorded submission, without the submission command itself
pub fn read_submit_record(path: &Path) -> Result<Vec<String>> {
    info!("Reading previous submission from {}", path.display());
    let content = fs::read_to_string(path).map_err(|err| {
        WorkerError::WorkerDirectory(format!("can't read submission record {}: {}", path.display(), err))
    })?;
    let line = content.lines().next().unwrap_or_default();
    let mut tokens = shell_words::split(line).map_err(|err| {
        WorkerError::WorkerDirectory(format!("malformed submission record {}: {}", path.display(), err))
    })?;
    if tokens.is_empty() {
        return Err(WorkerError::WorkerDirectory(format!("empty submission record {}", path.display())));
    }
    tokens.remove(0);
    Ok(tokens)
}
