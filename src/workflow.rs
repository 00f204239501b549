//! Top level commands, gluing parsing, merging, work file building and submission together

pub mod resubmit;
pub mod submit;
pub mod summarize;

use std::env;
use std::path::{Path, PathBuf};

use log::info;
use tempfile::Builder;

use crate::config::Config;
use crate::error::{Result, WorkerError};
use crate::job::record::JobRecord;
use crate::job::submit::SubmitCommand;
use crate::job::template::{self, JobScript, JobScriptContext};
use crate::job::JobDirectory;
use crate::scheduler::options::OptionSet;
use crate::scheduler::Scheduler;
use crate::script::ParsedScript;

/// What a submit or resubmit left behind
#[derive(Debug, Clone)]
pub struct Outcome {
    pub job: JobDirectory,
    pub item_count: usize,
    /// `None` for a dry run
    pub job_id: Option<String>,
}

/// Write all artifacts of a new job into a fresh directory under `base` and submit it
///
/// `write_workfile` fills the work file and returns its item count. The directory is removed
/// again if any step fails, including submission.
fn stage_and_submit<F>(
    base: &Path,
    config: &Config,
    scheduler: &dyn Scheduler,
    options: &OptionSet,
    script: &ParsedScript,
    write_workfile: F,
) -> Result<Outcome>
where
    F: FnOnce(&Path) -> Result<usize>,
{
    let staging = Builder::new()
        .prefix(&config.tempdir_prefix)
        .tempdir_in(base)
        .map_err(|err| WorkerError::io(base, err))?;
    let job = JobDirectory { path: staging.path().to_path_buf() };
    info!("Staging job in {}", job.path.display());

    let item_count = write_workfile(&job.workfile())?;
    if item_count == 0 {
        return Err(WorkerError::DataSource("the data sources produced no work items".to_string()));
    }

    let template = template::load_template(config, scheduler)?;
    let context = JobScriptContext::new(script, &job, config, &options.worker);
    JobScript::render(&template, &context)?.write(&job.job_script())?;

    let command = SubmitCommand::new(
        &config.submit_command,
        scheduler.submission_args(options, item_count),
        &job.job_script(),
    );
    command.write(&job.submit_record())?;

    let mut record = JobRecord::new(scheduler.kind(), item_count, &config.separator, &options.worker);
    record.write(&job.job_record())?;

    let job_id = match options.worker.dryrun {
        true => {
            info!("Dry run, not submitting {}", command.to_line());
            None
        }
        false => {
            let job_id = command.run(scheduler)?;
            record.job_id = Some(job_id.clone());
            record.write(&job.job_record())?;
            Some(job_id)
        }
    };

    let path = staging.into_path();
    Ok(Outcome { job: JobDirectory { path }, item_count, job_id })
}

/// Job directories are created in the directory the command runs in
fn working_dir() -> Result<PathBuf> {
    env::current_dir().map_err(|err| WorkerError::Io(format!("can't determine working directory: {err}")))
}

/// Tell the user where the job went
fn report_outcome(outcome: &Outcome) {
    match &outcome.job_id {
        Some(job_id) => {
            println!("{job_id}");
            info!("Submitted {} work items, job directory {}", outcome.item_count, outcome.job.path.display());
        }
        None => println!(
            "dry run: {} work items staged in {}",
            outcome.item_count,
            outcome.job.path.display()
        ),
    }
}
