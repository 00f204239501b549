use std::path::Path;

use log::info;

use crate::config::Config;
use crate::data::{ArraySpec, DataSources};
use crate::error::Result;
use crate::merge::{self, Merged};
use crate::workfile;
use crate::workflow::{report_outcome, stage_and_submit, working_dir, Outcome};

/// `worker submit`: one array task per data record, payload taken from the `--batch` script
pub fn run(config: &Config, args: &[String]) -> Result<()> {
    let outcome = submit_in(&working_dir()?, config, args)?;
    report_outcome(&outcome);
    Ok(())
}

pub fn submit_in(base: &Path, config: &Config, args: &[String]) -> Result<Outcome> {
    let scheduler = config.scheduler();
    let Merged { options, script } = merge::submit(scheduler, args)?;

    let array = options
        .array_request
        .as_deref()
        .map(|expression| ArraySpec { expression, variable: &config.array_var });
    let sources = DataSources::new(&options.worker.data, config.sniff_length, array)?;
    info!("Building work items from {} data files", options.worker.data.len());

    stage_and_submit(base, config, scheduler, &options, &script, |path| {
        workfile::build(path, sources, &script.payload, &config.separator)
    })
}
