use std::borrow::Cow;
use std::fs;
use std::path::Path;

use anyhow::Context;
use log::info;
use serde::Serialize;
use tinytemplate::TinyTemplate;

use crate::config::Config;
use crate::error::{Result, WorkerError};
use crate::job::JobDirectory;
use crate::scheduler::options::WorkerOptions;
use crate::scheduler::Scheduler;
use crate::script::ParsedScript;

static DEFAULT_SHEBANG: &str = "#!/bin/bash -l";

/// Rendering context for a job script
///
/// The directive block goes right after the shebang, so a rendered script can be directive-parsed
/// again when the job is resubmitted.
#[derive(Debug, Serialize)]
pub struct JobScriptContext {
    shebang: String,
    directives: String,
    workfile: String,
    log: String,
    separator: String,
    array_var: String,
    job_id_var: String,
    num_cores: u32,
    port: String,
}

impl JobScriptContext {
    pub fn new(script: &ParsedScript, job: &JobDirectory, config: &Config, worker: &WorkerOptions) -> JobScriptContext {
        JobScriptContext {
            shebang: script.shebang.clone().unwrap_or_else(|| DEFAULT_SHEBANG.to_string()),
            directives: script.directives.trim_end().to_string(),
            workfile: quote_inner(&job.workfile().display().to_string()),
            log: quote_inner(&job.log().display().to_string()),
            separator: quote_inner(&config.separator),
            array_var: config.array_var.clone(),
            job_id_var: config.job_id_var.clone(),
            num_cores: worker.num_cores(),
            port: worker.port.map(|port| port.to_string()).unwrap_or_default(),
        }
    }
}

/// A rendered job script, ready to hand to the scheduler
pub struct JobScript {
    pub content: String,
}

impl JobScript {
    pub fn render(template: &str, context: &JobScriptContext) -> Result<JobScript> {
        let content = render_template(template, context)
            .map_err(|err| WorkerError::Configuration(format!("{err:#}")))?;
        Ok(JobScript { content })
    }

    pub fn write(&self, out_path: &Path) -> Result<()> {
        info!("Writing job script to {}", out_path.display());
        fs::write(out_path, &self.content).map_err(|err| WorkerError::io(out_path, err))
    }
}

/// The configured job script template, or the scheduler's built-in one
pub fn load_template(config: &Config, scheduler: &dyn Scheduler) -> Result<Cow<'static, str>> {
    match &config.template {
        Some(path) => {
            info!("Using job script template {}", path.display());
            fs::read_to_string(path).map(Cow::Owned).map_err(|err| {
                WorkerError::Configuration(format!("can't read job script template {}: {}", path.display(), err))
            })
        }
        None => Ok(Cow::Borrowed(scheduler.job_template())),
    }
}

fn render_template(template: &str, context: &JobScriptContext) -> anyhow::Result<String> {
    let mut tt = TinyTemplate::new();
    tt.set_default_formatter(&tinytemplate::format_unescaped);
    tt.add_template("job", template).context("invalid job script template")?;
    tt.render("job", context).context("can't render job script")
}

/// Escape a value for use inside single quotes
fn quote_inner(value: &str) -> String {
    value.replace('\'', r"'\''")
}
