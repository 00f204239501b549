//! Front end settings: which scheduler to talk to and how job artifacts are laid out

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use log::info;
use serde::Deserialize;

use crate::error::{Result, WorkerError};
use crate::scheduler::{Scheduler, SchedulerKind};

const CONFIG_FILE_NAME: &str = "worker.toml";
const CONFIG_ENV_VAR: &str = "WORKER_CONFIG";
const DEFAULT_SEPARATOR: &str = "#WORKER----";
const DEFAULT_TEMPDIR_PREFIX: &str = "worker_";
const DEFAULT_SNIFF_LENGTH: usize = 1024;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    #[serde(default)]
    scheduler: FileSchedulerConfig,
    #[serde(default)]
    worker: FileWorkerConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSchedulerConfig {
    name: Option<SchedulerKind>,
    submit_command: Option<String>,
    array_var: Option<String>,
    job_id_var: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileWorkerConfig {
    separator: Option<String>,
    tempdir_prefix: Option<String>,
    sniff_length: Option<usize>,
    template: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub scheduler: SchedulerKind,
    pub submit_command: String,
    /// Environment variable holding the array task index inside a running job
    pub array_var: String,
    pub job_id_var: String,
    /// Line between work item blocks in a work file
    pub separator: String,
    pub tempdir_prefix: String,
    /// Bytes of a data file inspected to guess its delimiter
    pub sniff_length: usize,
    /// Job script template replacing the built-in one
    pub template: Option<PathBuf>,
}

impl Config {
    pub fn scheduler(&self) -> &'static dyn Scheduler {
        self.scheduler.scheduler()
    }

    fn from_file(file: FileConfig) -> Result<Config> {
        let kind = file.scheduler.name.unwrap_or(SchedulerKind::PbsTorque);
        let scheduler = kind.scheduler();
        let separator = file.worker.separator.unwrap_or_else(|| DEFAULT_SEPARATOR.to_string());
        if separator.trim().is_empty() || separator.contains('\n') {
            return Err(WorkerError::Configuration("separator must be a single non-blank line".to_string()));
        }

        Ok(Config {
            scheduler: kind,
            submit_command: file
                .scheduler
                .submit_command
                .unwrap_or_else(|| scheduler.default_submit_command().to_string()),
            array_var: file.scheduler.array_var.unwrap_or_else(|| scheduler.default_array_var().to_string()),
            job_id_var: file.scheduler.job_id_var.unwrap_or_else(|| scheduler.default_job_id_var().to_string()),
            separator,
            tempdir_prefix: file.worker.tempdir_prefix.unwrap_or_else(|| DEFAULT_TEMPDIR_PREFIX.to_string()),
            sniff_length: file.worker.sniff_length.unwrap_or(DEFAULT_SNIFF_LENGTH),
            template: file.worker.template,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        let scheduler = SchedulerKind::PbsTorque.scheduler();
        Config {
            scheduler: scheduler.kind(),
            submit_command: scheduler.default_submit_command().to_string(),
            array_var: scheduler.default_array_var().to_string(),
            job_id_var: scheduler.default_job_id_var().to_string(),
            separator: DEFAULT_SEPARATOR.to_string(),
            tempdir_prefix: DEFAULT_TEMPDIR_PREFIX.to_string(),
            sniff_length: DEFAULT_SNIFF_LENGTH,
            template: None,
        }
    }
}

/// Load settings from `--config`, else `$WORKER_CONFIG`, else `worker.toml` in the current directory
///
/// Only the implicit file may be missing, in which case the built-in defaults apply.
pub fn load(config_path_override: Option<PathBuf>) -> Result<Config> {
    load_from(config_path_override, std::env::var_os(CONFIG_ENV_VAR), Path::new("."))
}

fn load_from(config_path_override: Option<PathBuf>, env_value: Option<OsString>, cwd: &Path) -> Result<Config> {
    let (path, required) = match (config_path_override, env_value) {
        (Some(path), _) => (path, true),
        (None, Some(value)) if !value.is_empty() => (PathBuf::from(value), true),
        (None, Some(_)) => {
            return Err(WorkerError::Configuration(format!("{CONFIG_ENV_VAR} is set but empty")));
        }
        (None, None) => (cwd.join(CONFIG_FILE_NAME), false),
    };

    let file = read_config_file(&path, required).map_err(|err| WorkerError::Configuration(format!("{err:#}")))?;
    let config = Config::from_file(file)?;
    info!("Using scheduler {} submitting with {}", config.scheduler, config.submit_command);
    Ok(config)
}

fn read_config_file(path: &Path, required: bool) -> anyhow::Result<FileConfig> {
    if !path.exists() {
        if required {
            anyhow::bail!("config file not found at {}", path.display());
        }
        return Ok(FileConfig::default());
    }

    info!("Reading config file {}", path.display());
    let contents =
        fs::read_to_string(path).with_context(|| format!("failed to read config file {}", path.display()))?;
    toml::from_str(&contents).with_context(|| format!("failed to parse config file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_any_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_from(None, None, dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.scheduler, SchedulerKind::PbsTorque);
        assert_eq!(config.submit_command, "qsub");
        assert_eq!(config.array_var, "PBS_ARRAYID");
        assert_eq!(config.separator, "#WORKER----");
        assert_eq!(config.tempdir_prefix, "worker_");
        assert_eq!(config.sniff_length, 1024);
    }

    #[test]
    fn implicit_file_selects_scheduler_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("worker.toml"), "[scheduler]\nname = \"slurm\"\n[worker]\nsniff_length = 64\n").unwrap();
        let config = load_from(None, None, dir.path()).unwrap();
        assert_eq!(config.scheduler, SchedulerKind::Slurm);
        assert_eq!(config.submit_command, "sbatch");
        assert_eq!(config.array_var, "SLURM_ARRAY_TASK_ID");
        assert_eq!(config.job_id_var, "SLURM_ARRAY_JOB_ID");
        assert_eq!(config.sniff_length, 64);
    }

    #[test]
    fn explicit_file_overrides_environment() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = dir.path().join("explicit.toml");
        let env = dir.path().join("env.toml");
        fs::write(&explicit, "[scheduler]\nsubmit_command = \"/opt/torque/bin/qsub\"\n").unwrap();
        fs::write(&env, "[scheduler]\nname = \"slurm\"\n").unwrap();

        let config = load_from(Some(explicit), Some(env.clone().into_os_string()), dir.path()).unwrap();
        assert_eq!(config.submit_command, "/opt/torque/bin/qsub");

        let config = load_from(None, Some(env.into_os_string()), dir.path()).unwrap();
        assert_eq!(config.scheduler, SchedulerKind::Slurm);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = load_from(Some(missing.clone()), None, dir.path()).unwrap_err();
        assert!(matches!(err, WorkerError::Configuration(msg) if msg.contains("not found")));
        let err = load_from(None, Some(missing.into_os_string()), dir.path()).unwrap_err();
        assert!(matches!(err, WorkerError::Configuration(_)));
    }

    #[test]
    fn invalid_settings_are_configuration_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("worker.toml");
        for content in ["[scheduler]\nname = \"lsf\"\n", "[worker\n", "[worker]\nseparator = \"  \"\n", "colour = 1\n"] {
            fs::write(&path, content).unwrap();
            assert!(
                matches!(load_from(None, None, dir.path()), Err(WorkerError::Configuration(_))),
                "{content}"
            );
        }
    }
}
