//! Slurm `sbatch`

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Result, WorkerError};
use crate::scheduler::flags::{Flag, Role};
use crate::scheduler::{Scheduler, SchedulerKind};

const NAME: Flag = Flag::value(&["-J", "--job-name"], Role::Name);
const ARRAY: Flag = Flag::value(&["-a", "--array"], Role::Array);

static VOCABULARY: &[Flag] = &[
    NAME,
    ARRAY,
    // pass-through options
    Flag::value(&["-A", "--account"], Role::PassThrough),
    Flag::value(&["-b", "--begin"], Role::PassThrough),
    Flag::value(&["-D", "--chdir"], Role::PassThrough),
    Flag::value(&["-C", "--constraint"], Role::PassThrough),
    Flag::value(&["-L", "--licenses"], Role::PassThrough),
    Flag::value(&["-M", "--cluster", "--clusters"], Role::PassThrough),
    Flag::value(&["--comment"], Role::PassThrough),
    Flag::value(&["-d", "--dependency"], Role::PassThrough),
    Flag::value(&["-m", "--distribution"], Role::PassThrough),
    Flag::value(&["-e", "--error"], Role::PassThrough),
    Flag::value(&["--mail-type"], Role::PassThrough),
    Flag::value(&["--mail-user"], Role::PassThrough),
    Flag::value(&["--network"], Role::PassThrough),
    Flag::value(&["--nice"], Role::PassThrough),
    Flag::value(&["--open-mode"], Role::PassThrough),
    Flag::value(&["-o", "--output"], Role::PassThrough),
    Flag::value(&["-p", "--partition"], Role::PassThrough),
    Flag::value(&["--prefer"], Role::PassThrough),
    Flag::value(&["--priority"], Role::PassThrough),
    Flag::value(&["-q", "--qos"], Role::PassThrough),
    Flag::value(&["--reservation"], Role::PassThrough),
    Flag::value(&["-t", "--time"], Role::PassThrough),
    Flag::value(&["--time-min"], Role::PassThrough),
    Flag::value(&["--tmp"], Role::PassThrough),
    Flag::value(&["--wait-all-nodes"], Role::PassThrough),
    // pass-through switches
    Flag::switch(&["-H", "--hold"], Role::PassThrough),
    Flag::switch(&["--ignore-pbs"], Role::PassThrough),
    Flag::switch(&["-k", "--no-kill"], Role::PassThrough),
    Flag::switch(&["--no-requeue"], Role::PassThrough),
    Flag::switch(&["--parsable"], Role::PassThrough),
    Flag::switch(&["-Q", "--quiet"], Role::PassThrough),
    Flag::switch(&["--reboot"], Role::PassThrough),
    Flag::switch(&["--requeue"], Role::PassThrough),
    Flag::switch(&["--test-only"], Role::PassThrough),
    Flag::switch(&["--use-min-nodes"], Role::PassThrough),
    Flag::switch(&["-v", "--verbose"], Role::PassThrough),
    Flag::switch(&["-W", "--wait"], Role::PassThrough),
    // resources
    Flag::value(&["-c", "--cpus-per-task"], Role::Resource),
    Flag::value(&["--gpu-bind"], Role::Resource),
    Flag::value(&["-G", "--gpus"], Role::Resource),
    Flag::value(&["--gpus-per-socket"], Role::Resource),
    Flag::value(&["--gpus-per-node"], Role::Resource),
    Flag::value(&["--gpus-per-task"], Role::Resource),
    Flag::value(&["--hint"], Role::Resource),
    Flag::value(&["--mem"], Role::Resource),
    Flag::value(&["--mem-bind"], Role::Resource),
    Flag::value(&["--mem-per-cpu"], Role::Resource),
    Flag::value(&["--mem-per-gpu"], Role::Resource),
    Flag::value(&["-N", "--nodes"], Role::Resource),
    Flag::value(&["-n", "--ntasks"], Role::Resource),
    Flag::value(&["--ntasks-per-core"], Role::Resource),
    Flag::value(&["--ntasks-per-gpu"], Role::Resource),
    Flag::value(&["--ntasks-per-node"], Role::Resource),
    Flag::value(&["--ntasks-per-socket"], Role::Resource),
    Flag::value(&["--propagate"], Role::Resource),
    Flag::value(&["--sockets-per-node"], Role::Resource),
    Flag::value(&["--threads-per-core"], Role::Resource),
    Flag::switch(&["--contiguous"], Role::Resource),
    Flag::switch(&["-O", "--overcommit"], Role::Resource),
    Flag::switch(&["-s", "--oversubscribe"], Role::Resource),
    Flag::switch(&["--spread-job"], Role::Resource),
];

pub struct Slurm;

impl Scheduler for Slurm {
    fn kind(&self) -> SchedulerKind {
        SchedulerKind::Slurm
    }

    fn vocabulary(&self) -> &'static [Flag] {
        VOCABULARY
    }

    fn name_flag(&self) -> &'static Flag {
        &NAME
    }

    fn array_flag(&self) -> &'static Flag {
        &ARRAY
    }

    fn default_directive_prefix(&self) -> &'static str {
        "#SBATCH"
    }

    fn default_submit_command(&self) -> &'static str {
        "sbatch"
    }

    fn default_array_var(&self) -> &'static str {
        "SLURM_ARRAY_TASK_ID"
    }

    fn default_job_id_var(&self) -> &'static str {
        "SLURM_ARRAY_JOB_ID"
    }

    fn job_template(&self) -> &'static str {
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/templates/slurm.txt"))
    }

    /// Accepts both the default sbatch message and `--parsable` output (`id[;cluster]`)
    fn parse_job_id(&self, stdout: &str) -> Result<String> {
        if let Some(captures) = submitted_pattern().captures(stdout) {
            return Ok(captures["job_id"].to_string());
        }
        stdout
            .lines()
            .find_map(|line| parsable_pattern().captures(line.trim()))
            .map(|captures| captures["job_id"].to_string())
            .ok_or_else(|| WorkerError::Submission(format!("can not parse submission output \"{}\"", stdout.trim())))
    }
}

fn submitted_pattern() -> &'static Regex {
    static EXPRESSION: OnceLock<Regex> = OnceLock::new();
    EXPRESSION.get_or_init(|| Regex::new(r"Submitted batch job (?P<job_id>\d+)(?: on cluster \w+)?").unwrap())
}

fn parsable_pattern() -> &'static Regex {
    static EXPRESSION: OnceLock<Regex> = OnceLock::new();
    EXPRESSION.get_or_init(|| Regex::new(r"^(?P<job_id>\d+)(?:;\S+)?$").unwrap())
}
