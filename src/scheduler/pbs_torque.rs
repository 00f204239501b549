//! PBS Torque `qsub`

use crate::error::{Result, WorkerError};
use crate::scheduler::flags::{Flag, Role};
use crate::scheduler::options::ResourceMap;
use crate::scheduler::{Scheduler, SchedulerKind};

const NAME: Flag = Flag::value(&["-N"], Role::Name);
const ARRAY: Flag = Flag::value(&["-t"], Role::Array);
const RESOURCES: Flag = Flag::value(&["-l"], Role::Resource);

static VOCABULARY: &[Flag] = &[
    NAME,
    ARRAY,
    RESOURCES,
    Flag::value(&["-C"], Role::DirectivePrefix),
    Flag::value(&["-A"], Role::PassThrough),
    Flag::value(&["-d"], Role::PassThrough),
    Flag::value(&["-e"], Role::PassThrough),
    Flag::value(&["-j"], Role::PassThrough),
    Flag::value(&["-m"], Role::PassThrough),
    Flag::value(&["-M"], Role::PassThrough),
    Flag::value(&["-o"], Role::PassThrough),
    Flag::value(&["-q"], Role::PassThrough),
    Flag::value(&["-S"], Role::PassThrough),
    Flag::value(&["-W"], Role::PassThrough),
    Flag::value(&["-w"], Role::PassThrough),
    Flag::switch(&["-h"], Role::PassThrough),
    Flag::switch(&["-n"], Role::PassThrough),
    Flag::switch(&["-V"], Role::PassThrough),
];

pub struct PbsTorque;

impl Scheduler for PbsTorque {
    fn kind(&self) -> SchedulerKind {
        SchedulerKind::PbsTorque
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
        "#PBS"
    }

    fn default_submit_command(&self) -> &'static str {
        "qsub"
    }

    fn default_array_var(&self) -> &'static str {
        "PBS_ARRAYID"
    }

    fn default_job_id_var(&self) -> &'static str {
        "PBS_JOBID"
    }

    fn job_template(&self) -> &'static str {
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/templates/pbs_torque.txt"))
    }

    /// qsub prints the job id on its own line
    fn parse_job_id(&self, stdout: &str) -> Result<String> {
        stdout
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string)
            .ok_or_else(|| WorkerError::Submission("qsub printed no job id".to_string()))
    }

    /// `-l` values are comma-joined `key=value` lists; every entry is its own resource
    fn add_resource(&self, resources: &mut ResourceMap, flag: &Flag, value: Option<&str>) -> Result<()> {
        let Some(list) = value else {
            return Err(WorkerError::SchedulerOption(format!("{} expects a resource list", flag.canonical())));
        };
        for item in list.split(',').map(str::trim).filter(|item| !item.is_empty()) {
            match item.split_once('=') {
                Some((key, _)) if key.trim().is_empty() => {
                    return Err(WorkerError::SchedulerOption(format!("malformed resource '{item}' in '{list}'")));
                }
                Some((key, value)) => resources.insert(key.trim(), Some(value.trim())),
                None => resources.insert(item, None),
            }
        }
        Ok(())
    }

    fn resource_args(&self, resources: &ResourceMap) -> Vec<String> {
        if resources.is_empty() {
            return Vec::new();
        }
        let list = resources
            .iter()
            .map(|(key, value)| match value {
                Some(value) => format!("{key}={value}"),
                None => key.to_string(),
            })
            .collect::<Vec<String>>()
            .join(",");
        vec![RESOURCES.canonical().to_string(), list]
    }
}
