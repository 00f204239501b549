//! Describe each resource manager's flag syntax and merge option sets with it

/// Flag vocabulary and command-line token parsing
pub mod flags;
/// Canonical option set and the overlay rules between option sources
pub mod options;
pub mod pbs_torque;
pub mod slurm;

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::scheduler::flags::{Flag, Role, Strictness};
use crate::scheduler::options::{OptionSet, ResourceMap};

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerKind {
    PbsTorque,
    Slurm,
}

impl fmt::Display for SchedulerKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SchedulerKind::PbsTorque => write!(f, "pbs_torque"),
            SchedulerKind::Slurm => write!(f, "slurm"),
        }
    }
}

impl SchedulerKind {
    pub fn scheduler(self) -> &'static dyn Scheduler {
        match self {
            SchedulerKind::PbsTorque => &pbs_torque::PbsTorque,
            SchedulerKind::Slurm => &slurm::Slurm,
        }
    }
}

/// Capabilities of one resource manager
///
/// Implementations only describe syntax: which flags exist, which of them carry resources, and
/// how resources are written back out. Parsing and merging are shared.
pub trait Scheduler {
    fn kind(&self) -> SchedulerKind;

    /// Every flag this scheduler's submission command understands that the front end tracks
    fn vocabulary(&self) -> &'static [Flag];

    fn name_flag(&self) -> &'static Flag;

    fn array_flag(&self) -> &'static Flag;

    fn default_directive_prefix(&self) -> &'static str;

    fn default_submit_command(&self) -> &'static str;

    /// Environment variable holding the array task index inside a running job
    fn default_array_var(&self) -> &'static str;

    fn default_job_id_var(&self) -> &'static str;

    /// Built-in job script template
    fn job_template(&self) -> &'static str;

    /// Pull the job id out of the submission command's standard output
    fn parse_job_id(&self, stdout: &str) -> Result<String>;

    fn pass_through_flags(&self) -> Vec<&'static Flag> {
        self.vocabulary().iter().filter(|f| f.role == Role::PassThrough).collect()
    }

    /// Flag that changes the directive prefix, if the submission command has one
    fn directive_prefix_flag(&self) -> Option<&'static Flag> {
        self.vocabulary().iter().find(|f| f.role == Role::DirectivePrefix)
    }

    fn resource_flags(&self) -> Vec<&'static Flag> {
        self.vocabulary().iter().filter(|f| f.role == Role::Resource).collect()
    }

    /// Fold one occurrence of a resource flag into the resource map, keyed by flag
    fn add_resource(&self, resources: &mut ResourceMap, flag: &Flag, value: Option<&str>) -> Result<()> {
        resources.insert(flag.canonical(), value);
        Ok(())
    }

    /// Serialise resources back into submission arguments
    fn resource_args(&self, resources: &ResourceMap) -> Vec<String> {
        let mut args = Vec::new();
        for (key, value) in resources.iter() {
            match self.vocabulary().iter().find(|f| f.canonical() == key) {
                Some(flag) => args.extend(flag.render(value)),
                None => args.push(key.to_string()),
            }
        }
        args
    }

    fn parse_args(&self, args: &[String], strictness: Strictness) -> Result<OptionSet> {
        flags::parse(self, args, strictness)
    }

    /// Overlay `new_args` on `old_args`
    ///
    /// Scalars and switches from `new_args` replace those from `old_args`; resources are merged
    /// key by key so dimensions only named in `old_args` survive.
    fn merge_options(&self, new_args: &[String], old_args: &[String]) -> Result<OptionSet> {
        let old = self.parse_args(old_args, Strictness::Lenient)?;
        let new = self.parse_args(new_args, Strictness::Lenient)?;
        Ok(old.overlay(new))
    }

    /// Arguments handed to the submission command for a job array of `item_count` tasks
    ///
    /// A custom directive prefix goes first, so the submission command reads the same directives.
    fn submission_args(&self, options: &OptionSet, item_count: usize) -> Vec<String> {
        let mut args = Vec::new();
        if let (Some(flag), Some(prefix)) = (self.directive_prefix_flag(), &options.directive_prefix) {
            args.extend(flag.render(Some(prefix)));
        }
        for pass in options.pass_through.values() {
            args.extend(pass.render());
        }
        args.extend(self.resource_args(&options.resources));
        if let Some(name) = &options.name {
            args.extend(self.name_flag().render(Some(name)));
        }
        args.extend(self.array_flag().render(Some(&format!("1-{item_count}"))));
        args
    }
}
