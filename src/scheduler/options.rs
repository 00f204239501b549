use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WorkerError};
use crate::scheduler::flags::{Flag, Role, WorkerOption};
use crate::scheduler::Scheduler;

/// A pass-through option and every value it was given in one source, empty for switches
///
/// Repeatable flags such as qsub `-W` keep all their values; a later source replaces the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassThrough {
    pub flag: &'static Flag,
    pub values: Vec<String>,
}

impl PassThrough {
    /// One flag occurrence per value
    pub fn render(&self) -> Vec<String> {
        if self.values.is_empty() {
            return self.flag.render(None);
        }
        self.values.iter().flat_map(|value| self.flag.render(Some(value))).collect()
    }
}

/// Resource specification, one entry per resource dimension
///
/// For PBS this is the content of all `-l key=value,...` lists, for Slurm one entry per resource
/// flag. Keys without a value (resource switches) map to `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceMap(BTreeMap<String, Option<String>>);

impl ResourceMap {
    pub fn insert(&mut self, key: &str, value: Option<&str>) {
        self.0.insert(key.to_string(), value.map(str::to_string));
    }

    pub fn get(&self, key: &str) -> Option<Option<&str>> {
        self.0.get(key).map(|v| v.as_deref())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Union of both maps, `newer` wins per key
    pub fn merge(mut self, newer: ResourceMap) -> ResourceMap {
        self.0.extend(newer.0);
        self
    }
}

/// Options the front end consumes itself
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkerOptions {
    pub data: Vec<PathBuf>,
    pub batch: Option<PathBuf>,
    pub num_cores: Option<u32>,
    pub port: Option<u16>,
    pub dryrun: bool,
    pub dir: Option<PathBuf>,
    pub redo: bool,
}

impl WorkerOptions {
    pub fn num_cores(&self) -> u32 {
        self.num_cores.unwrap_or(1)
    }

    fn apply(&mut self, option: WorkerOption, value: Option<String>) -> Result<()> {
        match (option, value) {
            (WorkerOption::Data, Some(value)) => self.data.push(PathBuf::from(value)),
            (WorkerOption::Batch, Some(value)) => self.batch = Some(PathBuf::from(value)),
            (WorkerOption::Dir, Some(value)) => self.dir = Some(PathBuf::from(value)),
            (WorkerOption::NumCores, Some(value)) => self.num_cores = Some(parse_number("--num_cores", &value)?),
            (WorkerOption::Port, Some(value)) => self.port = Some(parse_number("--port", &value)?),
            (WorkerOption::DryRun, _) => self.dryrun = true,
            (WorkerOption::Redo, _) => self.redo = true,
            (option, None) => {
                return Err(WorkerError::SchedulerOption(format!("{option:?} expects a value")))
            }
        }
        Ok(())
    }

    pub(crate) fn overlay(self, newer: WorkerOptions) -> WorkerOptions {
        WorkerOptions {
            data: if newer.data.is_empty() { self.data } else { newer.data },
            batch: newer.batch.or(self.batch),
            num_cores: newer.num_cores.or(self.num_cores),
            port: newer.port.or(self.port),
            dryrun: newer.dryrun || self.dryrun,
            dir: newer.dir.or(self.dir),
            redo: newer.redo || self.redo,
        }
    }
}

fn parse_number<T: std::str::FromStr>(flag: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| WorkerError::SchedulerOption(format!("'{value}' is not a valid value for {flag}")))
}

/// Canonical options assembled from one or more argument sources
///
/// Built once per invocation and not changed afterwards. Sources are combined with
/// [`OptionSet::overlay`], oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionSet {
    pub name: Option<String>,
    pub array_request: Option<String>,
    pub directive_prefix: Option<String>,
    /// keyed by the flag's canonical spelling
    pub pass_through: BTreeMap<&'static str, PassThrough>,
    pub resources: ResourceMap,
    pub worker: WorkerOptions,
}

impl OptionSet {
    pub(crate) fn apply<S: Scheduler + ?Sized>(
        &mut self,
        scheduler: &S,
        flag: &'static Flag,
        value: Option<String>,
    ) -> Result<()> {
        match flag.role {
            Role::Name => self.name = value,
            Role::Array => self.array_request = value,
            Role::DirectivePrefix => self.directive_prefix = value,
            Role::PassThrough => {
                let pass = self
                    .pass_through
                    .entry(flag.canonical())
                    .or_insert_with(|| PassThrough { flag, values: Vec::new() });
                pass.values.extend(value);
            }
            Role::Resource => scheduler.add_resource(&mut self.resources, flag, value.as_deref())?,
            Role::Worker(option) => self.worker.apply(option, value)?,
        }
        Ok(())
    }

    /// Lay `newer` over this set: its values win wherever both specify an option
    pub fn overlay(self, newer: OptionSet) -> OptionSet {
        let mut pass_through = self.pass_through;
        pass_through.extend(newer.pass_through);
        OptionSet {
            name: newer.name.or(self.name),
            array_request: newer.array_request.or(self.array_request),
            directive_prefix: newer.directive_prefix.or(self.directive_prefix),
            pass_through,
            resources: self.resources.merge(newer.resources),
            worker: self.worker.overlay(newer.worker),
        }
    }

    pub fn directive_prefix_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.directive_prefix.as_deref().unwrap_or(default)
    }
}
