use log::debug;

use crate::error::{Result, WorkerError};
use crate::scheduler::options::OptionSet;
use crate::scheduler::Scheduler;

/// What a recognised flag means to the front end
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Role {
    Name,
    Array,
    DirectivePrefix,
    /// forwarded verbatim to the submission command
    PassThrough,
    /// forwarded, but merged key by key
    Resource,
    Worker(WorkerOption),
}

/// Options consumed by the front end itself and never forwarded to the scheduler
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WorkerOption {
    Data,
    Batch,
    NumCores,
    Port,
    DryRun,
    Dir,
    Redo,
}

/// One flag identity
///
/// All spellings are equivalent. The last spelling is canonical and is the one used when the
/// flag is written back out, so list the long form last.
#[derive(Debug, PartialEq, Eq)]
pub struct Flag {
    pub spellings: &'static [&'static str],
    pub takes_value: bool,
    pub role: Role,
}

impl Flag {
    pub const fn value(spellings: &'static [&'static str], role: Role) -> Flag {
        Flag { spellings, takes_value: true, role }
    }

    pub const fn switch(spellings: &'static [&'static str], role: Role) -> Flag {
        Flag { spellings, takes_value: false, role }
    }

    pub fn canonical(&self) -> &'static str {
        self.spellings[self.spellings.len() - 1]
    }

    pub fn matches(&self, name: &str) -> bool {
        self.spellings.contains(&name)
    }

    pub fn render(&self, value: Option<&str>) -> Vec<String> {
        let name = self.canonical();
        match value {
            None => vec![name.to_string()],
            Some(value) if name.starts_with("--") => vec![format!("{name}={value}")],
            Some(value) => vec![name.to_string(), value.to_string()],
        }
    }
}

pub static WORKER_FLAGS: &[Flag] = &[
    Flag::value(&["--data"], Role::Worker(WorkerOption::Data)),
    Flag::value(&["--batch"], Role::Worker(WorkerOption::Batch)),
    Flag::value(&["--num-cores", "--num_cores"], Role::Worker(WorkerOption::NumCores)),
    Flag::value(&["--port"], Role::Worker(WorkerOption::Port)),
    Flag::switch(&["--dry-run", "--dryrun"], Role::Worker(WorkerOption::DryRun)),
    Flag::value(&["--dir"], Role::Worker(WorkerOption::Dir)),
    Flag::switch(&["--redo"], Role::Worker(WorkerOption::Redo)),
];

/// How to treat tokens outside the known vocabulary
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Strictness {
    /// every token must be classified; used for the user's command line
    Strict,
    /// unknown tokens are skipped; used for script directives and prior submission records
    Lenient,
}

fn lookup(vocabulary: &'static [Flag], name: &str) -> Option<&'static Flag> {
    WORKER_FLAGS.iter().chain(vocabulary.iter()).find(|f| f.matches(name))
}

/// Split a token into a known flag and an attached value, if any
///
/// Accepts `--flag`, `--flag=value`, `-X` and `-Xvalue`.
fn classify(vocabulary: &'static [Flag], token: &str) -> Option<(&'static Flag, Option<String>)> {
    if let Some(long) = token.strip_prefix("--") {
        if long.is_empty() {
            return None;
        }
        return match token.split_once('=') {
            Some((name, value)) => lookup(vocabulary, name).map(|f| (f, Some(value.to_string()))),
            None => lookup(vocabulary, token).map(|f| (f, None)),
        };
    }

    let mut chars = token.char_indices();
    match (chars.next(), chars.next()) {
        (Some((_, '-')), Some((idx, c))) => {
            let split = idx + c.len_utf8();
            let flag = lookup(vocabulary, &token[..split])?;
            let rest = &token[split..];
            if rest.is_empty() {
                Some((flag, None))
            } else if flag.takes_value {
                Some((flag, Some(rest.strip_prefix('=').unwrap_or(rest).to_string())))
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Parse an argument vector into an option set using the scheduler's vocabulary
pub fn parse<S: Scheduler + ?Sized>(scheduler: &S, args: &[String], strictness: Strictness) -> Result<OptionSet> {
    let vocabulary = scheduler.vocabulary();
    let mut options = OptionSet::default();
    let mut i = 0;

    while i < args.len() {
        let token = &args[i];
        i += 1;

        let Some((flag, attached)) = classify(vocabulary, token) else {
            match strictness {
                Strictness::Strict => {
                    return Err(WorkerError::SchedulerOption(format!("unrecognized argument '{token}'")))
                }
                Strictness::Lenient => {
                    debug!("Skipping unrecognized argument '{token}'");
                    continue;
                }
            }
        };

        let value = match (flag.takes_value, attached) {
            (true, Some(value)) => Some(value),
            (true, None) => match args.get(i) {
                Some(next) => {
                    i += 1;
                    Some(next.clone())
                }
                None => {
                    return Err(WorkerError::SchedulerOption(format!("argument '{token}' expects a value")))
                }
            },
            (false, Some(_)) => {
                return Err(WorkerError::SchedulerOption(format!("argument '{token}' takes no value")))
            }
            (false, None) => None,
        };

        options.apply(scheduler, flag, value)?;
    }

    Ok(options)
}
