use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};
use env_logger::Env;
use log::info;

use crate::error::Result;
use crate::workflow::summarize::{LogLocation, SummaryOptions};

mod config;
mod data;
mod error;
mod job;
mod merge;
mod report;
mod scheduler;
mod script;
mod workfile;
mod workflow;

/// Run many small tasks as one job array on a batch scheduler
#[derive(Parser, Debug)]
#[command(name = "worker", version)]
struct Cli {
    /// Settings file, defaults to $WORKER_CONFIG or ./worker.toml
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log progress to stderr
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Submit a job array, one task per work item
    ///
    /// Takes the scheduler's own submission flags plus --batch, --data, --num_cores, --port and
    /// --dryrun.
    #[command(disable_help_flag = true)]
    Submit(PassThroughArgs),
    /// Resubmit the work items of a previous job that did not complete
    ///
    /// Takes --dir plus any submission flag to override, and --redo to also rerun failed items.
    #[command(disable_help_flag = true)]
    Resubmit(PassThroughArgs),
    /// Summarise the log of a job
    Summarize(SummarizeArgs),
}

/// Everything after the subcommand goes to the option parser, so `-h` can mean hold
#[derive(Args, Debug)]
struct PassThroughArgs {
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "ARGS")]
    args: Vec<String>,
}

#[derive(Args, Debug)]
struct SummarizeArgs {
    /// Log file to analyse
    #[arg(long, value_name = "PATH", required_unless_present = "dir", conflicts_with = "dir")]
    log: Option<PathBuf>,

    /// Job directory whose server.log to analyse
    #[arg(long, value_name = "PATH")]
    dir: Option<PathBuf>,

    /// Every section below except the raw table
    #[arg(long, alias = "show_all")]
    show_all: bool,

    /// List the ids of failed work items
    #[arg(long, alias = "show_failed")]
    show_failed: bool,

    /// List the ids of work items that never finished
    #[arg(long, alias = "show_incomplete")]
    show_incomplete: bool,

    /// Walltime statistics over completed work items
    #[arg(long, aliases = ["show_walltime", "show-walltime-stats", "show_walltime_stats"])]
    show_walltime: bool,

    /// Counts and walltime statistics per client
    #[arg(long, aliases = ["show_clients", "show-client-stats", "show_client_stats"])]
    show_clients: bool,

    /// One line per work item
    #[arg(long, alias = "show_raw")]
    show_raw: bool,

    /// Print the whole summary as JSON
    #[arg(
        long,
        conflicts_with_all = ["show_all", "show_failed", "show_incomplete", "show_walltime", "show_clients", "show_raw"]
    )]
    json: bool,
}

impl SummarizeArgs {
    fn summary_options(&self) -> SummaryOptions {
        SummaryOptions {
            show_failed: self.show_all || self.show_failed,
            show_incomplete: self.show_all || self.show_incomplete,
            show_walltime: self.show_all || self.show_walltime,
            show_clients: self.show_all || self.show_clients,
            show_raw: self.show_raw,
            json: self.json,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let default_filter = if cli.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();
    info!("worker {} starting up", env!("CARGO_PKG_VERSION"));

    if let Err(err) = run(cli) {
        eprintln!("worker: {err}");
        process::exit(err.exit_code());
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Submit(submit) => {
            let config = config::load(cli.config)?;
            workflow::submit::run(&config, &submit.args)
        }
        Commands::Resubmit(resubmit) => {
            let config = config::load(cli.config)?;
            workflow::resubmit::run(&config, &resubmit.args)
        }
        Commands::Summarize(args) => {
            let options = args.summary_options();
            let location = match (args.log, args.dir) {
                (Some(log), _) => LogLocation::File(log),
                (None, Some(dir)) => LogLocation::JobDirectory(dir),
                (None, None) => unreachable!("clap requires --log or --dir"),
            };
            workflow::summarize::run(location, &options)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summarize(args: &[&str]) -> std::result::Result<SummarizeArgs, clap::Error> {
        let argv = ["worker", "summarize", "--log", "server.log"].iter().chain(args).copied();
        match Cli::try_parse_from(argv)?.command {
            Commands::Summarize(args) => Ok(args),
            other => panic!("parsed as {other:?}"),
        }
    }

    #[test]
    fn show_all_turns_on_every_section_but_raw() {
        for flag in ["--show-all", "--show_all"] {
            let options = summarize(&[flag]).unwrap().summary_options();
            assert!(options.show_failed && options.show_incomplete && options.show_walltime && options.show_clients);
            assert!(!options.show_raw && !options.json);
        }
    }

    #[test]
    fn underscore_spellings_are_accepted() {
        let options = summarize(&["--show_failed", "--show_walltime_stats", "--show_client_stats", "--show_raw"])
            .unwrap()
            .summary_options();
        assert!(options.show_failed && options.show_walltime && options.show_clients && options.show_raw);
        assert!(!options.show_incomplete);

        let options = summarize(&["--show-walltime-stats", "--show_incomplete"]).unwrap().summary_options();
        assert!(options.show_walltime && options.show_incomplete);
    }

    #[test]
    fn json_excludes_sections() {
        assert!(summarize(&["--json"]).unwrap().summary_options().json);
        assert!(summarize(&["--json", "--show_all"]).is_err());
    }
}
