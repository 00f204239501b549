use std::collections::BTreeMap;
use std::fmt::Write;
use std::path::PathBuf;

use serde::Serialize;

use crate::error::{Result, WorkerError};
use crate::job::JobDirectory;
use crate::report::parse::LogParser;
use crate::report::stats::DurationStats;
use crate::report::{ClientStats, LogReport, WorkItem};

static SEP: &str = "------------------------------------------------------------------------";

/// Which parts of a summary to print
#[derive(Debug, Default, Clone)]
pub struct SummaryOptions {
    pub show_failed: bool,
    pub show_incomplete: bool,
    pub show_walltime: bool,
    pub show_clients: bool,
    pub show_raw: bool,
    pub json: bool,
}

/// Where the log is: given directly, or inside a job directory
pub enum LogLocation {
    File(PathBuf),
    JobDirectory(PathBuf),
}

#[derive(Serialize)]
struct Summary<'a> {
    successes: usize,
    failures: usize,
    incompletes: usize,
    failed_ids: Vec<u64>,
    incomplete_ids: Vec<u64>,
    walltime: Option<DurationStats>,
    clients: BTreeMap<String, ClientStats>,
    items: Vec<&'a WorkItem>,
}

/// `worker summarize`
pub fn run(location: LogLocation, options: &SummaryOptions) -> Result<()> {
    let path = match location {
        LogLocation::File(path) => path,
        LogLocation::JobDirectory(dir) => JobDirectory::existing(&dir)?.log(),
    };
    let text = match LogParser::new().parse(&path)? {
        Some(report) => render(&report, options)?,
        None => "no work done\n".to_string(),
    };
    print!("{text}");
    Ok(())
}

pub fn render(report: &LogReport, options: &SummaryOptions) -> Result<String> {
    if options.json {
        let summary = Summary {
            successes: report.successes().len(),
            failures: report.failures().len(),
            incompletes: report.incompletes().len(),
            failed_ids: report.failures(),
            incomplete_ids: report.incompletes(),
            walltime: report.walltime_stats(),
            clients: report.client_stats(),
            items: report.items.values().collect(),
        };
        let json = serde_json::to_string_pretty(&summary).map_err(|err| WorkerError::Io(err.to_string()))?;
        return Ok(format!("{json}\n"));
    }

    let mut out = String::new();
    render_text(&mut out, report, options).map_err(|err| WorkerError::Io(err.to_string()))?;
    Ok(out)
}

fn render_text(out: &mut String, report: &LogReport, options: &SummaryOptions) -> std::fmt::Result {
    let failures = report.failures();
    let incompletes = report.incompletes();
    writeln!(out, "{} work items", report.items.len())?;
    writeln!(out, "  succeeded:  {}", report.successes().len())?;
    writeln!(out, "  failed:     {}", failures.len())?;
    writeln!(out, "  incomplete: {}", incompletes.len())?;

    if options.show_failed {
        writeln!(out, "{SEP}")?;
        writeln!(out, "failed: {}", join_ids(&failures))?;
    }
    if options.show_incomplete {
        writeln!(out, "{SEP}")?;
        writeln!(out, "incomplete: {}", join_ids(&incompletes))?;
    }
    if options.show_walltime {
        writeln!(out, "{SEP}")?;
        match report.walltime_stats() {
            Some(stats) => write_stats(out, "walltime", &stats)?,
            None => writeln!(out, "walltime: no completed work items")?,
        }
    }
    if options.show_clients {
        writeln!(out, "{SEP}")?;
        for (client, stats) in report.client_stats() {
            writeln!(
                out,
                "{client}: {} succeeded, {} failed, {} incomplete",
                stats.successes, stats.failures, stats.incompletes
            )?;
            if let Some(walltime) = &stats.walltime {
                write_stats(out, "  walltime", walltime)?;
            }
        }
    }
    if options.show_raw {
        writeln!(out, "{SEP}")?;
        writeln!(out, "{:>8} {:<16} {:<26} {:>12} {:>6}", "item", "client", "start", "duration (s)", "status")?;
        for item in report.items.values() {
            writeln!(
                out,
                "{:>8} {:<16} {:<26} {:>12} {:>6}",
                item.item_id,
                item.client_id.as_deref().unwrap_or("-"),
                item.start_time.map(|t| t.format("%Y-%m-%d %H:%M:%S%.3f").to_string()).unwrap_or_else(|| "-".to_string()),
                item.duration.map(|d| format!("{d:.3}")).unwrap_or_else(|| "-".to_string()),
                item.status.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string()),
            )?;
        }
    }
    Ok(())
}

fn write_stats(out: &mut String, label: &str, stats: &DurationStats) -> std::fmt::Result {
    writeln!(
        out,
        "{label}: count {}, min {:.3} s, q1 {:.3} s, median {:.3} s, q3 {:.3} s, max {:.3} s, mean {:.3} s, total {:.3} s",
        stats.count, stats.min, stats.q1, stats.median, stats.q3, stats.max, stats.mean, stats.total
    )
}

fn join_ids(ids: &[u64]) -> String {
    ids.iter().map(u64::to_string).collect::<Vec<_>>().join(",")
}
