use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use chrono::NaiveDateTime;
use log::{debug, info};
use regex::{Captures, Regex};

use crate::error::{Result, WorkerError};
use crate::report::{LogReport, WorkItem};

const DATE: &str = r"(?P<date>\d{4}-\d{2}-\d{2})";
const TIME: &str = r"(?P<time>\d{2}:\d{2}:\d{2}\.\d+)";
const LEVEL: &str = r"\[(?P<log_level>\w+)\]";
const WORKITEM: &str = r"workitem\s+(?P<workitem_id>\d+)";

/// Parser for the start/done lines work items leave in the job log
///
/// Both grammars share a `<date> <time> [<level>] :` prefix:
/// - `workitem <id> started : <client>`
/// - `workitem <id> done : <exit status>`
pub struct LogParser {
    started: Regex,
    done: Regex,
    suspect: Regex,
}

impl LogParser {
    pub fn new() -> LogParser {
        let prefix = format!(r"^{DATE}\s+{TIME}\s+{LEVEL}\s*:");
        let started = format!(r"{prefix}\s+{WORKITEM}\s+started\s*:\s*(?P<client_id>[\w\-]+)");
        let done = format!(r"{prefix}\s+{WORKITEM}\s+done\s*:\s*(?P<exit_status>-?\d+)");
        let suspect = format!(r"{prefix}\s+workitem\b");
        LogParser {
            started: Regex::new(&started).unwrap(),
            done: Regex::new(&done).unwrap(),
            suspect: Regex::new(&suspect).unwrap(),
        }
    }

    /// Parse the log at `path`, `None` when no work item ever started or finished
    pub fn parse(&self, path: &Path) -> Result<Option<LogReport>> {
        info!("Parsing log {}", path.display());
        let file = File::open(path)
            .map_err(|err| WorkerError::LogFile(format!("can't open {}: {}", path.display(), err)))?;
        self.parse_reader(BufReader::new(file)).map_err(|err| match err {
            WorkerError::LogParse(msg) => WorkerError::LogParse(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }

    pub fn parse_reader<R: BufRead>(&self, reader: R) -> Result<Option<LogReport>> {
        let mut items: BTreeMap<u64, WorkItem> = BTreeMap::new();

        for (line_nr, line) in reader.lines().enumerate() {
            let line = line.map_err(|err| WorkerError::LogFile(err.to_string()))?;
            let line_error = |msg: &str| WorkerError::LogParse(format!("line {}: {}", line_nr + 1, msg));

            if let Some(captures) = self.started.captures(&line) {
                let id = item_id(&captures).ok_or_else(|| line_error("work item id out of range"))?;
                let start = timestamp(&captures).ok_or_else(|| line_error("invalid timestamp"))?;
                let item = items.entry(id).or_insert_with(|| WorkItem::new(id));
                item.client_id = Some(captures["client_id"].to_string());
                item.start_time = Some(start);
            } else if let Some(captures) = self.done.captures(&line) {
                let id = item_id(&captures).ok_or_else(|| line_error("work item id out of range"))?;
                let end = timestamp(&captures).ok_or_else(|| line_error("invalid timestamp"))?;
                let status: i32 = captures["exit_status"]
                    .parse()
                    .map_err(|_| line_error("exit status out of range"))?;
                let item = items.entry(id).or_insert_with(|| WorkItem::new(id));
                item.status = Some(status);
                item.duration = item
                    .start_time
                    .map(|start| (end - start).num_milliseconds() as f64 / 1000.0);
            } else if self.suspect.is_match(&line) {
                return Err(line_error(&format!("malformed work item line '{line}'")));
            } else {
                debug!("Ignoring log line {}", line_nr + 1);
            }
        }

        match items.is_empty() {
            true => Ok(None),
            false => Ok(Some(LogReport { items })),
        }
    }
}

impl Default for LogParser {
    fn default() -> Self {
        LogParser::new()
    }
}

fn item_id(captures: &Captures) -> Option<u64> {
    captures["workitem_id"].parse().ok()
}

fn timestamp(captures: &Captures) -> Option<NaiveDateTime> {
    let text = format!("{} {}", &captures["date"], &captures["time"]);
    NaiveDateTime::parse_from_str(&text, "%Y-%m-%d %H:%M:%S%.f").ok()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    static LOG: &str = "\
2024-03-01 10:00:00.000000 [info] : server started
2024-03-01 10:00:01.000000 [info] : workitem 1 started : r1i0n3
2024-03-01 10:00:01.500000 [info] : workitem 2 started : r1i0n4
2024-03-01 10:00:11.000000 [info] : workitem 1 done : 0
2024-03-01 10:00:03.500000 [info] : workitem 2 done : 3
2024-03-01 10:00:12.000000 [info] : workitem 3 started : r1i0n3
2024-03-01 10:00:13.000000 [info] : workitem 4 done : 0
";

    fn parse(text: &str) -> Result<Option<LogReport>> {
        LogParser::new().parse_reader(text.as_bytes())
    }

    #[test]
    fn items_are_classified() {
        let report = parse(LOG).unwrap().unwrap();
        assert_eq!(report.successes(), vec![1, 4]);
        assert_eq!(report.failures(), vec![2]);
        assert_eq!(report.incompletes(), vec![3]);

        let item = &report.items[&1];
        assert_eq!(item.client_id.as_deref(), Some("r1i0n3"));
        assert_eq!(item.duration, Some(10.0));
        assert_eq!(report.items[&2].duration, Some(2.0));
        assert_eq!(report.items[&4].duration, None);
    }

    #[test]
    fn classes_are_disjoint_and_complete() {
        let report = parse(LOG).unwrap().unwrap();
        let successes: BTreeSet<u64> = report.successes().into_iter().collect();
        let failures: BTreeSet<u64> = report.failures().into_iter().collect();
        let incompletes: BTreeSet<u64> = report.incompletes().into_iter().collect();
        assert!(successes.is_disjoint(&failures));
        assert!(successes.is_disjoint(&incompletes));
        assert!(failures.is_disjoint(&incompletes));
        let all: BTreeSet<u64> = successes.union(&failures).chain(incompletes.iter()).copied().collect();
        assert_eq!(all, [1, 2, 3, 4].into_iter().collect());
    }

    #[test]
    fn failed_and_incomplete_scenario() {
        let log = "\
2024-03-01 10:00:00.0 [info] : workitem 9 started : c1
2024-03-01 10:00:05.0 [info] : workitem 9 done : 1
2024-03-01 10:00:06.0 [info] : workitem 10 started : c1
";
        let report = parse(log).unwrap().unwrap();
        assert_eq!(report.failures(), vec![9]);
        assert_eq!(report.incompletes(), vec![10]);
        assert!(report.successes().is_empty());
    }

    #[test]
    fn log_without_work_items_is_no_report() {
        assert!(parse("").unwrap().is_none());
        assert!(parse("2024-03-01 10:00:00.0 [info] : server started\n").unwrap().is_none());
    }

    #[test]
    fn malformed_work_item_line_is_parse_error() {
        let log = "2024-03-01 10:00:00.0 [info] : workitem 9 finished : 0\n";
        assert!(matches!(parse(log), Err(WorkerError::LogParse(msg)) if msg.starts_with("line 1")));
        let log = "2024-13-01 10:00:00.0 [info] : workitem 9 done : 0\n";
        assert!(matches!(parse(log), Err(WorkerError::LogParse(_))));
    }

    #[test]
    fn missing_log_is_log_file_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = LogParser::new().parse(&dir.path().join("server.log")).unwrap_err();
        assert!(matches!(err, WorkerError::LogFile(_)));
    }

    #[test]
    fn nanosecond_timestamps_parse() {
        let log = "\
2024-03-01 10:00:00.123456789 [info] : workitem 1 started : node-1
2024-03-01 10:00:01.623456789 [info] : workitem 1 done : 0
";
        let report = parse(log).unwrap().unwrap();
        assert_eq!(report.items[&1].duration, Some(1.5));
    }
}
