//! Analyse the log a job array leaves behind: which work items succeeded, failed or never finished

pub mod parse;
pub mod stats;

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::report::stats::DurationStats;

/// Everything the log says about one work item
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkItem {
    pub item_id: u64,
    pub client_id: Option<String>,
    pub start_time: Option<NaiveDateTime>,
    /// Seconds between start and done, only when both were logged
    pub duration: Option<f64>,
    pub status: Option<i32>,
}

impl WorkItem {
    fn new(item_id: u64) -> WorkItem {
        WorkItem { item_id, client_id: None, start_time: None, duration: None, status: None }
    }

    fn is_success(&self) -> bool {
        self.status == Some(0)
    }

    fn is_failure(&self) -> bool {
        matches!(self.status, Some(status) if status != 0)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct ClientStats {
    pub successes: usize,
    pub failures: usize,
    pub incompletes: usize,
    pub walltime: Option<DurationStats>,
}

/// Work items seen in a log, keyed by item id
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogReport {
    pub items: BTreeMap<u64, WorkItem>,
}

impl LogReport {
    pub fn successes(&self) -> Vec<u64> {
        self.ids(WorkItem::is_success)
    }

    pub fn failures(&self) -> Vec<u64> {
        self.ids(WorkItem::is_failure)
    }

    /// Items that started but never logged an exit status
    pub fn incompletes(&self) -> Vec<u64> {
        self.ids(|item| item.status.is_none())
    }

    /// Duration distribution over completed items
    pub fn walltime_stats(&self) -> Option<DurationStats> {
        let durations: Vec<f64> = self
            .items
            .values()
            .filter(|item| item.status.is_some())
            .filter_map(|item| item.duration)
            .collect();
        DurationStats::from_durations(&durations)
    }

    /// Counts and duration distribution per client, items without a client grouped as `unknown`
    pub fn client_stats(&self) -> BTreeMap<String, ClientStats> {
        let mut durations: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        let mut clients: BTreeMap<String, ClientStats> = BTreeMap::new();

        for item in self.items.values() {
            let client = item.client_id.clone().unwrap_or_else(|| "unknown".to_string());
            let stats = clients.entry(client.clone()).or_default();
            match item.status {
                Some(0) => stats.successes += 1,
                Some(_) => stats.failures += 1,
                None => stats.incompletes += 1,
            }
            if let (Some(_), Some(duration)) = (item.status, item.duration) {
                durations.entry(client).or_default().push(duration);
            }
        }
        for (client, values) in durations {
            if let Some(stats) = clients.get_mut(&client) {
                stats.walltime = DurationStats::from_durations(&values);
            }
        }
        clients
    }

    fn ids<F: Fn(&WorkItem) -> bool>(&self, predicate: F) -> Vec<u64> {
        self.items.values().filter(|item| predicate(item)).map(|item| item.item_id).collect()
    }
}
