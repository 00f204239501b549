use serde::Serialize;

/// Summary of a set of work item durations, in seconds
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DurationStats {
    pub count: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    pub mean: f64,
    pub total: f64,
}

impl DurationStats {
    /// `None` when there is nothing to summarise
    pub fn from_durations(durations: &[f64]) -> Option<DurationStats> {
        if durations.is_empty() {
            return None;
        }
        let mut sorted = durations.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let total: f64 = sorted.iter().sum();

        Some(DurationStats {
            count: sorted.len(),
            min: sorted[0],
            q1: quantile(&sorted, 0.25),
            median: quantile(&sorted, 0.5),
            q3: quantile(&sorted, 0.75),
            max: sorted[sorted.len() - 1],
            mean: total / sorted.len() as f64,
            total,
        })
    }
}

/// Linear interpolation between the closest ranks of sorted, non-empty data
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    sorted[lower] + (sorted[upper] - sorted[lower]) * (pos - lower as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quartiles_interpolate() {
        let stats = DurationStats::from_durations(&[4.0, 1.0, 3.0, 2.0]).unwrap();
        assert_eq!(stats.count, 4);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.q1, 1.75);
        assert_eq!(stats.median, 2.5);
        assert_eq!(stats.q3, 3.25);
        assert_eq!(stats.max, 4.0);
        assert_eq!(stats.mean, 2.5);
        assert_eq!(stats.total, 10.0);
    }

    #[test]
    fn single_value_and_empty() {
        let stats = DurationStats::from_durations(&[7.5]).unwrap();
        assert_eq!((stats.min, stats.median, stats.max), (7.5, 7.5, 7.5));
        assert_eq!(DurationStats::from_durations(&[]), None);
    }
}
