use std::iter::Flatten;
use std::ops::RangeInclusive;
use std::sync::OnceLock;
use std::vec::IntoIter;

use regex::Regex;

use crate::data::record::{is_identifier, WorkItemRecord};
use crate::error::{Result, WorkerError};

/// Values of an array expression such as `1-10,15,20-22`, in written order
///
/// A sub-range `a-b` with `a > b` contributes no values.
pub struct RangeSource {
    name: String,
    values: Flatten<IntoIter<RangeInclusive<u64>>>,
}

impl RangeSource {
    pub fn new(name: &str, expression: &str) -> Result<RangeSource> {
        static EXPRESSION: OnceLock<Regex> = OnceLock::new();
        let pattern = EXPRESSION.get_or_init(|| Regex::new(r"^\d+(?:-\d+)?(?:,\d+(?:-\d+)?)*$").unwrap());

        let invalid = || WorkerError::DataSource(format!("'{expression}' is not a valid array expression"));
        if !pattern.is_match(expression) {
            return Err(invalid());
        }
        if !is_identifier(name) {
            return Err(WorkerError::DataSource(format!("'{name}' is not a valid variable name")));
        }

        let mut ranges = Vec::new();
        for part in expression.split(',') {
            let (start, end) = part.split_once('-').unwrap_or((part, part));
            let start: u64 = start.parse().map_err(|_| invalid())?;
            let end: u64 = end.parse().map_err(|_| invalid())?;
            ranges.push(start..=end);
        }

        Ok(RangeSource { name: name.to_string(), values: ranges.into_iter().flatten() })
    }
}

impl Iterator for RangeSource {
    type Item = Result<WorkItemRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let value = self.values.next()?;
        let mut record = WorkItemRecord::default();
        record.insert(&self.name, &value.to_string());
        Some(Ok(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(expression: &str) -> Vec<String> {
        RangeSource::new("x", expression)
            .unwrap()
            .map(|record| record.unwrap().get("x").unwrap().to_string())
            .collect()
    }

    #[test]
    fn single_value() {
        assert_eq!(values("9"), vec!["9"]);
    }

    #[test]
    fn list_and_ranges_keep_written_order() {
        assert_eq!(values("9,10,14"), vec!["9", "10", "14"]);
        assert_eq!(values("9-12"), vec!["9", "10", "11", "12"]);
        assert_eq!(values("5,9-11"), vec!["5", "9", "10", "11"]);
        assert_eq!(values("9-11,5,6"), vec!["9", "10", "11", "5", "6"]);
        assert_eq!(values("1-2,1-2"), vec!["1", "2", "1", "2"]);
    }

    #[test]
    fn descending_range_is_empty() {
        assert_eq!(values("5-3"), Vec::<String>::new());
        assert_eq!(values("5-3,7"), vec!["7"]);
    }

    #[test]
    fn invalid_expressions_are_rejected() {
        for expression in ["5+9", "", "1-", "-3", "1,,2", "1-2-3", "a", "1, 2", "99999999999999999999999"] {
            assert!(
                matches!(RangeSource::new("x", expression), Err(WorkerError::DataSource(_))),
                "{expression}"
            );
        }
    }

    #[test]
    fn variable_name_is_checked() {
        assert!(matches!(RangeSource::new("1x", "1-3"), Err(WorkerError::DataSource(_))));
    }
}
