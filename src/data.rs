//! Expand data files and array expressions into one record of variables per work item

pub mod csv_source;
pub mod range;
pub mod record;
pub mod single_column;
/// Delimiter detection for delimited data files
pub mod sniff;

use std::path::{Path, PathBuf};

use log::info;

use crate::data::csv_source::CsvSource;
use crate::data::range::RangeSource;
use crate::data::record::WorkItemRecord;
use crate::data::single_column::SingleColumnSource;
use crate::error::{Result, WorkerError};

/// One column-producing input
pub enum DataSource {
    Csv(CsvSource),
    SingleColumn(SingleColumnSource),
    Range(RangeSource),
}

impl DataSource {
    /// Open a data file as a delimited table, or failing that as a single column
    ///
    /// When neither works the delimited-format error is reported, it says more about what is
    /// wrong with the file.
    pub fn open(path: &Path, sniff_length: usize) -> Result<DataSource> {
        match CsvSource::open(path, sniff_length) {
            Ok(source) => Ok(DataSource::Csv(source)),
            Err(csv_error) => match SingleColumnSource::open(path) {
                Ok(source) => Ok(DataSource::SingleColumn(source)),
                Err(_) => Err(csv_error),
            },
        }
    }
}

impl Iterator for DataSource {
    type Item = Result<WorkItemRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            DataSource::Csv(source) => source.next(),
            DataSource::SingleColumn(source) => source.next(),
            DataSource::Range(source) => source.next(),
        }
    }
}

/// Array expression and the variable its values are bound to
pub struct ArraySpec<'a> {
    pub expression: &'a str,
    pub variable: &'a str,
}

/// All data sources of a submission, read in lockstep
///
/// Iteration stops as soon as the shortest source runs out, so every record has a value for every
/// variable. The first error ends iteration.
pub struct DataSources {
    sources: Vec<DataSource>,
    done: bool,
}

impl DataSources {
    pub fn new(paths: &[PathBuf], sniff_length: usize, array: Option<ArraySpec>) -> Result<DataSources> {
        let mut sources = Vec::new();
        for path in paths {
            sources.push(DataSource::open(path, sniff_length)?);
        }
        if let Some(array) = array {
            info!("Binding array expression '{}' to {}", array.expression, array.variable);
            sources.push(DataSource::Range(RangeSource::new(array.variable, array.expression)?));
        }
        if sources.is_empty() {
            return Err(WorkerError::DataSource(
                "no data sources, specify --data files or an array request".to_string(),
            ));
        }
        Ok(DataSources { sources, done: false })
    }
}

impl Iterator for DataSources {
    type Item = Result<WorkItemRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut record = WorkItemRecord::default();
        for source in self.sources.iter_mut() {
            match source.next() {
                Some(Ok(values)) => record.extend(values),
                Some(Err(err)) => {
                    self.done = true;
                    return Some(Err(err));
                }
                None => {
                    self.done = true;
                    return None;
                }
            }
        }
        Some(Ok(record))
    }
}
