use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use log::info;

use crate::data::record::{is_identifier, WorkItemRecord};
use crate::data::sniff::sniff_delimiter;
use crate::error::{Result, WorkerError};

/// Delimited table: header row of variable names, one work item per following row
pub struct CsvSource {
    path: PathBuf,
    headers: Vec<String>,
    records: csv::StringRecordsIntoIter<File>,
}

impl CsvSource {
    pub fn open(path: &Path, sniff_length: usize) -> Result<CsvSource> {
        let data_error = |msg: String| WorkerError::DataSource(format!("{}: {}", path.display(), msg));

        let mut file = File::open(path).map_err(|err| data_error(err.to_string()))?;
        let mut sample = Vec::with_capacity(sniff_length);
        (&mut file)
            .take(sniff_length as u64)
            .read_to_end(&mut sample)
            .map_err(|err| data_error(err.to_string()))?;
        let truncated = sample.len() == sniff_length;
        let delimiter = sniff_delimiter(&String::from_utf8_lossy(&sample), truncated)
            .ok_or_else(|| data_error("could not determine delimiter".to_string()))?;
        file.seek(SeekFrom::Start(0)).map_err(|err| data_error(err.to_string()))?;

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .from_reader(file);
        let headers: Vec<String> = reader
            .headers()
            .map_err(|err| data_error(err.to_string()))?
            .iter()
            .map(|header| header.trim().to_string())
            .collect();
        if let Some(invalid) = headers.iter().find(|header| !is_identifier(header)) {
            return Err(data_error(format!("'{invalid}' is not a valid column name")));
        }

        info!("Reading {} as delimited data with columns {:?}", path.display(), headers);
        Ok(CsvSource { path: path.to_path_buf(), headers, records: reader.into_records() })
    }
}

impl Iterator for CsvSource {
    type Item = Result<WorkItemRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.records.next()?;
        Some(
            row.map(|row| {
                let mut record = WorkItemRecord::default();
                for (name, value) in self.headers.iter().zip(row.iter()) {
                    record.insert(name, value);
                }
                record
            })
            .map_err(|err| WorkerError::DataSource(format!("{}: {}", self.path.display(), err))),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn values(source: CsvSource) -> Vec<Vec<(String, String)>> {
        source
            .map(|record| {
                record
                    .unwrap()
                    .iter()
                    .map(|(n, v)| (n.to_string(), v.to_string()))
                    .collect()
            })
            .collect()
    }

    #[test]
    fn rows_become_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        fs::write(&path, "a;b\n1;\"x; y\"\n2;z\n").unwrap();
        let rows = values(CsvSource::open(&path, 1024).unwrap());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec![("a".to_string(), "1".to_string()), ("b".to_string(), "x; y".to_string())]);
        assert_eq!(rows[1][1].1, "z");
    }

    #[test]
    fn invalid_header_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        fs::write(&path, "a,2b\n1,2\n").unwrap();
        let err = CsvSource::open(&path, 1024).err().unwrap();
        assert!(matches!(err, WorkerError::DataSource(msg) if msg.contains("'2b'")));
    }

    #[test]
    fn ragged_row_is_data_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        fs::write(&path, "a,b\n1,2\n3,4\n5,6,7\n").unwrap();
        let mut source = CsvSource::open(&path, 8).unwrap();
        assert!(source.next().unwrap().is_ok());
        assert!(source.next().unwrap().is_ok());
        assert!(matches!(source.next(), Some(Err(WorkerError::DataSource(_)))));
    }
}
