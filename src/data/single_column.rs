use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

use log::info;

use crate::data::record::{is_identifier, WorkItemRecord};
use crate::error::{Result, WorkerError};

/// Single column file: the first line names the variable, every following line is one value
pub struct SingleColumnSource {
    path: PathBuf,
    name: String,
    lines: Lines<BufReader<File>>,
}

impl SingleColumnSource {
    pub fn open(path: &Path) -> Result<SingleColumnSource> {
        let data_error = |msg: String| WorkerError::DataSource(format!("{}: {}", path.display(), msg));

        let file = File::open(path).map_err(|err| data_error(err.to_string()))?;
        let mut lines = BufReader::new(file).lines();
        let name = match lines.next() {
            Some(line) => line.map_err(|err| data_error(err.to_string()))?.trim().to_string(),
            None => String::new(),
        };
        if !is_identifier(&name) {
            return Err(data_error(format!("'{name}' is not a valid column name")));
        }

        info!("Reading {} as a single column of '{}'", path.display(), name);
        Ok(SingleColumnSource { path: path.to_path_buf(), name, lines })
    }
}

impl Iterator for SingleColumnSource {
    type Item = Result<WorkItemRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let line = self.lines.next()?;
        Some(
            line.map(|value| {
                let mut record = WorkItemRecord::default();
                record.insert(&self.name, value.trim_end());
                record
            })
            .map_err(|err| WorkerError::DataSource(format!("{}: {}", self.path.display(), err))),
        )
    }
}
