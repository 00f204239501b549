//! Package work items into a work file, and cut a work file down to selected items
//!
//! A work file is a sequence of blocks separated by a separator line. Each block holds one item's
//! variables as `export` statements, a blank line, then the payload script. Items are numbered
//! from 1 in file order.

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use log::{debug, info};

use crate::data::record::WorkItemRecord;
use crate::error::{Result, WorkerError};

/// Write one block per record and return the number of blocks
pub fn build<I>(path: &Path, records: I, script: &str, separator: &str) -> Result<usize>
where
    I: IntoIterator<Item = Result<WorkItemRecord>>,
{
    info!("Writing work file {}", path.display());
    let file = File::create(path).map_err(|err| WorkerError::io(path, err))?;
    let mut out = BufWriter::new(file);
    let mut count = 0;

    for record in records {
        let block = render_block(&record?, script);
        if count > 0 {
            writeln!(out, "{separator}").map_err(|err| WorkerError::io(path, err))?;
        }
        out.write_all(block.as_bytes()).map_err(|err| WorkerError::io(path, err))?;
        count += 1;
    }
    out.flush().map_err(|err| WorkerError::io(path, err))?;

    info!("Work file has {count} work items");
    Ok(count)
}

/// Split a work file into its blocks, in file order
///
/// A line is a separator when, trimmed, it equals `separator` exactly.
pub fn read_blocks(path: &Path, separator: &str) -> Result<Vec<String>> {
    let content = fs::read_to_string(path).map_err(|err| WorkerError::io(path, err))?;
    let mut blocks = Vec::new();
    let mut block = String::new();
    for line in content.split_inclusive('\n') {
        if line.trim() == separator {
            blocks.push(std::mem::take(&mut block));
        } else {
            block.push_str(line);
        }
    }
    if !content.is_empty() {
        blocks.push(block);
    }
    Ok(blocks)
}

/// Copy the blocks whose 1-based index is in `keep` to `output` and return how many were kept
///
/// Order is preserved and nothing is renumbered, separators only go between kept blocks.
pub fn filter(input: &Path, output: &Path, separator: &str, keep: &BTreeSet<usize>) -> Result<usize> {
    info!("Filtering {} into {}", input.display(), output.display());
    let blocks = read_blocks(input, separator)?;
    let file = File::create(output).map_err(|err| WorkerError::io(output, err))?;
    let mut out = BufWriter::new(file);
    let mut count = 0;

    for (idx, block) in blocks.iter().enumerate() {
        if !keep.contains(&(idx + 1)) {
            continue;
        }
        debug!("Keeping work item {}", idx + 1);
        if count > 0 {
            writeln!(out, "{separator}").map_err(|err| WorkerError::io(output, err))?;
        }
        out.write_all(block.as_bytes()).map_err(|err| WorkerError::io(output, err))?;
        if !block.ends_with('\n') && keep.iter().any(|&i| i > idx + 1 && i <= blocks.len()) {
            writeln!(out).map_err(|err| WorkerError::io(output, err))?;
        }
        count += 1;
    }
    out.flush().map_err(|err| WorkerError::io(output, err))?;

    Ok(count)
}

fn render_block(record: &WorkItemRecord, script: &str) -> String {
    let mut block = String::new();
    for (name, value) in record.iter() {
        block.push_str(&format!("export {}={}\n", name, single_quote(value)));
    }
    block.push('\n');
    block.push_str(script);
    if !block.ends_with('\n') {
        block.push('\n');
    }
    block
}

fn single_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
