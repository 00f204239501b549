//! Split a job script into shebang, scheduler directives and payload

use std::fs;
use std::path::Path;

use log::info;

use crate::error::{Result, WorkerError};

/// A job script taken apart
///
/// Directives are only recognised at the top of the script: the first line that is not a
/// directive, a comment or blank starts the payload, and everything after it is payload too.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedScript {
    pub shebang: Option<String>,
    /// directive lines exactly as written, for re-emission
    pub directives: String,
    /// directive tokens with the prefix and comments removed
    pub args: Vec<String>,
    pub payload: String,
}

/// Read and parse the job script at `path`
pub fn parse(path: &Path, directive_prefix: &str) -> Result<ParsedScript> {
    info!("Parsing job script {} with directive prefix '{}'", path.display(), directive_prefix);
    let content = fs::read_to_string(path)
        .map_err(|err| WorkerError::BatchFile(format!("can't read job script {}: {}", path.display(), err)))?;
    parse_str(&content, directive_prefix).map_err(|err| match err {
        WorkerError::BatchFile(msg) => WorkerError::BatchFile(format!("{}: {}", path.display(), msg)),
        other => other,
    })
}

pub fn parse_str(content: &str, directive_prefix: &str) -> Result<ParsedScript> {
    let mut script = ParsedScript::default();
    let mut scanning = true;

    for (line_nr, line) in content.split_inclusive('\n').enumerate() {
        if line_nr == 0 && line.starts_with("#!") {
            script.shebang = Some(line.trim().to_string());
        } else if scanning && line.starts_with(directive_prefix) {
            let tokens = split_directive(&line[directive_prefix.len()..])
                .map_err(|err| WorkerError::BatchFile(format!("line {}: {}", line_nr + 1, err)))?;
            script.args.extend(tokens);
            script.directives.push_str(line);
            if !line.ends_with('\n') {
                script.directives.push('\n');
            }
        } else if scanning && (line.starts_with('#') || line.trim().is_empty()) {
            continue;
        } else {
            scanning = false;
            script.payload.push_str(line);
        }
    }

    Ok(script)
}

/// Shell-split the text after a directive prefix, dropping a trailing `#` comment
fn split_directive(text: &str) -> std::result::Result<Vec<String>, shell_words::ParseError> {
    shell_words::split(strip_comment(text))
}

/// Cut `text` at the first `#` that starts a word outside of quotes
fn strip_comment(text: &str) -> &str {
    let mut in_single = false;
    let mut in_double = false;
    let mut escaped = false;
    let mut word_start = true;

    for (idx, ch) in text.char_indices() {
        if escaped {
            escaped = false;
            word_start = false;
            continue;
        }
        match ch {
            '\\' if !in_single => escaped = true,
            '\'' if !in_double => in_single = !in_single,
            '"' if !in_single => in_double = !in_double,
            '#' if word_start && !in_single && !in_double => return &text[..idx],
            _ => {}
        }
        word_start = ch.is_whitespace() && !in_single && !in_double;
    }
    text
}
