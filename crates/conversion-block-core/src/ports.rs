//! Recovery of DFP port names from the compiler log.
//!
//! The compiler does not report the layer names bound to the DFP's ports; it
//! only prints them. This module parses that text.
//!
//! ## Log format, version 1
//!
//! One record per line, anywhere in the log:
//!
//! ```text
//! MPU <n> input port <n>: {<python dict literal>}
//! MPU <n> output port <n>: {<python dict literal>}
//! ```
//!
//! The dict must contain a string `layer_name` key; other keys are ignored.
//! Records are returned in the order they appear in the log.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::discovery::{find_unique, LOG_SUFFIX};
use crate::error::{ConversionError, Result};

/// Version of the log format understood by [`parse_port_names`].
pub const PORT_FORMAT_VERSION: u32 = 1;

const INPUT_PORT_PATTERN: &str = r"MPU \d+ input port \d+: (\{.*\})";
const OUTPUT_PORT_PATTERN: &str = r"MPU \d+ output port \d+: (\{.*\})";

/// DFP port layer names, per direction, in log order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PortNames {
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PortRecord {
    layer_name: String,
}

fn patterns() -> &'static (Regex, Regex) {
    static PATTERNS: OnceLock<(Regex, Regex)> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        (
            Regex::new(INPUT_PORT_PATTERN).expect("input port pattern is valid"),
            Regex::new(OUTPUT_PORT_PATTERN).expect("output port pattern is valid"),
        )
    })
}

/// Extract port names from compiler log text.
pub fn parse_port_names(log: &str) -> Result<PortNames> {
    let (input_re, output_re) = patterns();
    let inputs = collect_layer_names(input_re, log)?;
    let outputs = collect_layer_names(output_re, log)?;

    if inputs.is_empty() || outputs.is_empty() {
        return Err(ConversionError::MissingPortInfo {
            inputs: inputs.len(),
            outputs: outputs.len(),
        });
    }

    Ok(PortNames { inputs, outputs })
}

fn collect_layer_names(re: &Regex, log: &str) -> Result<Vec<String>> {
    re.captures_iter(log)
        .map(|caps| {
            let fragment = &caps[1];
            let json = py_literal_to_json(fragment);
            serde_json::from_str::<PortRecord>(&json)
                .map(|record| record.layer_name)
                .map_err(|e| ConversionError::PortSchemaMismatch {
                    line: caps[0].to_string(),
                    reason: e.to_string(),
                })
        })
        .collect()
}

/// Rewrite a Python literal (dict/list/tuple of str, numbers, bools, None) as JSON.
///
/// Single-quoted strings become double-quoted, `True`/`False`/`None` become
/// `true`/`false`/`null`, tuples become arrays, and trailing commas are
/// dropped. Anything else is passed through for the JSON parser to reject.
pub fn py_literal_to_json(literal: &str) -> String {
    let mut out = String::with_capacity(literal.len());
    let mut chars = literal.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' => {
                out.push('"');
                while let Some(s) = chars.next() {
                    match s {
                        '\\' => match chars.next() {
                            Some('\'') => out.push('\''),
                            Some(escaped) => {
                                out.push('\\');
                                out.push(escaped);
                            }
                            None => out.push('\\'),
                        },
                        '"' if c == '\'' => out.push_str("\\\""),
                        s if s == c => break,
                        s => out.push(s),
                    }
                }
                out.push('"');
            }
            '(' => out.push('['),
            ')' | ']' | '}' => {
                let trimmed = out.trim_end().strip_suffix(',').map(str::len);
                if let Some(len) = trimmed {
                    out.truncate(len);
                }
                out.push(if c == ')' { ']' } else { c });
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut word = String::from(c);
                while let Some(&n) = chars.peek() {
                    if n.is_ascii_alphanumeric() || n == '_' {
                        word.push(n);
                        chars.next();
                    } else {
                        break;
                    }
                }
                out.push_str(match word.as_str() {
                    "True" => "true",
                    "False" => "false",
                    "None" => "null",
                    other => other,
                });
            }
            c => out.push(c),
        }
    }
    out
}

/// The single compiler log in `work_dir`.
pub fn find_log_file(work_dir: &Path) -> Result<PathBuf> {
    find_unique(work_dir, LOG_SUFFIX)?
        .ok_or_else(|| ConversionError::MissingLogFile(work_dir.to_path_buf()))
}

/// Locate the compiler log in `work_dir` and extract its port names.
pub fn read_port_names(work_dir: &Path) -> Result<(PathBuf, PortNames)> {
    let log_path = find_log_file(work_dir)?;
    let text = std::fs::read_to_string(&log_path)?;
    debug!(log = %log_path.display(), contents = %text, "compiler log");

    let names = parse_port_names(&text)?;
    info!(
        log = %log_path.display(),
        inputs = names.inputs.len(),
        outputs = names.outputs.len(),
        "recovered DFP ports"
    );
    Ok((log_path, names))
}
