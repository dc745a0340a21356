//! Error taxonomy for the conversion pipeline.

use std::path::PathBuf;

use mx_compiler::CompilerError;

/// Diagnostic printed when no compiler log is found.
pub const MISSING_LOG_DIAGNOSTIC: &str = "Couldn't find the logs file.";

/// Diagnostic printed when the compiler log lacks port records.
pub const MISSING_PORTS_DIAGNOSTIC: &str = "Couldn't find the input and output ports in the logs.";

/// Conversion errors.
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("failed to load ONNX model {path}: {reason}")]
    ModelLoad { path: PathBuf, reason: String },

    #[error("compilation failed: {0}")]
    Compilation(#[from] CompilerError),

    #[error("no compiler log (*.log) found in {0}")]
    MissingLogFile(PathBuf),

    #[error("compiler log declares {inputs} input port(s) and {outputs} output port(s)")]
    MissingPortInfo { inputs: usize, outputs: usize },

    #[error("port record does not match the expected format ({reason}): {line}")]
    PortSchemaMismatch { line: String, reason: String },

    #[error("more than one file matches {pattern}: {candidates:?}")]
    AmbiguousArtifact {
        pattern: String,
        candidates: Vec<PathBuf>,
    },

    #[error("invalid model path: {0}")]
    InvalidModelPath(PathBuf),

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConversionError {
    /// The stdout diagnostic for conditions that end the process with an
    /// explicit exit instead of an error report.
    pub fn exit_diagnostic(&self) -> Option<&'static str> {
        match self {
            ConversionError::MissingLogFile(_) => Some(MISSING_LOG_DIAGNOSTIC),
            ConversionError::MissingPortInfo { .. } => Some(MISSING_PORTS_DIAGNOSTIC),
            _ => None,
        }
    }
}

/// Result type for conversion operations.
pub type Result<T> = std::result::Result<T, ConversionError>;
