//! Error types for mx-compiler

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while driving the neural compiler
#[derive(Error, Debug)]
pub enum CompilerError {
    /// Compiler executable not found
    #[error("neural compiler `{0}` is not installed or not in PATH")]
    CompilerNotFound(String),

    /// Compiler ran and reported a failure
    #[error("neural compiler failed with {status}: {stderr}")]
    CompilationFailed {
        /// Exit status as reported by the OS
        status: String,
        /// Tail of the captured stderr
        stderr: String,
    },

    /// Compiler exited successfully but produced no artifact
    #[error("neural compiler reported success but wrote no DFP at {0}")]
    ArtifactMissing(PathBuf),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compilation_failed_display() {
        let err = CompilerError::CompilationFailed {
            status: "exit status: 2".to_string(),
            stderr: "unsupported operator: Einsum".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("exit status: 2"));
        assert!(msg.contains("Einsum"));
    }

    #[test]
    fn test_artifact_missing_display() {
        let err = CompilerError::ArtifactMissing(PathBuf::from("/tmp/net.dfp"));
        assert!(err.to_string().contains("/tmp/net.dfp"));
    }
}
