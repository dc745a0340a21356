//! Compiler invocation
//!
//! The neural compiler is a closed toolchain. It is driven through its
//! command-line front end and treated as a black box: model in, DFP out,
//! plus whatever side files it decides to drop into its working directory
//! (a text log and, with auto-crop, `*_pre.onnx` / `*_post.onnx`).

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info, warn};

use crate::config::{CompilerConfig, CompilerOptions};
use crate::error::CompilerError;
use crate::Result;

/// Lines of compiler stderr kept in [`CompilerError::CompilationFailed`]
const STDERR_TAIL_LINES: usize = 20;

/// A single compilation job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileRequest {
    /// ONNX model to compile
    pub model_path: PathBuf,
    /// Where the compiled DFP must be written
    pub dfp_path: PathBuf,
    /// Working directory of the compiler; side files land here
    pub work_dir: PathBuf,
}

/// Output of a successful compilation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledArtifact {
    /// Path of the compiled DFP
    pub dfp_path: PathBuf,
}

/// Something that turns an ONNX model into a DFP
pub trait NeuralCompiler {
    /// Options this compiler was configured with, for run logs.
    fn options(&self) -> &CompilerOptions;

    /// Compile `request.model_path` into `request.dfp_path`.
    ///
    /// Failures are terminal; callers must not retry.
    fn compile(&self, request: &CompileRequest) -> Result<CompiledArtifact>;
}

/// Build the compiler command line for `request`.
pub fn command_args(options: &CompilerOptions, request: &CompileRequest) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "--models".into(),
        request.model_path.clone().into_os_string(),
        "--dfp_fname".into(),
        request.dfp_path.clone().into_os_string(),
        "--num_chips".into(),
        options.num_chips.to_string().into(),
        "--chip_gen".into(),
        options.chip_gen.as_str().into(),
    ];
    if options.autocrop {
        args.push("--autocrop".into());
    }
    if options.show_optimization {
        args.push("--show_optimization".into());
    }
    args
}

/// Neural compiler driven through the `mx_nc` command-line front end
#[derive(Debug, Clone)]
pub struct MxNeuralCompiler {
    config: CompilerConfig,
}

impl MxNeuralCompiler {
    pub fn new(config: CompilerConfig) -> Self {
        MxNeuralCompiler { config }
    }

    /// Create a compiler configured from the environment
    pub fn from_env() -> Self {
        Self::new(CompilerConfig::from_env())
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }
}

impl NeuralCompiler for MxNeuralCompiler {
    fn options(&self) -> &CompilerOptions {
        &self.config.options
    }

    fn compile(&self, request: &CompileRequest) -> Result<CompiledArtifact> {
        // The child runs in `work_dir`, so relative paths would resolve against it.
        let request = CompileRequest {
            model_path: std::path::absolute(&request.model_path)?,
            dfp_path: std::path::absolute(&request.dfp_path)?,
            work_dir: request.work_dir.clone(),
        };
        let args = command_args(&self.config.options, &request);
        info!(
            executable = %self.config.executable.display(),
            model = %request.model_path.display(),
            dfp = %request.dfp_path.display(),
            "Running neural compiler"
        );
        debug!(?args, "compiler arguments");

        let output = Command::new(&self.config.executable)
            .args(&args)
            .current_dir(&request.work_dir)
            .output()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => CompilerError::CompilerNotFound(
                    self.config.executable.display().to_string(),
                ),
                _ => CompilerError::Io(e),
            })?;

        if !output.status.success() {
            let stderr = stderr_tail(&output.stderr, STDERR_TAIL_LINES);
            warn!(status = %output.status, "neural compiler failed");
            return Err(CompilerError::CompilationFailed {
                status: output.status.to_string(),
                stderr,
            });
        }

        if !request.dfp_path.is_file() {
            return Err(CompilerError::ArtifactMissing(request.dfp_path));
        }

        Ok(CompiledArtifact {
            dfp_path: request.dfp_path,
        })
    }
}

/// Check if the configured compiler can be started
pub fn is_compiler_available(config: &CompilerConfig) -> bool {
    Command::new(&config.executable)
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn stderr_tail(stderr: &[u8], lines: usize) -> String {
    let text = String::from_utf8_lossy(stderr);
    let all: Vec<&str> = text.lines().collect();
    let start = all.len().saturating_sub(lines);
    all[start..].join("\n")
}

/// Resolve where the compiled DFP for `model_path` goes inside `staging_dir`.
///
/// The DFP keeps the model's file stem: `net.onnx` compiles to `<staging>/net.dfp`.
pub fn dfp_path_for(model_path: &Path, staging_dir: &Path) -> Option<PathBuf> {
    let stem = model_path.file_stem()?;
    let mut name = stem.to_os_string();
    name.push(".dfp");
    Some(staging_dir.join(name))
}
