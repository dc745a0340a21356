//! The conversion pipeline: ONNX in, bundle out.
//!
//! Steps run strictly in order and the first failure ends the run. The
//! [`RunLog`] is owned by the caller, who decides when to persist it.

use std::path::{Path, PathBuf};
use std::time::Instant;

use mx_compiler::{dfp_path_for, CompileRequest, NeuralCompiler};
use serde_json::{json, Value};

use crate::chain::{build_chain, chain_to_json, ChainStage};
use crate::discovery::{discover_side_models, SideModels};
use crate::error::{ConversionError, Result};
use crate::obs::{
    emit_conversion_failed, emit_conversion_finished, emit_conversion_started,
    emit_step_completed, RunSpan,
};
use crate::onnx::{read_io_info, read_optional_io_info};
use crate::package::{
    archive_path_for, stage_artifacts, write_bundle, write_chain_file, BundleEntry, BundleStamp,
};
use crate::ports::read_port_names;
use crate::run_log::{fields, RunLog};

/// Inputs of one conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    /// ONNX model to convert.
    pub onnx_path: PathBuf,
    /// Directory receiving `<basename>.zip`.
    pub output_dir: PathBuf,
    /// Compiler working directory, searched for its side files.
    pub work_dir: PathBuf,
    /// Directory for the compiled DFP and renamed copies.
    pub staging_dir: PathBuf,
}

impl ConversionRequest {
    /// Request using the process working directory and the system temp directory.
    pub fn new(onnx_path: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            onnx_path: onnx_path.into(),
            output_dir: output_dir.into(),
            work_dir: std::env::current_dir()?,
            staging_dir: std::env::temp_dir(),
        })
    }
}

/// What a successful conversion produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionReport {
    pub archive_path: PathBuf,
    pub stamp: BundleStamp,
    pub side_models: SideModels,
    pub stages: Vec<ChainStage>,
    pub entries: Vec<BundleEntry>,
    pub unresolved_inputs: Vec<String>,
    pub unresolved_outputs: Vec<String>,
}

/// Convert `request.onnx_path` into a bundle, recording progress in `log`.
pub fn convert(
    request: &ConversionRequest,
    compiler: &dyn NeuralCompiler,
    log: &mut RunLog,
) -> Result<ConversionReport> {
    let span = RunSpan::enter();
    let started = Instant::now();
    emit_conversion_started(span.run_id(), &request.onnx_path, &request.output_dir);

    match run_steps(request, compiler, log, span.run_id()) {
        Ok(report) => {
            emit_conversion_finished(
                span.run_id(),
                &report.archive_path,
                started.elapsed().as_millis() as u64,
                report.stages.len(),
            );
            Ok(report)
        }
        Err(err) => {
            emit_conversion_failed(span.run_id(), &err);
            Err(err)
        }
    }
}

fn run_steps(
    request: &ConversionRequest,
    compiler: &dyn NeuralCompiler,
    log: &mut RunLog,
    run_id: &str,
) -> Result<ConversionReport> {
    let onnx_path = request.onnx_path.as_path();
    let archive_path = archive_path_for(&request.output_dir, onnx_path)?;
    let dfp_target = dfp_path_for(onnx_path, &request.staging_dir)
        .ok_or_else(|| ConversionError::InvalidModelPath(onnx_path.to_path_buf()))?;

    let original_io = read_io_info(onnx_path)?;
    emit_step_completed(run_id, "inspect_model");

    let options = compiler.options();
    log.add_message_with(
        "Compilation configuration",
        json!({
            "Number of Chips": options.num_chips,
            "Chip Generation": options.chip_gen.as_str(),
            "Auto Crop": options.autocrop,
        }),
    );
    let artifact = compiler.compile(&CompileRequest {
        model_path: onnx_path.to_path_buf(),
        dfp_path: dfp_target,
        work_dir: request.work_dir.clone(),
    })?;
    log.add_message("Compilation successful");
    emit_step_completed(run_id, "compile");

    let side_models = discover_side_models(&request.work_dir)?;
    log.add_data(fields([
        ("Found pre file", side_models.pre.is_some()),
        ("Found post file", side_models.post.is_some()),
    ]));

    let (log_file, ports) = read_port_names(&request.work_dir)?;
    log.add_message_with(
        "DFP ports recovered",
        json!({
            "Log File": log_file.display().to_string(),
            "Inputs": ports.inputs,
            "Outputs": ports.outputs,
        }),
    );
    emit_step_completed(run_id, "recover_ports");

    let stamp = BundleStamp::now();
    let staged = stage_artifacts(
        stamp,
        &request.staging_dir,
        side_models.pre.as_deref(),
        &artifact.dfp_path,
        side_models.post.as_deref(),
    )?;

    let pre_io = read_optional_io_info(side_models.pre.as_deref())?;
    let post_io = read_optional_io_info(side_models.post.as_deref())?;
    let chain = build_chain(
        &original_io,
        &pre_io,
        &post_io,
        &ports,
        &staged.bundle_names(),
    );
    if chain.has_unresolved() {
        log.add_message_with(
            "Unresolved ports",
            json!({
                "Inputs": chain.unresolved_inputs,
                "Outputs": chain.unresolved_outputs,
            }),
        );
    }
    let chain_path = write_chain_file(stamp, &request.staging_dir, &chain_to_json(&chain.stages)?)?;
    emit_step_completed(run_id, "build_chain");

    std::fs::create_dir_all(&request.output_dir)?;
    let entries = write_bundle(&archive_path, &staged.bundle_entries(&chain_path))?;
    log.add_message_with(
        "Bundle written",
        json!({
            "Archive": archive_path.display().to_string(),
            "Timestamp": stamp.to_string(),
            "Entries": entries,
        }),
    );
    emit_step_completed(run_id, "package");

    Ok(ConversionReport {
        archive_path,
        stamp,
        side_models,
        stages: chain.stages,
        entries,
        unresolved_inputs: chain.unresolved_inputs,
        unresolved_outputs: chain.unresolved_outputs,
    })
}

/// Run-log data recorded at the start of a conversion.
pub fn start_fields(onnx_path: &Path, output_dir: &Path) -> Value {
    json!({
        "ONNX Path": onnx_path.display().to_string(),
        "Output Directory": output_dir.display().to_string(),
    })
}
