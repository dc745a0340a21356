//! conversion_block - ONNX to DFP bundle converter
//!
//! Compiles an ONNX model with the MemryX neural compiler and writes
//! `<output-dir>/<model>.zip` containing the DFP, any pre/post models split
//! off by the compiler, and the `chain.json` descriptor. A JSON run log is
//! left next to it as `<output-dir>/logs.json`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use conversion_block_core::{
    convert, init_tracing, json_requested, start_fields, ConversionRequest, RunLog,
};
use mx_compiler::MxNeuralCompiler;
use serde_json::json;
use tracing::{info, Level};

/// Name of the run log written to the output directory.
const RUN_LOG_FILE: &str = "logs.json";

#[derive(Parser)]
#[command(name = "conversion_block")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Convert an ONNX model into a DFP bundle", long_about = None)]
struct Cli {
    /// Path to the ONNX model to convert
    #[arg(long)]
    onnx_path: PathBuf,

    /// Directory receiving the bundle and logs.json
    #[arg(long)]
    output_dir: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(json_requested(), Level::INFO);

    std::fs::create_dir_all(&cli.output_dir).with_context(|| {
        format!(
            "Failed to create output directory {}",
            cli.output_dir.display()
        )
    })?;

    let mut log = RunLog::new();
    log.add_message_with(
        "Converting ONNX to DFP",
        start_fields(&cli.onnx_path, &cli.output_dir),
    );

    let compiler = MxNeuralCompiler::from_env();
    let request = ConversionRequest::new(&cli.onnx_path, &cli.output_dir)?;
    let log_path = cli.output_dir.join(RUN_LOG_FILE);

    match convert(&request, &compiler, &mut log) {
        Ok(report) => {
            log.add_message_with(
                "Conversion complete",
                json!({ "Output Directory": cli.output_dir.display().to_string() }),
            );
            save_run_log(&log, &log_path)?;
            info!(archive = %report.archive_path.display(), "conversion complete");

            println!("Conversion complete. Logs saved as JSON file.");
            println!("{log}");
            println!("Exiting...");
            Ok(())
        }
        Err(err) => {
            log.add_message_with("Conversion failed", json!({ "Error": err.to_string() }));
            if let Err(save_err) = save_run_log(&log, &log_path) {
                tracing::warn!(error = %save_err, "could not save run log");
            }

            if let Some(diagnostic) = err.exit_diagnostic() {
                println!("{diagnostic}");
                std::process::exit(1);
            }
            Err(err).with_context(|| format!("Failed to convert {}", cli.onnx_path.display()))
        }
    }
}

fn save_run_log(log: &RunLog, path: &Path) -> Result<()> {
    log.save_as_json(path)
        .with_context(|| format!("Failed to write run log {}", path.display()))
}
