//! conversion-block Core Library
//!
//! Turns an ONNX model into a DFP bundle for the MemryX chain runtime:
//! compiles it with the external neural compiler, recovers the DFP's port
//! names from the compiler log, builds `chain.json` and zips everything up.
//!
//! ## Layer 2 - Conversion
//!
//! Focus: faithful bookkeeping around a compiler that reports very little.

pub mod chain;
pub mod digest;
pub mod discovery;
pub mod error;
pub mod obs;
pub mod onnx;
pub mod package;
pub mod pipeline;
pub mod ports;
pub mod run_log;
pub mod telemetry;

pub use chain::{build_chain, chain_to_json, BundleNames, ChainReport, ChainStage, RuntimeArgs};
pub use digest::Digest;
pub use discovery::{discover_side_models, find_unique, SideModels, LOG_SUFFIX, POST_SUFFIX, PRE_SUFFIX};
pub use error::{ConversionError, Result, MISSING_LOG_DIAGNOSTIC, MISSING_PORTS_DIAGNOSTIC};
pub use obs::{
    emit_conversion_failed, emit_conversion_finished, emit_conversion_started,
    emit_step_completed, RunSpan,
};
pub use onnx::{read_io_info, read_optional_io_info, DataType, IoInfo, TensorDescriptor};
pub use package::{
    archive_path_for, stage_artifacts, write_bundle, write_chain_file, BundleEntry, BundleStamp,
    StagedArtifacts, CHAIN_FILE_NAME,
};
pub use pipeline::{convert, start_fields, ConversionReport, ConversionRequest};
pub use ports::{find_log_file, parse_port_names, read_port_names, PortNames, PORT_FORMAT_VERSION};
pub use run_log::{fields, LogEntry, RunLog};
pub use telemetry::{init_tracing, json_requested, LOG_FORMAT_ENV};

pub use mx_compiler::{
    CompileRequest, CompiledArtifact, CompilerConfig, CompilerError, CompilerOptions,
    MxNeuralCompiler, NeuralCompiler,
};
