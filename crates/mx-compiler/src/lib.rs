//! MX-Compiler: MemryX Neural Compiler Integration for conversion-block
//!
//! This crate wraps the closed neural compiler that turns an ONNX model into
//! a DFP for the MemryX accelerator. The compiler is reached through its
//! `mx_nc` front end and its results are taken at face value.
//!
//! ## Layer 1 - External Toolchain
//!
//! Focus: building the exact invocation and classifying its failures.

pub mod config;
pub mod error;
pub mod invoke;

pub use config::{
    ChipGeneration, CompilerConfig, CompilerOptions, AUTO_CROP, CHIP_GEN, DEFAULT_EXECUTABLE,
    EXECUTABLE_ENV, NUM_CHIPS, SHOW_OPTIMIZATION,
};
pub use error::CompilerError;
pub use invoke::{
    command_args, dfp_path_for, is_compiler_available, CompileRequest, CompiledArtifact,
    MxNeuralCompiler, NeuralCompiler,
};

/// Result type for compiler operations
pub type Result<T> = std::result::Result<T, CompilerError>;
