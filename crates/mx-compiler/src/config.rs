//! Compiler options and executable selection

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Number of accelerator chips the model is mapped onto
pub const NUM_CHIPS: u32 = 4;

/// Chip generation targeted by the compiler
pub const CHIP_GEN: ChipGeneration = ChipGeneration::Mx3;

/// Let the compiler crop unsupported head/tail operators into pre/post models
pub const AUTO_CROP: bool = true;

/// Print the compiler's optimization report
pub const SHOW_OPTIMIZATION: bool = false;

/// Default compiler front end, looked up on `PATH`
pub const DEFAULT_EXECUTABLE: &str = "mx_nc";

/// Environment variable overriding [`DEFAULT_EXECUTABLE`]
pub const EXECUTABLE_ENV: &str = "MX_NC_PATH";

/// Accelerator chip generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChipGeneration {
    Mx3,
}

impl ChipGeneration {
    /// Identifier understood by the compiler
    pub fn as_str(&self) -> &'static str {
        match self {
            ChipGeneration::Mx3 => "mx3",
        }
    }
}

impl fmt::Display for ChipGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four scalar options handed to every compilation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerOptions {
    pub num_chips: u32,
    pub chip_gen: ChipGeneration,
    pub autocrop: bool,
    pub show_optimization: bool,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        CompilerOptions {
            num_chips: NUM_CHIPS,
            chip_gen: CHIP_GEN,
            autocrop: AUTO_CROP,
            show_optimization: SHOW_OPTIMIZATION,
        }
    }
}

/// Compiler configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerConfig {
    /// Executable to spawn
    pub executable: PathBuf,
    /// Options passed on the command line
    pub options: CompilerOptions,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        CompilerConfig {
            executable: std::env::var_os(EXECUTABLE_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_EXECUTABLE)),
            options: CompilerOptions::default(),
        }
    }
}

impl CompilerConfig {
    /// Create a new config from environment variables
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Use a specific executable
    pub fn with_executable(mut self, executable: impl Into<PathBuf>) -> Self {
        self.executable = executable.into();
        self
    }
}
