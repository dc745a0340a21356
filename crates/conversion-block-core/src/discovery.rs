//! Discovery of compiler side files in the working directory.
//!
//! With auto-crop enabled the compiler may split off the head and tail of a
//! model it cannot map onto the chip and write them next to itself as
//! `<name>_pre.onnx` and `<name>_post.onnx`. It also writes a text log. None
//! of these paths are reported back, so they are found by suffix. More than
//! one candidate for a suffix is refused rather than guessed.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{ConversionError, Result};

/// Suffix of the pre-processing model.
pub const PRE_SUFFIX: &str = "_pre.onnx";

/// Suffix of the post-processing model.
pub const POST_SUFFIX: &str = "_post.onnx";

/// Suffix of the compiler log.
pub const LOG_SUFFIX: &str = ".log";

/// Pre/post models found after compilation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SideModels {
    pub pre: Option<PathBuf>,
    pub post: Option<PathBuf>,
}

/// All regular, non-hidden files directly in `dir` whose name ends with `suffix`, sorted.
pub fn candidates(dir: &Path, suffix: &str) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with('.') || !name.ends_with(suffix) {
            continue;
        }
        if entry.file_type()?.is_file() {
            found.push(entry.path());
        }
    }
    found.sort();
    Ok(found)
}

/// The single file in `dir` ending with `suffix`, if any.
///
/// Returns [`ConversionError::AmbiguousArtifact`] when several match.
pub fn find_unique(dir: &Path, suffix: &str) -> Result<Option<PathBuf>> {
    let mut found = candidates(dir, suffix)?;
    match found.len() {
        0 => Ok(None),
        1 => Ok(found.pop()),
        _ => Err(ConversionError::AmbiguousArtifact {
            pattern: format!("*{suffix}"),
            candidates: found,
        }),
    }
}

/// Look for the compiler's pre/post models in `work_dir`.
pub fn discover_side_models(work_dir: &Path) -> Result<SideModels> {
    let pre = find_unique(work_dir, PRE_SUFFIX)?;
    let post = find_unique(work_dir, POST_SUFFIX)?;
    debug!(
        pre = ?pre.as_ref().map(|p| p.display().to_string()),
        post = ?post.as_ref().map(|p| p.display().to_string()),
        "side model discovery"
    );
    Ok(SideModels { pre, post })
}
