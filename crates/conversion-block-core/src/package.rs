//! Bundle packaging.
//!
//! Every file that goes into a bundle is first copied into the staging
//! directory under a name derived from one [`BundleStamp`]:
//!
//! ```text
//! <staging>/<stamp>_pre.onnx    (if the compiler split off a pre model)
//! <staging>/<stamp>.dfp
//! <staging>/<stamp>_post.onnx   (if the compiler split off a post model)
//! <staging>/<stamp>_chain.json
//! ```
//!
//! and then zipped into `<output-dir>/<model-basename>.zip` with the chain
//! stored as `chain.json`. Sharing one stamp keeps the files of a run
//! together and keeps sequential runs from overwriting each other's staged
//! files.

use std::fmt;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::chain::BundleNames;
use crate::digest::Digest;
use crate::error::{ConversionError, Result};

/// Name of the descriptor inside the bundle.
pub const CHAIN_FILE_NAME: &str = "chain.json";

/// Nanosecond timestamp shared by all renamed files of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct BundleStamp(pub u128);

impl BundleStamp {
    pub fn now() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        Self(nanos)
    }

    pub fn pre_name(&self) -> String {
        format!("{}_pre.onnx", self.0)
    }

    pub fn dfp_name(&self) -> String {
        format!("{}.dfp", self.0)
    }

    pub fn post_name(&self) -> String {
        format!("{}_post.onnx", self.0)
    }

    pub fn chain_name(&self) -> String {
        format!("{}_chain.json", self.0)
    }
}

impl fmt::Display for BundleStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Renamed copies of the run's models in the staging directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedArtifacts {
    pub pre: Option<PathBuf>,
    pub dfp: PathBuf,
    pub post: Option<PathBuf>,
}

impl StagedArtifacts {
    /// File names as referenced from `chain.json`.
    pub fn bundle_names(&self) -> BundleNames {
        BundleNames {
            pre: self.pre.as_deref().map(file_name),
            dfp: file_name(&self.dfp),
            post: self.post.as_deref().map(file_name),
        }
    }

    /// Archive entries in bundle order: pre, post, DFP, then the chain.
    pub fn bundle_entries(&self, chain_path: &Path) -> Vec<(String, PathBuf)> {
        let mut entries = Vec::with_capacity(4);
        if let Some(pre) = &self.pre {
            entries.push((file_name(pre), pre.clone()));
        }
        if let Some(post) = &self.post {
            entries.push((file_name(post), post.clone()));
        }
        entries.push((file_name(&self.dfp), self.dfp.clone()));
        entries.push((CHAIN_FILE_NAME.to_string(), chain_path.to_path_buf()));
        entries
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Copy the run's models into `staging_dir` under stamp-derived names.
pub fn stage_artifacts(
    stamp: BundleStamp,
    staging_dir: &Path,
    pre: Option<&Path>,
    dfp: &Path,
    post: Option<&Path>,
) -> Result<StagedArtifacts> {
    let copy = |from: &Path, name: String| -> Result<PathBuf> {
        let to = staging_dir.join(name);
        std::fs::copy(from, &to)?;
        debug!(from = %from.display(), to = %to.display(), "staged artifact");
        Ok(to)
    };

    Ok(StagedArtifacts {
        pre: pre.map(|p| copy(p, stamp.pre_name())).transpose()?,
        dfp: copy(dfp, stamp.dfp_name())?,
        post: post.map(|p| copy(p, stamp.post_name())).transpose()?,
    })
}

/// Write the rendered chain to `<staging>/<stamp>_chain.json`.
pub fn write_chain_file(stamp: BundleStamp, staging_dir: &Path, json: &[u8]) -> Result<PathBuf> {
    let path = staging_dir.join(stamp.chain_name());
    std::fs::write(&path, json)?;
    Ok(path)
}

/// `<output_dir>/<model-basename>.zip`
pub fn archive_path_for(output_dir: &Path, model_path: &Path) -> Result<PathBuf> {
    let stem = model_path
        .file_stem()
        .ok_or_else(|| ConversionError::InvalidModelPath(model_path.to_path_buf()))?;
    let mut name = stem.to_os_string();
    name.push(".zip");
    Ok(output_dir.join(name))
}

/// One file stored in the bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BundleEntry {
    pub name: String,
    pub size: u64,
    pub sha256: Digest,
}

/// Zip `entries` (`(name in archive, source path)`) into `archive_path`.
///
/// The archive is assembled in a temporary file next to `archive_path` and
/// renamed into place once complete.
pub fn write_bundle(archive_path: &Path, entries: &[(String, PathBuf)]) -> Result<Vec<BundleEntry>> {
    let dir = match archive_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut written = Vec::with_capacity(entries.len());
    {
        let mut zip = ZipWriter::new(tmp.as_file_mut());
        for (name, source) in entries {
            let (sha256, size) = Digest::of_file(source)?;
            zip.start_file(name.as_str(), options)?;
            let mut reader = File::open(source)?;
            io::copy(&mut reader, &mut zip)?;
            written.push(BundleEntry {
                name: name.clone(),
                size,
                sha256,
            });
        }
        zip.finish()?;
    }

    tmp.persist(archive_path).map_err(|e| e.error)?;
    info!(
        archive = %archive_path.display(),
        entries = written.len(),
        "bundle written"
    );
    Ok(written)
}
