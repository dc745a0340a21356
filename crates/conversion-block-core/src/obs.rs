//! Structured observability hooks for the conversion lifecycle.
//!
//! Events are emitted at `info!` level with an `event` field, inside a
//! run-scoped span carrying the run id.

use std::path::Path;

use tracing::info;

/// RAII guard that enters a run-scoped tracing span for the duration of a conversion.
pub struct RunSpan {
    run_id: String,
    _span: tracing::span::EnteredSpan,
}

impl RunSpan {
    /// Create and enter a span tagged with a fresh run id.
    pub fn enter() -> Self {
        Self::enter_with_id(&uuid::Uuid::new_v4().to_string())
    }

    /// Create and enter a span tagged with `run_id`.
    pub fn enter_with_id(run_id: &str) -> Self {
        let span = tracing::info_span!("conversion.run", run_id = %run_id);
        Self {
            run_id: run_id.to_string(),
            _span: span.entered(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }
}

/// Emit event: conversion started.
pub fn emit_conversion_started(run_id: &str, model: &Path, output_dir: &Path) {
    info!(
        event = "conversion.started",
        run_id = %run_id,
        model = %model.display(),
        output_dir = %output_dir.display(),
    );
}

/// Emit event: a pipeline step completed.
pub fn emit_step_completed(run_id: &str, step: &str) {
    info!(event = "conversion.step_completed", run_id = %run_id, step = %step);
}

/// Emit event: conversion finished.
pub fn emit_conversion_finished(run_id: &str, archive: &Path, duration_ms: u64, stages: usize) {
    info!(
        event = "conversion.finished",
        run_id = %run_id,
        archive = %archive.display(),
        duration_ms = duration_ms,
        stages = stages,
    );
}

/// Emit event: conversion failed (warning level).
pub fn emit_conversion_failed(run_id: &str, error: &dyn std::fmt::Display) {
    tracing::warn!(event = "conversion.failed", run_id = %run_id, error = %error);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_span_ids_are_unique() {
        let a = RunSpan::enter();
        let a_id = a.run_id().to_string();
        drop(a);
        let b = RunSpan::enter();
        assert_ne!(a_id, b.run_id());
    }

    #[test]
    fn test_run_span_with_id() {
        let span = RunSpan::enter_with_id("run-42");
        assert_eq!(span.run_id(), "run-42");
    }
}
