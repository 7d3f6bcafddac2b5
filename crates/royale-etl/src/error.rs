//! Fatal pipeline errors.

use thiserror::Error;

use crate::{pipeline::Stage, summary::RunSummary};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Why a stage could not complete.
#[derive(Debug, Error)]
pub enum StageError {
  #[error("store error: {0}")]
  Store(#[source] BoxError),

  #[error("quarantine error: {0}")]
  Quarantine(#[source] BoxError),

  #[error(transparent)]
  Calendar(#[from] royale_core::Error),

  /// Every request to `endpoint` in the stage failed before reaching the
  /// API. Nothing was quarantined.
  #[error("source unreachable: all {attempted} {endpoint} fetches failed in transport")]
  SourceUnavailable { endpoint: &'static str, attempted: usize },
}

impl StageError {
  pub fn store<E: std::error::Error + Send + Sync + 'static>(e: E) -> Self {
    Self::Store(Box::new(e))
  }

  pub fn quarantine<E: std::error::Error + Send + Sync + 'static>(e: E) -> Self {
    Self::Quarantine(Box::new(e))
  }
}

/// A run aborted in `stage`. `summary` holds what earlier stages committed.
#[derive(Debug, Error)]
#[error("stage `{stage}` failed: {source}")]
pub struct PipelineError {
  pub stage:   Stage,
  pub summary: RunSummary,
  #[source]
  pub source:  StageError,
}
