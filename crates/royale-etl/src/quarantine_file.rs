//! JSON-file backend for the quarantine set.
//!
//! The file holds a single JSON array of player ids. A missing file is an
//! empty set. Writes merge with whatever is on disk and replace the file via
//! rename, so a crash mid-write leaves the previous set intact.

use std::{
  collections::BTreeSet,
  io::ErrorKind,
  path::{Path, PathBuf},
};

use royale_core::quarantine::QuarantineRepository;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FileQuarantineError {
  #[error("quarantine file I/O: {0}")]
  Io(#[from] std::io::Error),
  #[error("quarantine file is not a JSON array of ids: {0}")]
  Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct JsonFileQuarantine {
  path: PathBuf,
}

impl JsonFileQuarantine {
  pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into() } }

  pub fn path(&self) -> &Path { &self.path }

  async fn read(&self) -> Result<BTreeSet<String>, FileQuarantineError> {
    match tokio::fs::read(&self.path).await {
      Ok(bytes) => {
        let ids: Vec<String> = serde_json::from_slice(&bytes)?;
        Ok(ids.into_iter().collect())
      }
      Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeSet::new()),
      Err(e) => Err(e.into()),
    }
  }
}

impl QuarantineRepository for JsonFileQuarantine {
  type Error = FileQuarantineError;

  async fn load(&self) -> Result<BTreeSet<String>, Self::Error> { self.read().await }

  async fn persist(&self, ids: &BTreeSet<String>) -> Result<(), Self::Error> {
    let mut merged = self.read().await?;
    merged.extend(ids.iter().cloned());

    if let Some(dir) = self.path.parent()
      && !dir.as_os_str().is_empty()
    {
      tokio::fs::create_dir_all(dir).await?;
    }

    let tmp = self.path.with_extension("json.tmp");
    let body = serde_json::to_vec(&merged.into_iter().collect::<Vec<_>>())?;
    tokio::fs::write(&tmp, body).await?;
    tokio::fs::rename(&tmp, &self.path).await?;
    Ok(())
  }
}
