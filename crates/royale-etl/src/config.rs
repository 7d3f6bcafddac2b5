//! Runtime configuration, deserialised from `royale.toml` and `ROYALE__*`
//! environment variables.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use royale_core::quarantine::QuarantinePolicy;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct EtlConfig {
  #[serde(default = "default_api_base_url")]
  pub api_base_url:          String,
  pub api_token:             String,
  #[serde(default = "default_store_path")]
  pub store_path:            PathBuf,
  #[serde(default = "default_request_delay_ms")]
  pub request_delay_ms:      u64,
  #[serde(default = "default_request_timeout_secs")]
  pub request_timeout_secs:  u64,
  #[serde(default = "default_ranking_limit")]
  pub ranking_limit:         u32,
  #[serde(default = "default_past_seasons")]
  pub past_seasons:          usize,
  #[serde(default = "default_lookup_future_seasons")]
  pub lookup_future_seasons: usize,
  #[serde(default = "default_season_start_hour")]
  pub season_start_hour:     u32,
  #[serde(default)]
  pub quarantine:            QuarantineConfig,
  /// Directory for per-run log files. No file is written when unset.
  #[serde(default)]
  pub log_dir:               Option<PathBuf>,
}

impl EtlConfig {
  pub fn request_delay(&self) -> Duration { Duration::from_millis(self.request_delay_ms) }

  pub fn request_timeout(&self) -> Duration { Duration::from_secs(self.request_timeout_secs) }
}

fn default_api_base_url() -> String { "https://api.clashroyale.com/v1".into() }
fn default_store_path() -> PathBuf { "royale.db".into() }
fn default_request_delay_ms() -> u64 { 100 }
fn default_request_timeout_secs() -> u64 { 30 }
fn default_ranking_limit() -> u32 { 100 }
fn default_past_seasons() -> usize { 3 }
fn default_lookup_future_seasons() -> usize { 3 }
fn default_season_start_hour() -> u32 { 9 }

// ─── Quarantine ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuarantineBackend {
  /// The `quarantined_players` table of the warehouse.
  #[default]
  Store,
  /// A standalone JSON array file.
  File,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuarantineConfig {
  #[serde(default)]
  pub backend: QuarantineBackend,
  #[serde(default = "default_quarantine_path")]
  pub path:    PathBuf,
  #[serde(default)]
  pub policy:  QuarantinePolicy,
}

impl Default for QuarantineConfig {
  fn default() -> Self {
    Self {
      backend: QuarantineBackend::default(),
      path:    default_quarantine_path(),
      policy:  QuarantinePolicy::default(),
    }
  }
}

fn default_quarantine_path() -> PathBuf { "dropped_data/dropped_players.json".into() }

// ─── Paths ───────────────────────────────────────────────────────────────────

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
