//! The `GameSource` trait, the remote statistics API as seen by the
//! pipeline, and the failure marker its fetches return.

use std::future::Future;

use thiserror::Error;

use crate::{
  battle::Battle,
  record::{Card, Clan, Player, SeasonRanking},
};

// ─── Failure marker ──────────────────────────────────────────────────────────

/// Why a single remote fetch produced no record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
  /// The API answered with a non-success status.
  #[error("unexpected status {0}")]
  Status(u16),

  /// The API answered 200 but the payload has no identity field.
  #[error("response is missing identity field `{0}`")]
  MissingIdentity(&'static str),

  /// The payload could not be decoded into a record.
  #[error("malformed payload: {0}")]
  Malformed(String),

  /// The request never produced a response (DNS, connect, TLS, timeout).
  #[error("transport error: {0}")]
  Transport(String),
}

impl FetchError {
  /// The entity is known to be gone: deleted, banned, or otherwise no longer
  /// served.
  pub fn is_permanent(&self) -> bool {
    matches!(self, Self::Status(404) | Self::MissingIdentity(_))
  }

  /// The API could not be reached at all.
  pub fn is_transport(&self) -> bool { matches!(self, Self::Transport(_)) }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// One-entity-per-request access to the remote statistics API.
///
/// Identifiers are raw tags (`#ABC123`); implementations handle any URL
/// encoding.
pub trait GameSource: Send + Sync {
  fn player<'a>(
    &'a self,
    player_id: &'a str,
  ) -> impl Future<Output = Result<Player, FetchError>> + Send + 'a;

  fn clan<'a>(
    &'a self,
    clan_id: &'a str,
  ) -> impl Future<Output = Result<Clan, FetchError>> + Send + 'a;

  /// Global ranked-ladder leaderboard for one closed season.
  fn season_rankings<'a>(
    &'a self,
    season_id: &'a str,
    limit: u32,
  ) -> impl Future<Output = Result<Vec<SeasonRanking>, FetchError>> + Send + 'a;

  /// The full card catalogue.
  fn cards(&self) -> impl Future<Output = Result<Vec<Card>, FetchError>> + Send + '_;

  /// Recent battles, from `player_id`'s perspective.
  fn battle_log<'a>(
    &'a self,
    player_id: &'a str,
  ) -> impl Future<Output = Result<Vec<Battle>, FetchError>> + Send + 'a;
}
