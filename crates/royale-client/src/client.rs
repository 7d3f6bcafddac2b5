//! Async HTTP client for the Clash Royale JSON API.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use royale_core::{
  battle::Battle,
  record::{Card, Clan, Player, SeasonRanking, url_encode_tag},
  source::{FetchError, GameSource},
};
use serde::de::DeserializeOwned;

use crate::models::{BattlePayload, CardEntry, ClanPayload, Page, PlayerPayload, RankingEntry};

/// Connection settings for the API.
#[derive(Debug, Clone)]
pub struct ClientConfig {
  pub base_url: String,
  /// Bearer token issued by the developer portal.
  pub token:    String,
  pub timeout:  Duration,
}

impl ClientConfig {
  pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
    Self {
      base_url: base_url.into(),
      token:    token.into(),
      timeout:  Duration::from_secs(30),
    }
  }
}

/// [`GameSource`] over HTTP.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct RoyaleClient {
  client: Client,
  config: ClientConfig,
}

impl RoyaleClient {
  pub fn new(config: ClientConfig) -> reqwest::Result<Self> {
    let client = Client::builder().timeout(config.timeout).build()?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
  }

  /// `GET` `path` and decode a 200 body as `T`.
  async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, FetchError> {
    let resp = self
      .client
      .get(self.url(path))
      .bearer_auth(&self.config.token)
      .send()
      .await
      .map_err(|e| FetchError::Transport(e.to_string()))?;

    let status = resp.status();
    if status != StatusCode::OK {
      tracing::debug!(path, %status, "non-success response");
      return Err(FetchError::Status(status.as_u16()));
    }

    let body = resp
      .bytes()
      .await
      .map_err(|e| FetchError::Transport(e.to_string()))?;
    serde_json::from_slice(&body).map_err(|e| FetchError::Malformed(e.to_string()))
  }
}

// ─── GameSource impl ─────────────────────────────────────────────────────────

impl GameSource for RoyaleClient {
  /// `GET /players/{tag}`
  async fn player(&self, player_id: &str) -> Result<Player, FetchError> {
    let payload: PlayerPayload = self
      .get_json(&format!("/players/{}", url_encode_tag(player_id)))
      .await?;
    payload.try_into()
  }

  /// `GET /clans/{tag}`
  async fn clan(&self, clan_id: &str) -> Result<Clan, FetchError> {
    let payload: ClanPayload = self
      .get_json(&format!("/clans/{}", url_encode_tag(clan_id)))
      .await?;
    payload.try_into()
  }

  /// `GET /locations/global/pathoflegend/{season}/rankings/players?limit=N`
  async fn season_rankings(
    &self,
    season_id: &str,
    limit: u32,
  ) -> Result<Vec<SeasonRanking>, FetchError> {
    let page: Page<RankingEntry> = self
      .get_json(&format!(
        "/locations/global/pathoflegend/{season_id}/rankings/players?limit={limit}"
      ))
      .await?;

    let total = page.items.len();
    let rankings: Vec<_> = page
      .items
      .into_iter()
      .filter_map(|entry| entry.into_ranking(season_id))
      .collect();
    if rankings.len() < total {
      tracing::warn!(season_id, skipped = total - rankings.len(), "ranking entries without tag or rank");
    }
    Ok(rankings)
  }

  /// `GET /cards`
  async fn cards(&self) -> Result<Vec<Card>, FetchError> {
    let page: Page<CardEntry> = self.get_json("/cards").await?;
    Ok(page.items.into_iter().filter_map(CardEntry::into_card).collect())
  }

  /// `GET /players/{tag}/battlelog`
  ///
  /// Individual battles that cannot be decoded are skipped.
  async fn battle_log(&self, player_id: &str) -> Result<Vec<Battle>, FetchError> {
    let payloads: Vec<BattlePayload> = self
      .get_json(&format!("/players/{}/battlelog", url_encode_tag(player_id)))
      .await?;

    let battles = payloads
      .into_iter()
      .filter_map(|payload| match Battle::try_from(payload) {
        Ok(battle) => Some(battle),
        Err(e) => {
          tracing::warn!(player_id, error = %e, "skipping undecodable battle");
          None
        }
      })
      .collect();
    Ok(battles)
  }
}
