//! Paced, failure-tolerant batch fetching on top of a [`GameSource`].
//!
//! Every remote call is followed by a fixed delay. A failed fetch never
//! aborts a batch: the id and its [`FetchError`] are collected in the
//! [`FetchReport`] and the batch moves on.

use std::time::Duration;

use royale_core::{
  battle::Battle,
  record::{Card, Clan, Player, SeasonRanking},
  source::{FetchError, GameSource},
};

/// Outcome of fetching a batch of ids.
#[derive(Debug)]
pub struct FetchReport<T> {
  pub records:  Vec<T>,
  /// Ids that produced no record, with the reason.
  pub failures: Vec<(String, FetchError)>,
  /// Ids that were never requested because they are quarantined.
  pub skipped:  usize,
}

impl<T> Default for FetchReport<T> {
  fn default() -> Self { Self { records: Vec::new(), failures: Vec::new(), skipped: 0 } }
}

impl<T> FetchReport<T> {
  /// Every request failed without reaching the API.
  pub fn all_unreachable(&self) -> bool {
    self.records.is_empty()
      && !self.failures.is_empty()
      && self.failures.iter().all(|(_, e)| e.is_transport())
  }

  pub fn attempted(&self) -> usize { self.records.len() + self.failures.len() }

  pub fn failed_ids(&self) -> impl Iterator<Item = &str> {
    self.failures.iter().map(|(id, _)| id.as_str())
  }
}

pub struct Fetcher<G> {
  source: G,
  delay:  Duration,
}

impl<G: GameSource> Fetcher<G> {
  pub fn new(source: G, delay: Duration) -> Self { Self { source, delay } }

  async fn pace(&self) {
    if !self.delay.is_zero() {
      tokio::time::sleep(self.delay).await;
    }
  }

  /// Fetch each player not rejected by `skip`.
  pub async fn players<F>(&self, ids: &[String], skip: F) -> FetchReport<Player>
  where
    F: Fn(&str) -> bool,
  {
    let mut report = FetchReport::default();
    for id in ids {
      if skip(id) {
        report.skipped += 1;
        continue;
      }
      let result = self.source.player(id).await;
      self.pace().await;
      match result {
        Ok(player) => report.records.push(player),
        Err(e) => {
          tracing::warn!(player_id = %id, error = %e, "player fetch failed");
          report.failures.push((id.clone(), e));
        }
      }
    }
    report
  }

  pub async fn clans(&self, ids: &[String]) -> FetchReport<Clan> {
    let mut report = FetchReport::default();
    for id in ids {
      let result = self.source.clan(id).await;
      self.pace().await;
      match result {
        Ok(clan) => report.records.push(clan),
        Err(e) => {
          tracing::warn!(clan_id = %id, error = %e, "clan fetch failed");
          report.failures.push((id.clone(), e));
        }
      }
    }
    report
  }

  pub async fn rankings(
    &self,
    season_id: &str,
    limit: u32,
  ) -> Result<Vec<SeasonRanking>, FetchError> {
    let result = self.source.season_rankings(season_id, limit).await;
    self.pace().await;
    if let Err(e) = &result {
      tracing::warn!(season_id, error = %e, "season ranking fetch failed");
    }
    result
  }

  pub async fn cards(&self) -> Result<Vec<Card>, FetchError> {
    let result = self.source.cards().await;
    self.pace().await;
    result
  }

  /// Fetch the battle logs of `ids`, skipping those rejected by `skip`.
  /// Records are the concatenation of all logs, in id order.
  pub async fn battle_logs<F>(&self, ids: &[String], skip: F) -> FetchReport<Battle>
  where
    F: Fn(&str) -> bool,
  {
    let mut report = FetchReport::default();
    for id in ids {
      if skip(id) {
        report.skipped += 1;
        continue;
      }
      let result = self.source.battle_log(id).await;
      self.pace().await;
      match result {
        Ok(battles) => report.records.extend(battles),
        Err(e) => {
          tracing::warn!(player_id = %id, error = %e, "battle log fetch failed");
          report.failures.push((id.clone(), e));
        }
      }
    }
    report
  }
}
