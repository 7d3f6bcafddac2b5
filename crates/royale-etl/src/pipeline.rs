//! The six-stage sync run.
//!
//! Stages run strictly in order and each commits its own batches, so a run
//! that aborts halfway leaves a consistent prefix behind and the next run
//! picks up from committed state. Writes follow the foreign-key order of
//! [`Table`]; the purge runs after every write that could reference a
//! quarantined player and before any match data is loaded.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use royale_core::{
  battle::Battle,
  delta::Delta,
  quarantine::{QuarantinePolicy, QuarantineRepository, QuarantineTracker},
  record::{SeasonRanking, Table},
  season::SeasonCalendar,
  source::GameSource,
  store::WarehouseStore,
};
use strum::IntoEnumIterator as _;
use tracing::Instrument as _;

use crate::{
  error::{PipelineError, StageError},
  fetch::Fetcher,
  orchestrator::{write, write_matches},
  purge::purge,
  summary::RunSummary,
};

type StageResult = Result<(), StageError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
  Seasons,
  PlayersAndClans,
  Rankings,
  Purge,
  Cards,
  Matches,
}

#[derive(Debug, Clone, Copy)]
pub struct PipelineSettings {
  /// Leaderboard entries requested per season.
  pub ranking_limit:         u32,
  /// Completed seasons tracked besides the current one.
  pub past_seasons:          usize,
  /// Future windows considered when assigning battles to seasons.
  pub lookup_future_seasons: usize,
  pub policy:                QuarantinePolicy,
}

impl Default for PipelineSettings {
  fn default() -> Self {
    Self {
      ranking_limit:         100,
      past_seasons:          3,
      lookup_future_seasons: 3,
      policy:                QuarantinePolicy::default(),
    }
  }
}

/// State carried between the stages of one run.
#[derive(Default)]
struct RunState {
  summary:           RunSummary,
  /// Leaderboards fetched while tracking players, reused for insertion.
  rankings:          HashMap<String, Vec<SeasonRanking>>,
  newly_quarantined: Vec<String>,
}

pub struct Pipeline<S, G, Q> {
  store:      S,
  fetcher:    Fetcher<G>,
  quarantine: QuarantineTracker<Q>,
  calendar:   SeasonCalendar,
  settings:   PipelineSettings,
}

fn store_err<E: std::error::Error + Send + Sync + 'static>(e: E) -> StageError {
  StageError::store(e)
}

impl<S, G, Q> Pipeline<S, G, Q>
where
  S: WarehouseStore,
  G: GameSource,
  Q: QuarantineRepository,
{
  pub fn new(
    store: S,
    fetcher: Fetcher<G>,
    quarantine: QuarantineTracker<Q>,
    calendar: SeasonCalendar,
    settings: PipelineSettings,
  ) -> Self {
    Self { store, fetcher, quarantine, calendar, settings }
  }

  pub fn store(&self) -> &S { &self.store }

  pub fn quarantine(&self) -> &QuarantineTracker<Q> { &self.quarantine }

  /// Run every stage against the season calendar at `reference`.
  ///
  /// Per-item failures are counted in the returned summary. The first stage
  /// error aborts the run.
  pub async fn run(&mut self, reference: DateTime<Utc>) -> Result<RunSummary, PipelineError> {
    let span = tracing::info_span!("etl_run", run_id = %uuid::Uuid::new_v4());
    async move {
      tracing::info!(%reference, quarantined = self.quarantine.len(), "starting run");
      let mut state = RunState::default();

      for stage in Stage::iter() {
        tracing::debug!(%stage, "stage start");
        if let Err(source) = self.run_stage(stage, reference, &mut state).await {
          tracing::error!(%stage, error = %source, "stage failed; aborting run");
          state.summary.log();
          return Err(PipelineError { stage, summary: state.summary, source });
        }
      }

      state.summary.log();
      tracing::info!("run complete");
      Ok(state.summary)
    }
    .instrument(span)
    .await
  }

  async fn run_stage(
    &mut self,
    stage: Stage,
    reference: DateTime<Utc>,
    state: &mut RunState,
  ) -> StageResult {
    match stage {
      Stage::Seasons => self.seasons(reference, state).await,
      Stage::PlayersAndClans => self.players_and_clans(reference, state).await,
      Stage::Rankings => self.rankings(reference, state).await,
      Stage::Purge => self.purge(state).await,
      Stage::Cards => self.cards(state).await,
      Stage::Matches => self.matches(reference, state).await,
    }
  }

  async fn distinct(&self, table: Table, column: &'static str) -> Result<Vec<String>, StageError> {
    self.store.select_distinct(table, column).await.map_err(store_err)
  }

  async fn distinct_set(
    &self,
    table: Table,
    column: &'static str,
  ) -> Result<HashSet<String>, StageError> {
    Ok(self.distinct(table, column).await?.into_iter().collect())
  }

  // ─── 1. Seasons ────────────────────────────────────────────────────────────

  async fn seasons(&mut self, reference: DateTime<Utc>, state: &mut RunState) -> StageResult {
    let mut windows = self.calendar.past_windows(reference, self.settings.past_seasons)?;
    windows.push(self.calendar.current_window(reference)?);

    let persisted = Delta::against(self.distinct(Table::Seasons, "season_id").await?);
    let new = persisted.retain_new(windows, |s| s.season_id.as_str());

    if new.is_empty() {
      tracing::info!("no new seasons");
    } else {
      let ids: Vec<&str> = new.iter().map(|s| s.season_id.as_str()).collect();
      tracing::info!(seasons = ?ids, "new seasons");
    }
    state.summary.seasons_inserted = write(&self.store, &new).await.map_err(store_err)?;
    Ok(())
  }

  // ─── 2. Players & clans ────────────────────────────────────────────────────

  async fn players_and_clans(
    &mut self,
    reference: DateTime<Utc>,
    state: &mut RunState,
  ) -> StageResult {
    let current = self.calendar.current_window(reference)?.season_id;
    let completed: Vec<String> = self
      .distinct(Table::Seasons, "season_id")
      .await?
      .into_iter()
      .filter(|id| *id < current)
      .collect();

    let mut tracked = Vec::new();
    let mut seen = HashSet::new();
    let mut leaderboards_unreachable = 0;
    for season_id in &completed {
      match self.fetcher.rankings(season_id, self.settings.ranking_limit).await {
        Ok(rankings) => {
          for r in &rankings {
            if seen.insert(r.player_id.clone()) {
              tracked.push(r.player_id.clone());
            }
          }
          state.rankings.insert(season_id.clone(), rankings);
        }
        Err(e) => {
          state.summary.ranking_failures += 1;
          if e.is_transport() {
            leaderboards_unreachable += 1;
          }
        }
      }
    }
    if !completed.is_empty() && leaderboards_unreachable == completed.len() {
      return Err(StageError::SourceUnavailable {
        endpoint:  "leaderboard",
        attempted: completed.len(),
      });
    }
    tracing::info!(seasons = completed.len(), players = tracked.len(), "tracking ranked players");

    let quarantine = &self.quarantine;
    let report = self.fetcher.players(&tracked, |id| quarantine.is_quarantined(id)).await;
    state.summary.player_failures = report.failures.len();
    if report.skipped > 0 {
      tracing::info!(skipped = report.skipped, "quarantined players not fetched");
    }
    if report.all_unreachable() {
      return Err(StageError::SourceUnavailable {
        endpoint:  "player",
        attempted: report.attempted(),
      });
    }

    let policy = self.settings.policy;
    let candidates: Vec<String> = report
      .failures
      .iter()
      .filter(|(_, e)| policy.should_quarantine(e))
      .map(|(id, _)| id.clone())
      .collect();
    let added = self
      .quarantine
      .record_failures(candidates)
      .await
      .map_err(StageError::quarantine)?;
    if !added.is_empty() {
      tracing::warn!(count = added.len(), players = ?added, "players quarantined");
    }
    let retry: Vec<&str> =
      report.failed_ids().filter(|id| !added.iter().any(|a| a.as_str() == *id)).collect();
    if !retry.is_empty() {
      tracing::error!(count = retry.len(), players = ?retry, "player fetches failed; retry next run");
    }
    state.summary.players_quarantined = added.len();
    state.newly_quarantined = added;

    let mut players = report.records;

    // Clans: current memberships first, then every clan already stored.
    let mut clan_ids = Vec::new();
    let mut seen = HashSet::new();
    let stored = self.distinct(Table::Clans, "clan_id").await?;
    for id in players.iter().filter_map(|p| p.clan_id.clone()).chain(stored) {
      if seen.insert(id.clone()) {
        clan_ids.push(id);
      }
    }

    let clans = self.fetcher.clans(&clan_ids).await;
    state.summary.clan_failures = clans.failures.len();
    if clans.all_unreachable() {
      return Err(StageError::SourceUnavailable {
        endpoint:  "clan",
        attempted: clans.attempted(),
      });
    }
    if !clans.failures.is_empty() {
      let failed: Vec<&str> = clans.failed_ids().collect();
      tracing::error!(count = failed.len(), clans = ?failed, "clan fetches failed; retry next run");
    }
    state.summary.clans_upserted = write(&self.store, &clans.records).await.map_err(store_err)?;

    let stored_clans = self.distinct_set(Table::Clans, "clan_id").await?;
    for player in &mut players {
      if player.clan_id.as_ref().is_some_and(|c| !stored_clans.contains(c)) {
        tracing::debug!(player_id = %player.player_id, clan_id = ?player.clan_id, "clan not stored; clearing link");
        player.clan_id = None;
        state.summary.clan_links_cleared += 1;
      }
    }
    state.summary.players_upserted = write(&self.store, &players).await.map_err(store_err)?;
    Ok(())
  }

  // ─── 3. Rankings ───────────────────────────────────────────────────────────

  async fn rankings(&mut self, reference: DateTime<Utc>, state: &mut RunState) -> StageResult {
    let completed = self.calendar.past_windows(reference, self.settings.past_seasons)?;
    let persisted = Delta::against(self.distinct(Table::SeasonRankings, "season_id").await?);
    let new_seasons = persisted.new_keys(completed.iter().map(|s| s.season_id.as_str()));

    if new_seasons.is_empty() {
      tracing::info!("no new season rankings");
      return Ok(());
    }

    let stored_players = self.distinct_set(Table::Players, "player_id").await?;
    let stored_seasons = self.distinct_set(Table::Seasons, "season_id").await?;
    let mut rows = Vec::new();

    for season_id in &new_seasons {
      if !stored_seasons.contains(season_id) {
        tracing::warn!(%season_id, "season not stored; skipping its rankings");
        continue;
      }
      let rankings = match state.rankings.remove(season_id) {
        Some(rankings) => rankings,
        None => match self.fetcher.rankings(season_id, self.settings.ranking_limit).await {
          Ok(rankings) => rankings,
          Err(_) => {
            state.summary.ranking_failures += 1;
            continue;
          }
        },
      };

      let mut seen = HashSet::new();
      for ranking in rankings {
        if self.quarantine.is_quarantined(&ranking.player_id)
          || !stored_players.contains(&ranking.player_id)
        {
          state.summary.rankings_dropped += 1;
          continue;
        }
        if seen.insert(ranking.player_id.clone()) {
          rows.push(ranking);
        }
      }
    }

    tracing::info!(seasons = ?new_seasons, "new season rankings");
    state.summary.rankings_inserted = write(&self.store, &rows).await.map_err(store_err)?;
    Ok(())
  }

  // ─── 4. Purge ──────────────────────────────────────────────────────────────

  /// Remove every quarantined player that still has stored rows: this run's
  /// additions, plus members left behind by a run that died between the
  /// quarantine flush and this stage.
  async fn purge(&mut self, state: &mut RunState) -> StageResult {
    let stored_players = self.distinct_set(Table::Players, "player_id").await?;
    let mut ids = state.newly_quarantined.clone();
    let leftover: Vec<String> = self
      .quarantine
      .members()
      .filter(|id| stored_players.contains(*id) && !ids.iter().any(|n| n.as_str() == *id))
      .map(str::to_owned)
      .collect();
    if !leftover.is_empty() {
      tracing::warn!(players = ?leftover, "quarantined players still stored; purging");
    }
    ids.extend(leftover);

    if ids.is_empty() {
      tracing::info!("nothing to purge");
      return Ok(());
    }
    state.summary.purged = purge(&self.store, &ids).await.map_err(store_err)?;
    Ok(())
  }

  // ─── 5. Cards ──────────────────────────────────────────────────────────────

  async fn cards(&mut self, state: &mut RunState) -> StageResult {
    match self.fetcher.cards().await {
      Ok(cards) => {
        state.summary.cards_upserted = write(&self.store, &cards).await.map_err(store_err)?;
      }
      Err(e) if e.is_transport() => {
        state.summary.card_catalog_failed = true;
        return Err(StageError::SourceUnavailable { endpoint: "card catalogue", attempted: 1 });
      }
      Err(e) => {
        tracing::error!(error = %e, "card catalogue fetch failed; keeping stored cards");
        state.summary.card_catalog_failed = true;
      }
    }
    Ok(())
  }

  // ─── 6. Matches ────────────────────────────────────────────────────────────

  async fn matches(&mut self, reference: DateTime<Utc>, state: &mut RunState) -> StageResult {
    let ranked = self.distinct(Table::SeasonRankings, "player_id").await?;
    let quarantine = &self.quarantine;
    let logs = self.fetcher.battle_logs(&ranked, |id| quarantine.is_quarantined(id)).await;

    state.summary.battle_log_failures = logs.failures.len();
    if !logs.failures.is_empty() {
      let failed: Vec<&str> = logs.failed_ids().collect();
      tracing::error!(count = failed.len(), players = ?failed, "battle log fetches failed; retry next run");
    }
    if logs.all_unreachable() {
      return Err(StageError::SourceUnavailable {
        endpoint:  "battle log",
        attempted: logs.attempted(),
      });
    }
    if logs.records.is_empty() {
      tracing::warn!("no match data returned");
      return Ok(());
    }

    let lookup = self.calendar.lookup(
      reference,
      self.settings.past_seasons,
      self.settings.lookup_future_seasons,
    )?;
    let stored_players = self.distinct_set(Table::Players, "player_id").await?;
    let stored_seasons = self.distinct_set(Table::Seasons, "season_id").await?;
    let stored_cards = self.distinct_set(Table::Cards, "card_id").await?;
    let persisted = Delta::against(self.distinct(Table::Matches, "match_key").await?);

    let mut seen = HashSet::new();
    let mut views = Vec::new();
    for battle in logs.records.into_iter().filter(Battle::is_ranked_ladder) {
      let mut view = battle.into_match_view(&lookup);
      let key = &view.record.match_key;
      if persisted.contains(key) || !seen.insert(key.clone()) {
        continue;
      }
      if !stored_players.contains(&view.record.player_id) {
        state.summary.match_views_dropped += 1;
        continue;
      }
      if view.record.season_id.as_ref().is_some_and(|s| !stored_seasons.contains(s)) {
        view.record.season_id = None;
      }
      let before = view.deck.len();
      view.deck.retain(|c| stored_cards.contains(&c.card_id));
      state.summary.match_cards_dropped += before - view.deck.len();
      views.push(view);
    }

    if views.is_empty() {
      tracing::info!("no new match data");
      return Ok(());
    }

    let written = write_matches(&self.store, views).await.map_err(store_err)?;
    tracing::info!(
      match_views = written.views,
      unique_battles = written.unique_battles,
      match_cards = written.cards_inserted,
      "match data written"
    );
    state.summary.match_views_inserted = written.views;
    state.summary.unique_battles_inserted = written.unique_battles;
    state.summary.match_cards_inserted = written.cards_inserted;
    state.summary.match_cards_dropped += written.cards_dropped;
    Ok(())
  }
}
