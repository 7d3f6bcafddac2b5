//! Per-run counters.

/// Rows removed by one purge, per table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeReport {
  pub match_cards:     usize,
  pub matches:         usize,
  pub season_rankings: usize,
  pub players:         usize,
}

impl PurgeReport {
  pub fn total(&self) -> usize {
    self.match_cards + self.matches + self.season_rankings + self.players
  }
}

/// Aggregated outcome of a run. Filled in stage by stage, so a failed run
/// still reports what it got done.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
  pub seasons_inserted:        usize,
  pub clans_upserted:          usize,
  pub players_upserted:        usize,
  pub rankings_inserted:       usize,
  pub cards_upserted:          usize,
  pub match_views_inserted:    usize,
  pub unique_battles_inserted: usize,
  pub match_cards_inserted:    usize,
  pub match_cards_dropped:     usize,
  pub players_quarantined:     usize,
  pub purged:                  PurgeReport,

  pub clan_failures:           usize,
  pub player_failures:         usize,
  pub ranking_failures:        usize,
  pub battle_log_failures:     usize,
  pub card_catalog_failed:     bool,

  /// Players written without their clan because the clan is not stored.
  pub clan_links_cleared:      usize,
  pub rankings_dropped:        usize,
  pub match_views_dropped:     usize,
}

impl RunSummary {
  pub fn log(&self) {
    tracing::info!(
      seasons = self.seasons_inserted,
      clans = self.clans_upserted,
      players = self.players_upserted,
      rankings = self.rankings_inserted,
      cards = self.cards_upserted,
      match_views = self.match_views_inserted,
      unique_battles = self.unique_battles_inserted,
      match_cards = self.match_cards_inserted,
      quarantined = self.players_quarantined,
      purged_rows = self.purged.total(),
      "run totals"
    );

    if self.has_failures() {
      tracing::warn!(
        clan_failures = self.clan_failures,
        player_failures = self.player_failures,
        ranking_failures = self.ranking_failures,
        battle_log_failures = self.battle_log_failures,
        card_catalog_failed = self.card_catalog_failed,
        "run finished with per-item failures"
      );
    }

    let held_back = self.clan_links_cleared
      + self.rankings_dropped
      + self.match_views_dropped
      + self.match_cards_dropped;
    if held_back > 0 {
      tracing::info!(
        clan_links_cleared = self.clan_links_cleared,
        rankings_dropped = self.rankings_dropped,
        match_views_dropped = self.match_views_dropped,
        match_cards_dropped = self.match_cards_dropped,
        "rows held back by referential guards"
      );
    }
  }

  pub fn has_failures(&self) -> bool {
    self.clan_failures
      + self.player_failures
      + self.ranking_failures
      + self.battle_log_failures
      > 0
      || self.card_catalog_failed
  }
}
