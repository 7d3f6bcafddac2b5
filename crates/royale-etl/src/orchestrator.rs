//! Batch writes in foreign-key order, including the two-phase match write.

use std::collections::{HashMap, HashSet};

use royale_core::{
  battle::MatchView,
  record::{MatchCard, PendingMatchCard, Record, WriteMode},
  store::{MatchViewKey, WarehouseStore},
};

/// Write `rows` with the mode their table requires.
///
/// Empty batches are a no-op and never reach the store.
pub async fn write<S, R>(store: &S, rows: &[R]) -> Result<usize, S::Error>
where
  S: WarehouseStore,
  R: Record,
{
  if rows.is_empty() {
    tracing::info!(table = %R::TABLE, "nothing to write");
    return Ok(0);
  }

  let written = match R::TABLE.write_mode() {
    WriteMode::Append => store.insert_append(rows).await?,
    WriteMode::Upsert => store.merge_upsert(rows).await?,
  };
  tracing::info!(table = %R::TABLE, rows = written, mode = ?R::TABLE.write_mode(), "batch written");
  Ok(written)
}

// ─── Matches ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchWrite {
  pub views:          usize,
  pub unique_battles: usize,
  pub cards_inserted: usize,
  pub cards_dropped:  usize,
}

/// Write match views, then their deck cards linked to the surrogate keys the
/// store assigned.
///
/// Only keys written by this call are looked up, so cards never attach to
/// views from an earlier run.
pub async fn write_matches<S>(store: &S, views: Vec<MatchView>) -> Result<MatchWrite, S::Error>
where
  S: WarehouseStore,
{
  let unique_battles = unique_battle_count(&views);
  let (matches, pending): (Vec<_>, Vec<_>) =
    views.into_iter().map(|v| (v.record, v.deck)).unzip();
  let pending: Vec<PendingMatchCard> = pending.into_iter().flatten().collect();

  let views = write(store, &matches).await?;
  if views == 0 {
    return Ok(MatchWrite { cards_dropped: pending.len(), ..Default::default() });
  }

  let mut keys: Vec<String> = matches.iter().map(|m| m.match_key.clone()).collect();
  keys.sort();
  keys.dedup();
  let mapping = store.select_match_views(&keys).await?;

  let (cards, dropped) = link_match_cards(pending, &mapping);
  if dropped > 0 {
    tracing::debug!(dropped, "match cards without a stored match view");
  }
  let cards_inserted = write(store, &cards).await?;

  Ok(MatchWrite { views, unique_battles, cards_inserted, cards_dropped: dropped })
}

/// Inner-join pending cards to `mapping` on `match_key`.
///
/// A card joins every view stored under its key. Returns the linked rows and
/// the number of pending cards that found no view.
pub fn link_match_cards(
  pending: Vec<PendingMatchCard>,
  mapping: &[MatchViewKey],
) -> (Vec<MatchCard>, usize) {
  let mut ids: HashMap<&str, Vec<i64>> = HashMap::new();
  for m in mapping {
    ids.entry(m.match_key.as_str()).or_default().push(m.match_view_id);
  }

  let mut linked = Vec::with_capacity(pending.len());
  let mut dropped = 0;
  for card in pending {
    match ids.get(card.match_key.as_str()) {
      Some(view_ids) => {
        for &id in view_ids {
          linked.push(card.clone().link(id));
        }
      }
      None => dropped += 1,
    }
  }
  (linked, dropped)
}

/// Number of distinct battles among `views`. The two perspectives of one
/// battle share a time and an unordered pair of participants.
pub fn unique_battle_count(views: &[MatchView]) -> usize {
  views
    .iter()
    .map(|v| {
      let r = &v.record;
      let (a, b) = if r.player_id <= r.opponent_id {
        (r.player_id.as_str(), r.opponent_id.as_str())
      } else {
        (r.opponent_id.as_str(), r.player_id.as_str())
      };
      (r.battle_time, a, b)
    })
    .collect::<HashSet<_>>()
    .len()
}

#[cfg(test)]
mod tests {
  use chrono::{TimeZone, Utc};
  use royale_core::record::Match;

  use super::*;

  fn pending(key: &str, card: &str) -> PendingMatchCard {
    PendingMatchCard { match_key: key.into(), player_id: "#A".into(), card_id: card.into() }
  }

  fn view_key(id: i64, key: &str) -> MatchViewKey {
    MatchViewKey { match_view_id: id, match_key: key.into() }
  }

  fn view(player: &str, opponent: &str, minute: u32) -> MatchView {
    MatchView {
      record: Match {
        match_key:          format!("{minute}_{player}"),
        battle_time:        Utc.with_ymd_and_hms(2024, 5, 1, 10, minute, 0).unwrap(),
        is_win:             false,
        league:             None,
        player_id:          player.into(),
        opponent_id:        opponent.into(),
        season_id:          None,
        global_rank:        None,
        starting_rating:    None,
        rating_change:      None,
        crowns:             0,
        opp_crowns:         0,
        king_tower_hp:      None,
        princess_tower1_hp: 0,
        princess_tower2_hp: 0,
        elixir_leaked:      None,
      },
      deck:   Vec::new(),
    }
  }

  #[test]
  fn unlinked_cards_are_dropped_and_the_rest_kept() {
    let (linked, dropped) = link_match_cards(
      vec![pending("k1", "1"), pending("k1", "2"), pending("k2", "3")],
      &[view_key(10, "k1")],
    );
    assert_eq!(dropped, 1);
    assert_eq!(linked.len(), 2);
    assert!(linked.iter().all(|c| c.match_view_id == 10));
  }

  #[test]
  fn cards_join_every_view_sharing_a_key() {
    let (linked, dropped) =
      link_match_cards(vec![pending("k1", "1")], &[view_key(10, "k1"), view_key(11, "k1")]);
    assert_eq!(dropped, 0);
    assert_eq!(
      linked.iter().map(|c| c.match_view_id).collect::<Vec<_>>(),
      [10, 11]
    );
  }

  #[test]
  fn both_perspectives_count_as_one_battle() {
    let views = [view("#A", "#B", 0), view("#B", "#A", 0), view("#A", "#B", 5)];
    assert_eq!(unique_battle_count(&views), 2);
  }
}
