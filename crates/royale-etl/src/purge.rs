//! Removal of every row that belongs to a quarantined player.

use royale_core::{
  record::Table,
  store::{Deletion, WarehouseStore},
};

use crate::summary::PurgeReport;

/// Tables holding player-owned rows, children first. Clans are never purged.
const PURGE_ORDER: [Table; 4] =
  [Table::MatchCards, Table::Matches, Table::SeasonRankings, Table::Players];

pub fn deletions(player_ids: &[String]) -> Vec<Deletion> {
  player_ids
    .iter()
    .flat_map(|id| {
      PURGE_ORDER.map(|table| Deletion { table, column: "player_id", value: id.clone() })
    })
    .collect()
}

/// Delete all rows of `player_ids` in one transaction.
pub async fn purge<S: WarehouseStore>(
  store: &S,
  player_ids: &[String],
) -> Result<PurgeReport, S::Error> {
  if player_ids.is_empty() {
    return Ok(PurgeReport::default());
  }

  let plan = deletions(player_ids);
  let counts = store.execute_delete(&plan).await?;

  let mut report = PurgeReport::default();
  for (deletion, count) in plan.iter().zip(counts) {
    match deletion.table {
      Table::MatchCards => report.match_cards += count,
      Table::Matches => report.matches += count,
      Table::SeasonRankings => report.season_rankings += count,
      Table::Players => report.players += count,
      _ => {}
    }
  }

  tracing::warn!(
    players = player_ids.len(),
    match_cards = report.match_cards,
    matches = report.matches,
    season_rankings = report.season_rankings,
    player_rows = report.players,
    "purged quarantined players"
  );
  Ok(report)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn children_are_deleted_before_parents_for_each_player() {
    let plan = deletions(&["#A".into(), "#B".into()]);
    let tables: Vec<_> = plan.iter().map(|d| d.table).collect();
    assert_eq!(tables, [PURGE_ORDER, PURGE_ORDER].concat());
    assert!(plan[..4].iter().all(|d| d.value == "#A"));
    assert!(plan.iter().all(|d| d.column == "player_id"));
  }
}
