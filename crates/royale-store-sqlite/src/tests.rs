//! Integration tests for `SqliteStore` against an in-memory database.

use std::collections::BTreeSet;

use chrono::{TimeZone, Utc};
use royale_core::{
  quarantine::QuarantineRepository,
  record::{Card, Clan, Match, MatchCard, Player, Season, SeasonRanking, Table},
  store::{Deletion, WarehouseStore},
};

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

// ─── Fixtures ────────────────────────────────────────────────────────────────

fn season(id: &str, month: u32) -> Season {
  Season {
    season_id: id.into(),
    start:     Utc.with_ymd_and_hms(2024, month, 1, 9, 0, 0).unwrap(),
    end:       Utc.with_ymd_and_hms(2024, month + 1, 1, 8, 59, 59).unwrap(),
  }
}

fn clan(id: &str, score: i64) -> Clan {
  Clan {
    clan_id:           id.into(),
    clan_name:         format!("clan {id}"),
    clan_type:         "open".into(),
    badge_id:          "16000000".into(),
    clan_score:        score,
    clan_war_trophies: 0,
    location:          Some("International".into()),
    required_trophies: 5000,
    members:           50,
  }
}

fn player(id: &str, clan_id: Option<&str>) -> Player {
  Player {
    player_id:          id.into(),
    player_name:        format!("player {id}"),
    exp_level:          60,
    trophies:           9000,
    best_trophies:      9200,
    wins:               100,
    losses:             50,
    battle_count:       150,
    max_challenge_wins: 12,
    clan_id:            clan_id.map(str::to_owned),
  }
}

fn card(id: &str) -> Card {
  Card {
    card_id:       id.into(),
    card_name:     format!("card {id}"),
    rarity:        "common".into(),
    elixir_cost:   Some(3),
    has_evolution: false,
  }
}

fn match_view(key: &str, player_id: &str) -> Match {
  Match {
    match_key:          key.into(),
    battle_time:        Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
    is_win:             true,
    league:             Some(7),
    player_id:          player_id.into(),
    opponent_id:        "#OPP".into(),
    season_id:          None,
    global_rank:        None,
    starting_rating:    Some(2000),
    rating_change:      Some(12),
    crowns:             3,
    opp_crowns:         1,
    king_tower_hp:      Some(4000),
    princess_tower1_hp: 2000,
    princess_tower2_hp: 0,
    elixir_leaked:      Some(1.5),
  }
}

// ─── Distinct selection ──────────────────────────────────────────────────────

#[tokio::test]
async fn select_distinct_is_sorted_and_deduplicated() {
  let s = store().await;
  s.insert_append(&[season("2024-03", 3), season("2024-01", 1), season("2024-02", 2)])
    .await
    .unwrap();

  let ids = s.select_distinct(Table::Seasons, "season_id").await.unwrap();
  assert_eq!(ids, ["2024-01", "2024-02", "2024-03"]);
}

#[tokio::test]
async fn select_distinct_skips_nulls() {
  let s = store().await;
  s.merge_upsert(&[clan("#C1", 1)]).await.unwrap();
  s.merge_upsert(&[player("#A", Some("#C1")), player("#B", None)]).await.unwrap();

  let clans = s.select_distinct(Table::Players, "clan_id").await.unwrap();
  assert_eq!(clans, ["#C1"]);
}

// ─── Append / upsert ─────────────────────────────────────────────────────────

#[tokio::test]
async fn append_rejects_duplicate_keys_atomically() {
  let s = store().await;
  s.insert_append(&[season("2024-01", 1)]).await.unwrap();

  let err = s
    .insert_append(&[season("2024-02", 2), season("2024-01", 1)])
    .await;
  assert!(err.is_err());

  // The failed batch left nothing behind.
  assert_eq!(s.row_count(Table::Seasons).await.unwrap(), 1);
}

#[tokio::test]
async fn upsert_updates_existing_and_inserts_new() {
  let s = store().await;
  s.merge_upsert(&[clan("#C1", 100)]).await.unwrap();
  s.merge_upsert(&[clan("#C1", 250), clan("#C2", 10)]).await.unwrap();

  assert_eq!(s.row_count(Table::Clans).await.unwrap(), 2);
  let score: i64 = s
    .conn
    .call(|conn| {
      Ok(conn.query_row("SELECT clan_score FROM clans WHERE clan_id = '#C1'", [], |r| r.get(0))?)
    })
    .await
    .unwrap();
  assert_eq!(score, 250);
}

#[tokio::test]
async fn empty_batches_write_nothing() {
  let s = store().await;
  assert_eq!(s.insert_append::<Season>(&[]).await.unwrap(), 0);
  assert_eq!(s.merge_upsert::<Player>(&[]).await.unwrap(), 0);
}

#[tokio::test]
async fn foreign_keys_are_enforced() {
  let s = store().await;
  // Clan not written yet.
  let err = s.merge_upsert(&[player("#A", Some("#MISSING"))]).await;
  assert!(err.is_err());
  assert_eq!(s.row_count(Table::Players).await.unwrap(), 0);
}

#[tokio::test]
async fn match_views_sharing_a_key_get_distinct_surrogates() {
  let s = store().await;
  s.merge_upsert(&[player("#PLAYERA", None)]).await.unwrap();

  let key = "2024-05-01T10:00:00Z_#PLAYERA".to_string();
  s.insert_append(&[match_view(&key, "#PLAYERA"), match_view(&key, "#PLAYERA")])
    .await
    .unwrap();

  let mapping = s.select_match_views(std::slice::from_ref(&key)).await.unwrap();
  assert_eq!(mapping.len(), 2);
  assert_ne!(mapping[0].match_view_id, mapping[1].match_view_id);
  assert!(mapping.iter().all(|m| m.match_key == key));
}

#[tokio::test]
async fn select_match_views_filters_by_key() {
  let s = store().await;
  s.merge_upsert(&[player("#A", None)]).await.unwrap();
  s.insert_append(&[match_view("k1", "#A"), match_view("k2", "#A")])
    .await
    .unwrap();

  let mapping = s.select_match_views(&["k2".to_string(), "nope".to_string()]).await.unwrap();
  assert_eq!(mapping.len(), 1);
  assert_eq!(mapping[0].match_key, "k2");
  assert!(s.select_match_views(&[]).await.unwrap().is_empty());
}

// ─── Deletes ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn deletes_run_in_order_and_report_counts() {
  let s = store().await;
  s.insert_append(&[season("2024-01", 1)]).await.unwrap();
  s.merge_upsert(&[player("#A", None), player("#B", None)]).await.unwrap();
  s.merge_upsert(&[card("26000000")]).await.unwrap();
  s.insert_append(&[SeasonRanking {
    player_id: "#A".into(),
    season_id: "2024-01".into(),
    rank:      1,
    rating:    3000,
  }])
  .await
  .unwrap();
  s.insert_append(&[match_view("k1", "#A")]).await.unwrap();
  let view = s.select_match_views(&["k1".to_string()]).await.unwrap()[0].match_view_id;
  s.insert_append(&[MatchCard {
    match_view_id: view,
    player_id:     "#A".into(),
    card_id:       "26000000".into(),
  }])
  .await
  .unwrap();

  let deletions =
    [Table::MatchCards, Table::Matches, Table::SeasonRankings, Table::Players]
      .map(|table| Deletion { table, column: "player_id", value: "#A".into() });

  let counts = s.execute_delete(&deletions).await.unwrap();
  assert_eq!(counts, [1, 1, 1, 1]);
  assert_eq!(s.row_count(Table::Players).await.unwrap(), 1);
}

#[tokio::test]
async fn deleting_parent_before_child_fails_and_rolls_back() {
  let s = store().await;
  s.merge_upsert(&[player("#A", None)]).await.unwrap();
  s.insert_append(&[match_view("k1", "#A")]).await.unwrap();

  let deletions = [
    Deletion { table: Table::Players, column: "player_id", value: "#A".into() },
    Deletion { table: Table::Matches, column: "player_id", value: "#A".into() },
  ];
  assert!(s.execute_delete(&deletions).await.is_err());
  assert_eq!(s.row_count(Table::Players).await.unwrap(), 1);
  assert_eq!(s.row_count(Table::Matches).await.unwrap(), 1);
}

// ─── Quarantine ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn quarantine_merges_and_never_shrinks() {
  let s = store().await;
  assert!(s.load().await.unwrap().is_empty());

  s.persist(&BTreeSet::from(["#A".to_string(), "#B".to_string()]))
    .await
    .unwrap();
  s.persist(&BTreeSet::from(["#B".to_string(), "#C".to_string()]))
    .await
    .unwrap();

  let ids = s.load().await.unwrap();
  assert_eq!(ids.into_iter().collect::<Vec<_>>(), ["#A", "#B", "#C"]);
}
