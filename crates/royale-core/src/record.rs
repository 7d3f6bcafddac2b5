//! Record types: the normalised rows written to the warehouse.
//!
//! Every record knows which [`Table`] it belongs to and how to flatten itself
//! into an ordered list of [`SqlValue`]s. Storage backends build their SQL
//! from that description; nothing in this crate knows about a concrete
//! database.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─── Tables ──────────────────────────────────────────────────────────────────

/// The warehouse tables, declared in foreign-key dependency order.
///
/// Every table holds foreign keys only into tables declared before it, so the
/// derived `Ord` is also the order in which a run must write them.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  strum::Display,
  strum::IntoStaticStr,
  strum::EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum Table {
  Seasons,
  Clans,
  Players,
  SeasonRankings,
  Cards,
  Matches,
  MatchCards,
}

/// How a batch of records is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
  /// Append-only log rows; existing rows are never touched.
  Append,
  /// Match on the primary key; update every non-key column on match, insert
  /// otherwise.
  Upsert,
}

impl Table {
  /// The SQL table name.
  pub fn name(self) -> &'static str { self.into() }

  pub fn write_mode(self) -> WriteMode {
    match self {
      Self::Clans | Self::Players | Self::Cards => WriteMode::Upsert,
      Self::Seasons | Self::SeasonRankings | Self::Matches | Self::MatchCards => {
        WriteMode::Append
      }
    }
  }

  /// Columns forming the natural primary key. Empty for tables keyed by a
  /// store-generated surrogate.
  pub fn key_columns(self) -> &'static [&'static str] {
    match self {
      Self::Seasons => &["season_id"],
      Self::Clans => &["clan_id"],
      Self::Players => &["player_id"],
      Self::SeasonRankings => &["player_id", "season_id"],
      Self::Cards => &["card_id"],
      Self::Matches | Self::MatchCards => &[],
    }
  }
}

// ─── Values ──────────────────────────────────────────────────────────────────

/// A database-agnostic column value.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
  Null,
  Integer(i64),
  Real(f64),
  Text(String),
}

impl From<i64> for SqlValue {
  fn from(v: i64) -> Self { Self::Integer(v) }
}

impl From<bool> for SqlValue {
  fn from(v: bool) -> Self { Self::Integer(i64::from(v)) }
}

impl From<f64> for SqlValue {
  fn from(v: f64) -> Self { Self::Real(v) }
}

impl From<String> for SqlValue {
  fn from(v: String) -> Self { Self::Text(v) }
}

impl From<&str> for SqlValue {
  fn from(v: &str) -> Self { Self::Text(v.to_owned()) }
}

impl From<DateTime<Utc>> for SqlValue {
  fn from(v: DateTime<Utc>) -> Self { Self::Text(v.to_rfc3339()) }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
  fn from(v: Option<T>) -> Self { v.map_or(Self::Null, Into::into) }
}

/// A row that can be written to the warehouse.
pub trait Record: Send + Sync {
  const TABLE: Table;
  /// Column names, in the same order as [`Record::values`].
  const COLUMNS: &'static [&'static str];

  fn values(&self) -> Vec<SqlValue>;
}

/// Encode a player or clan tag for use in a URL path (`#` becomes `%23`).
pub fn url_encode_tag(tag: &str) -> String { tag.replace('#', "%23") }

// ─── Season ──────────────────────────────────────────────────────────────────

/// A season window. `end` is one second before the next window's start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Season {
  pub season_id: String,
  pub start:     DateTime<Utc>,
  pub end:       DateTime<Utc>,
}

impl Season {
  /// Whether `t` falls inside `[start, end + 1s)`.
  pub fn contains(&self, t: DateTime<Utc>) -> bool {
    self.start <= t && t < self.end + chrono::Duration::seconds(1)
  }
}

impl Record for Season {
  const TABLE: Table = Table::Seasons;
  const COLUMNS: &'static [&'static str] = &["season_id", "sn_start_date", "sn_end_date"];

  fn values(&self) -> Vec<SqlValue> {
    vec![self.season_id.as_str().into(), self.start.into(), self.end.into()]
  }
}

// ─── Clan ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clan {
  pub clan_id:           String,
  pub clan_name:         String,
  pub clan_type:         String,
  pub badge_id:          String,
  pub clan_score:        i64,
  pub clan_war_trophies: i64,
  pub location:          Option<String>,
  pub required_trophies: i64,
  pub members:           i64,
}

impl Record for Clan {
  const TABLE: Table = Table::Clans;
  const COLUMNS: &'static [&'static str] = &[
    "clan_id",
    "clan_name",
    "clan_type",
    "badge_id",
    "clan_score",
    "clan_war_trophies",
    "clan_location",
    "required_trophies",
    "members",
    "url_encoded_cid",
  ];

  fn values(&self) -> Vec<SqlValue> {
    vec![
      self.clan_id.as_str().into(),
      self.clan_name.as_str().into(),
      self.clan_type.as_str().into(),
      self.badge_id.as_str().into(),
      self.clan_score.into(),
      self.clan_war_trophies.into(),
      self.location.clone().into(),
      self.required_trophies.into(),
      self.members.into(),
      url_encode_tag(&self.clan_id).into(),
    ]
  }
}

// ─── Player ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
  pub player_id:          String,
  pub player_name:        String,
  pub exp_level:          i64,
  pub trophies:           i64,
  pub best_trophies:      i64,
  pub wins:               i64,
  pub losses:             i64,
  pub battle_count:       i64,
  pub max_challenge_wins: i64,
  /// Current clan, if any. May name a clan that has not been written yet.
  pub clan_id:            Option<String>,
}

impl Record for Player {
  const TABLE: Table = Table::Players;
  const COLUMNS: &'static [&'static str] = &[
    "player_id",
    "player_name",
    "exp_lvl",
    "road_trophies",
    "best_road_trophies",
    "wins",
    "losses",
    "life_time_battles",
    "max_challenge_wins",
    "clan_id",
    "url_encoded_pid",
  ];

  fn values(&self) -> Vec<SqlValue> {
    vec![
      self.player_id.as_str().into(),
      self.player_name.as_str().into(),
      self.exp_level.into(),
      self.trophies.into(),
      self.best_trophies.into(),
      self.wins.into(),
      self.losses.into(),
      self.battle_count.into(),
      self.max_challenge_wins.into(),
      self.clan_id.clone().into(),
      url_encode_tag(&self.player_id).into(),
    ]
  }
}

// ─── SeasonRanking ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonRanking {
  pub player_id: String,
  pub season_id: String,
  pub rank:      i64,
  pub rating:    i64,
}

impl Record for SeasonRanking {
  const TABLE: Table = Table::SeasonRankings;
  const COLUMNS: &'static [&'static str] = &["player_id", "season_id", "rank", "rating"];

  fn values(&self) -> Vec<SqlValue> {
    vec![
      self.player_id.as_str().into(),
      self.season_id.as_str().into(),
      self.rank.into(),
      self.rating.into(),
    ]
  }
}

// ─── Card ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
  pub card_id:       String,
  pub card_name:     String,
  pub rarity:        String,
  /// Absent for cards without a fixed cost (e.g. Mirror).
  pub elixir_cost:   Option<i64>,
  pub has_evolution: bool,
}

impl Record for Card {
  const TABLE: Table = Table::Cards;
  const COLUMNS: &'static [&'static str] =
    &["card_id", "card_name", "rarity", "elixir_cost", "evo_status"];

  fn values(&self) -> Vec<SqlValue> {
    vec![
      self.card_id.as_str().into(),
      self.card_name.as_str().into(),
      self.rarity.as_str().into(),
      self.elixir_cost.into(),
      self.has_evolution.into(),
    ]
  }
}

// ─── Match ───────────────────────────────────────────────────────────────────

/// One participant's view of a battle. `match_view_id` is assigned by the
/// store and is therefore not part of this record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
  pub match_key:          String,
  pub battle_time:        DateTime<Utc>,
  pub is_win:             bool,
  pub league:             Option<i64>,
  pub player_id:          String,
  pub opponent_id:        String,
  pub season_id:          Option<String>,
  pub global_rank:        Option<i64>,
  pub starting_rating:    Option<i64>,
  pub rating_change:      Option<i64>,
  pub crowns:             i64,
  pub opp_crowns:         i64,
  pub king_tower_hp:      Option<i64>,
  pub princess_tower1_hp: i64,
  pub princess_tower2_hp: i64,
  pub elixir_leaked:      Option<f64>,
}

impl Record for Match {
  const TABLE: Table = Table::Matches;
  const COLUMNS: &'static [&'static str] = &[
    "match_key",
    "battle_time",
    "is_win",
    "league",
    "player_id",
    "opponent_id",
    "season_id",
    "current_global_rank",
    "starting_rating",
    "rating_change",
    "crowns",
    "opp_crowns",
    "king_tower_hp",
    "princess_tower1_hp",
    "princess_tower2_hp",
    "elixir_leaked",
  ];

  fn values(&self) -> Vec<SqlValue> {
    vec![
      self.match_key.as_str().into(),
      self.battle_time.into(),
      self.is_win.into(),
      self.league.into(),
      self.player_id.as_str().into(),
      self.opponent_id.as_str().into(),
      self.season_id.clone().into(),
      self.global_rank.into(),
      self.starting_rating.into(),
      self.rating_change.into(),
      self.crowns.into(),
      self.opp_crowns.into(),
      self.king_tower_hp.into(),
      self.princess_tower1_hp.into(),
      self.princess_tower2_hp.into(),
      self.elixir_leaked.into(),
    ]
  }
}

// ─── MatchCard ───────────────────────────────────────────────────────────────

/// A deck card waiting for its parent match view's surrogate key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingMatchCard {
  pub match_key: String,
  pub player_id: String,
  pub card_id:   String,
}

impl PendingMatchCard {
  pub fn link(self, match_view_id: i64) -> MatchCard {
    MatchCard { match_view_id, player_id: self.player_id, card_id: self.card_id }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchCard {
  pub match_view_id: i64,
  pub player_id:     String,
  pub card_id:       String,
}

impl Record for MatchCard {
  const TABLE: Table = Table::MatchCards;
  const COLUMNS: &'static [&'static str] = &["match_view_id", "player_id", "card_id"];

  fn values(&self) -> Vec<SqlValue> {
    vec![
      self.match_view_id.into(),
      self.player_id.as_str().into(),
      self.card_id.as_str().into(),
    ]
  }
}
