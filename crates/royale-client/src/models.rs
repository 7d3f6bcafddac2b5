//! Wire payloads of the Clash Royale API and their conversion into records.
//!
//! Payloads are deliberately permissive: every field the API may omit is
//! optional or defaulted here, and required-ness is decided during
//! conversion so that a missing field surfaces as a [`FetchError`] instead
//! of a decode failure.

use chrono::{DateTime, NaiveDateTime, Utc};
use royale_core::{
  battle::{Battle, Participant},
  record::{Card, Clan, Player, SeasonRanking},
  source::FetchError,
};
use serde::Deserialize;

/// `battleTime` format, e.g. `20240501T100000.000Z`.
const BATTLE_TIME_FORMAT: &str = "%Y%m%dT%H%M%S%.fZ";

// ─── Player ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerPayload {
  pub tag:                Option<String>,
  #[serde(default)]
  pub name:               String,
  #[serde(default)]
  pub exp_level:          i64,
  #[serde(default)]
  pub trophies:           i64,
  #[serde(default)]
  pub best_trophies:      i64,
  #[serde(default)]
  pub wins:               i64,
  #[serde(default)]
  pub losses:             i64,
  #[serde(default)]
  pub battle_count:       i64,
  #[serde(default)]
  pub challenge_max_wins: i64,
  pub clan:               Option<ClanRef>,
}

#[derive(Debug, Deserialize)]
pub struct ClanRef {
  pub tag: String,
}

impl TryFrom<PlayerPayload> for Player {
  type Error = FetchError;

  fn try_from(p: PlayerPayload) -> Result<Self, Self::Error> {
    let player_id = p.tag.ok_or(FetchError::MissingIdentity("tag"))?;
    Ok(Player {
      player_id,
      player_name: p.name,
      exp_level: p.exp_level,
      trophies: p.trophies,
      best_trophies: p.best_trophies,
      wins: p.wins,
      losses: p.losses,
      battle_count: p.battle_count,
      max_challenge_wins: p.challenge_max_wins,
      clan_id: p.clan.map(|c| c.tag),
    })
  }
}

// ─── Clan ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClanPayload {
  pub tag:               Option<String>,
  #[serde(default)]
  pub name:              String,
  #[serde(default, rename = "type")]
  pub kind:              String,
  #[serde(default)]
  pub badge_id:          i64,
  #[serde(default)]
  pub clan_score:        i64,
  #[serde(default)]
  pub clan_war_trophies: i64,
  pub location:          Option<Location>,
  #[serde(default)]
  pub required_trophies: i64,
  #[serde(default)]
  pub members:           i64,
}

#[derive(Debug, Deserialize)]
pub struct Location {
  pub name: Option<String>,
}

impl TryFrom<ClanPayload> for Clan {
  type Error = FetchError;

  fn try_from(c: ClanPayload) -> Result<Self, Self::Error> {
    let clan_id = c.tag.ok_or(FetchError::MissingIdentity("tag"))?;
    Ok(Clan {
      clan_id,
      clan_name: c.name,
      clan_type: c.kind,
      badge_id: c.badge_id.to_string(),
      clan_score: c.clan_score,
      clan_war_trophies: c.clan_war_trophies,
      location: c.location.and_then(|l| l.name),
      required_trophies: c.required_trophies,
      members: c.members,
    })
  }
}

// ─── Rankings ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Page<T> {
  #[serde(default)]
  pub items: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingEntry {
  pub tag:        Option<String>,
  pub rank:       Option<i64>,
  pub elo_rating: Option<i64>,
}

impl RankingEntry {
  /// `None` when the entry lacks a tag or a rank.
  pub fn into_ranking(self, season_id: &str) -> Option<SeasonRanking> {
    Some(SeasonRanking {
      player_id: self.tag?,
      season_id: season_id.to_owned(),
      rank:      self.rank?,
      rating:    self.elo_rating.unwrap_or_default(),
    })
  }
}

// ─── Cards ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardEntry {
  pub id:                  Option<i64>,
  #[serde(default)]
  pub name:                String,
  #[serde(default)]
  pub rarity:              String,
  pub elixir_cost:         Option<i64>,
  pub max_evolution_level: Option<i64>,
}

impl CardEntry {
  pub fn into_card(self) -> Option<Card> {
    Some(Card {
      card_id:       self.id?.to_string(),
      card_name:     self.name,
      rarity:        self.rarity,
      elixir_cost:   self.elixir_cost,
      has_evolution: self.max_evolution_level.is_some_and(|lvl| lvl > 0),
    })
  }
}

// ─── Battles ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattlePayload {
  pub battle_time:   Option<String>,
  #[serde(default, rename = "type")]
  pub kind:          String,
  pub league_number: Option<i64>,
  #[serde(default)]
  pub team:          Vec<ParticipantPayload>,
  #[serde(default)]
  pub opponent:      Vec<ParticipantPayload>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantPayload {
  pub tag:                        Option<String>,
  pub global_rank:                Option<i64>,
  pub starting_trophies:          Option<i64>,
  pub trophy_change:              Option<i64>,
  #[serde(default)]
  pub crowns:                     i64,
  pub king_tower_hit_points:      Option<i64>,
  pub princess_towers_hit_points: Option<Vec<i64>>,
  pub elixir_leaked:              Option<f64>,
  #[serde(default)]
  pub cards:                      Vec<CardRef>,
}

#[derive(Debug, Deserialize)]
pub struct CardRef {
  pub id: Option<i64>,
}

impl TryFrom<ParticipantPayload> for Participant {
  type Error = FetchError;

  fn try_from(p: ParticipantPayload) -> Result<Self, Self::Error> {
    Ok(Participant {
      tag:                p.tag.ok_or(FetchError::MissingIdentity("tag"))?,
      global_rank:        p.global_rank,
      starting_trophies:  p.starting_trophies,
      trophy_change:      p.trophy_change,
      crowns:             p.crowns,
      king_tower_hp:      p.king_tower_hit_points,
      princess_towers_hp: p.princess_towers_hit_points.unwrap_or_default(),
      elixir_leaked:      p.elixir_leaked,
      card_ids:           p.cards.iter().filter_map(|c| c.id).map(|id| id.to_string()).collect(),
    })
  }
}

pub fn parse_battle_time(raw: &str) -> Result<DateTime<Utc>, FetchError> {
  NaiveDateTime::parse_from_str(raw, BATTLE_TIME_FORMAT)
    .map(|t| t.and_utc())
    .map_err(|e| FetchError::Malformed(format!("battleTime {raw:?}: {e}")))
}

impl TryFrom<BattlePayload> for Battle {
  type Error = FetchError;

  fn try_from(b: BattlePayload) -> Result<Self, Self::Error> {
    let raw_time = b
      .battle_time
      .ok_or_else(|| FetchError::Malformed("battle without battleTime".into()))?;
    let team = b
      .team
      .into_iter()
      .next()
      .ok_or_else(|| FetchError::Malformed("battle without team".into()))?;
    let opponent = b
      .opponent
      .into_iter()
      .next()
      .ok_or_else(|| FetchError::Malformed("battle without opponent".into()))?;

    Ok(Battle {
      battle_time: parse_battle_time(&raw_time)?,
      game_mode:   b.kind,
      league:      b.league_number,
      team:        team.try_into()?,
      opponent:    opponent.try_into()?,
    })
  }
}
