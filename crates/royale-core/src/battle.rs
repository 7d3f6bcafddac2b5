//! Battles as returned by a player's battle log, and their normalisation into
//! match views and pending deck cards.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  record::{Match, PendingMatchCard},
  season::SeasonLookup,
};

/// Game mode name of the ranked ladder; only these battles are kept.
pub const RANKED_LADDER_MODE: &str = "pathOfLegend";

/// One side of a battle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Participant {
  pub tag:                String,
  pub global_rank:        Option<i64>,
  pub starting_trophies:  Option<i64>,
  pub trophy_change:      Option<i64>,
  pub crowns:             i64,
  pub king_tower_hp:      Option<i64>,
  pub princess_towers_hp: Vec<i64>,
  pub elixir_leaked:      Option<f64>,
  pub card_ids:           Vec<String>,
}

/// A battle from the log owner's (`team`) perspective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Battle {
  pub battle_time: DateTime<Utc>,
  pub game_mode:   String,
  pub league:      Option<i64>,
  pub team:        Participant,
  pub opponent:    Participant,
}

/// A match view plus the deck cards that still need its surrogate key.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchView {
  pub record: Match,
  pub deck:   Vec<PendingMatchCard>,
}

/// Deterministic identity of a match view: battle time plus the perspective's
/// player tag. Both participants of one battle produce different keys.
pub fn match_key(battle_time: DateTime<Utc>, player_id: &str) -> String {
  format!(
    "{}_{player_id}",
    battle_time.to_rfc3339_opts(SecondsFormat::Secs, true)
  )
}

impl Battle {
  pub fn is_ranked_ladder(&self) -> bool { self.game_mode == RANKED_LADDER_MODE }

  pub fn into_match_view(self, seasons: &SeasonLookup) -> MatchView {
    let key = match_key(self.battle_time, &self.team.tag);
    let tower = |i: usize| self.team.princess_towers_hp.get(i).copied().unwrap_or(0);

    let record = Match {
      match_key:          key.clone(),
      battle_time:        self.battle_time,
      is_win:             self.team.crowns > self.opponent.crowns,
      league:             self.league,
      player_id:          self.team.tag.clone(),
      opponent_id:        self.opponent.tag.clone(),
      season_id:          seasons.season_id_for(self.battle_time).map(str::to_owned),
      global_rank:        self.team.global_rank,
      starting_rating:    self.team.starting_trophies,
      rating_change:      self.team.trophy_change,
      crowns:             self.team.crowns,
      opp_crowns:         self.opponent.crowns,
      king_tower_hp:      self.team.king_tower_hp,
      princess_tower1_hp: tower(0),
      princess_tower2_hp: tower(1),
      elixir_leaked:      self.team.elixir_leaked,
    };

    let deck = self
      .team
      .card_ids
      .iter()
      .map(|card_id| PendingMatchCard {
        match_key: key.clone(),
        player_id: self.team.tag.clone(),
        card_id:   card_id.clone(),
      })
      .collect();

    MatchView { record, deck }
  }
}
