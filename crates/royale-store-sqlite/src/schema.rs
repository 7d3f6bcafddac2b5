//! SQL schema for the Royale SQLite warehouse.
//!
//! Executed once at connection startup. Schema migration is out of scope;
//! `PRAGMA user_version` records the layout the file was created with.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
///
/// Tables are declared in foreign-key dependency order, mirroring
/// [`royale_core::record::Table`].
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Season windows are immutable once inserted.
CREATE TABLE IF NOT EXISTS seasons (
    season_id     TEXT PRIMARY KEY,   -- 'YYYY-MM' of the window start
    sn_start_date TEXT NOT NULL,      -- RFC 3339 UTC
    sn_end_date   TEXT NOT NULL       -- next window start minus one second
);

CREATE TABLE IF NOT EXISTS clans (
    clan_id           TEXT PRIMARY KEY,
    clan_name         TEXT NOT NULL,
    clan_type         TEXT NOT NULL,
    badge_id          TEXT NOT NULL,
    clan_score        INTEGER NOT NULL,
    clan_war_trophies INTEGER NOT NULL,
    clan_location     TEXT,
    required_trophies INTEGER NOT NULL,
    members           INTEGER NOT NULL,
    url_encoded_cid   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS players (
    player_id          TEXT PRIMARY KEY,
    player_name        TEXT NOT NULL,
    exp_lvl            INTEGER NOT NULL,
    road_trophies      INTEGER NOT NULL,
    best_road_trophies INTEGER NOT NULL,
    wins               INTEGER NOT NULL,
    losses             INTEGER NOT NULL,
    life_time_battles  INTEGER NOT NULL,
    max_challenge_wins INTEGER NOT NULL,
    clan_id            TEXT REFERENCES clans(clan_id),
    url_encoded_pid    TEXT NOT NULL
);

-- Closed-season leaderboards; insert-only.
CREATE TABLE IF NOT EXISTS season_rankings (
    player_id TEXT NOT NULL REFERENCES players(player_id),
    season_id TEXT NOT NULL REFERENCES seasons(season_id),
    rank      INTEGER NOT NULL,
    rating    INTEGER NOT NULL,
    PRIMARY KEY (player_id, season_id)
);

CREATE TABLE IF NOT EXISTS cards (
    card_id     TEXT PRIMARY KEY,
    card_name   TEXT NOT NULL,
    rarity      TEXT NOT NULL,
    elixir_cost INTEGER,
    evo_status  INTEGER NOT NULL DEFAULT 0
);

-- One row per participant perspective of a battle. match_key is not unique.
CREATE TABLE IF NOT EXISTS matches (
    match_view_id       INTEGER PRIMARY KEY AUTOINCREMENT,
    match_key           TEXT NOT NULL,
    battle_time         TEXT NOT NULL,
    is_win              INTEGER NOT NULL,
    league              INTEGER,
    player_id           TEXT NOT NULL REFERENCES players(player_id),
    opponent_id         TEXT NOT NULL,
    season_id           TEXT REFERENCES seasons(season_id),
    current_global_rank INTEGER,
    starting_rating     INTEGER,
    rating_change       INTEGER,
    crowns              INTEGER NOT NULL,
    opp_crowns          INTEGER NOT NULL,
    king_tower_hp       INTEGER,
    princess_tower1_hp  INTEGER NOT NULL,
    princess_tower2_hp  INTEGER NOT NULL,
    elixir_leaked       REAL
);

CREATE TABLE IF NOT EXISTS match_cards (
    match_view_id INTEGER NOT NULL REFERENCES matches(match_view_id),
    player_id     TEXT NOT NULL REFERENCES players(player_id),
    card_id       TEXT NOT NULL REFERENCES cards(card_id)
);

-- Append-only; rows are never deleted.
CREATE TABLE IF NOT EXISTS quarantined_players (
    player_id      TEXT PRIMARY KEY,
    quarantined_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS matches_key_idx         ON matches(match_key);
CREATE INDEX IF NOT EXISTS matches_player_idx      ON matches(player_id);
CREATE INDEX IF NOT EXISTS match_cards_view_idx    ON match_cards(match_view_id);
CREATE INDEX IF NOT EXISTS match_cards_player_idx  ON match_cards(player_id);
CREATE INDEX IF NOT EXISTS rankings_season_idx     ON season_rankings(season_id);

PRAGMA user_version = 1;
";
