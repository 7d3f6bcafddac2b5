//! Encoding helpers between record descriptions and SQLite statements.
//!
//! Records are flattened into owned [`rusqlite::types::Value`] rows before
//! they cross into the connection thread. Table and column names always come
//! from `'static` record metadata, never from input data.

use rusqlite::types::Value;
use royale_core::record::{Record, SqlValue, Table};

use crate::{Error, Result};

// ─── Values ──────────────────────────────────────────────────────────────────

pub fn encode_value(v: SqlValue) -> Value {
  match v {
    SqlValue::Null => Value::Null,
    SqlValue::Integer(i) => Value::Integer(i),
    SqlValue::Real(f) => Value::Real(f),
    SqlValue::Text(s) => Value::Text(s),
  }
}

/// Flatten `rows` into owned value rows, checking each against `R::COLUMNS`.
pub fn encode_rows<R: Record>(rows: &[R]) -> Result<Vec<Vec<Value>>> {
  rows
    .iter()
    .map(|row| {
      let values = row.values();
      if values.len() != R::COLUMNS.len() {
        return Err(Error::ColumnMismatch {
          table:   R::TABLE,
          columns: R::COLUMNS.len(),
          values:  values.len(),
        });
      }
      Ok(values.into_iter().map(encode_value).collect())
    })
    .collect()
}

// ─── Statements ──────────────────────────────────────────────────────────────

fn placeholders(n: usize) -> String {
  (1..=n).map(|i| format!("?{i}")).collect::<Vec<_>>().join(", ")
}

/// `INSERT INTO table (cols) VALUES (?1, ...)`
pub fn insert_sql(table: Table, columns: &[&str]) -> String {
  format!(
    "INSERT INTO {} ({}) VALUES ({})",
    table.name(),
    columns.join(", "),
    placeholders(columns.len()),
  )
}

/// `INSERT ... ON CONFLICT (keys) DO UPDATE SET col = excluded.col, ...`
///
/// Falls back to `DO NOTHING` when every column is part of the key.
pub fn upsert_sql(table: Table, columns: &[&str]) -> Result<String> {
  let keys = table.key_columns();
  if keys.is_empty() {
    return Err(Error::NoKeyColumns(table));
  }

  let updates: Vec<String> = columns
    .iter()
    .filter(|c| !keys.contains(*c))
    .map(|c| format!("{c} = excluded.{c}"))
    .collect();

  let action = if updates.is_empty() {
    "DO NOTHING".to_owned()
  } else {
    format!("DO UPDATE SET {}", updates.join(", "))
  };

  Ok(format!(
    "{} ON CONFLICT ({}) {action}",
    insert_sql(table, columns),
    keys.join(", "),
  ))
}

#[cfg(test)]
mod tests {
  use royale_core::record::{Card, SeasonRanking};

  use super::*;

  #[test]
  fn upsert_updates_only_non_key_columns() {
    let sql = upsert_sql(Card::TABLE, Card::COLUMNS).unwrap();
    assert!(sql.starts_with("INSERT INTO cards (card_id, card_name"));
    assert!(sql.contains("ON CONFLICT (card_id) DO UPDATE SET card_name = excluded.card_name"));
    assert!(!sql.contains("card_id = excluded.card_id"));
  }

  #[test]
  fn composite_keys_are_listed_in_conflict_target() {
    let sql = upsert_sql(SeasonRanking::TABLE, SeasonRanking::COLUMNS).unwrap();
    assert!(sql.contains("ON CONFLICT (player_id, season_id) DO UPDATE SET rank = excluded.rank"));
  }

  #[test]
  fn upsert_without_key_is_rejected() {
    let err = upsert_sql(Table::Matches, &["match_key"]).unwrap_err();
    assert!(matches!(err, Error::NoKeyColumns(Table::Matches)));
  }

  #[test]
  fn insert_numbers_placeholders() {
    let sql = insert_sql(Table::MatchCards, &["match_view_id", "player_id", "card_id"]);
    assert_eq!(
      sql,
      "INSERT INTO match_cards (match_view_id, player_id, card_id) VALUES (?1, ?2, ?3)"
    );
  }
}
