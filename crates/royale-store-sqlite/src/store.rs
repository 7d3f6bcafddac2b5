//! [`SqliteStore`]: the SQLite implementation of [`WarehouseStore`] and
//! [`QuarantineRepository`].

use std::{collections::BTreeSet, path::Path};

use chrono::Utc;
use royale_core::{
  quarantine::QuarantineRepository,
  record::{Record, Table},
  store::{Deletion, MatchViewKey, WarehouseStore},
};

use crate::{
  encode::{encode_rows, insert_sql, upsert_sql},
  schema::SCHEMA,
  Result,
};

/// SQLite caps bound parameters per statement; `IN (...)` lookups are chunked
/// below that.
const LOOKUP_CHUNK: usize = 500;

// ─── Store ───────────────────────────────────────────────────────────────────

/// A warehouse backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Number of rows currently in `table`.
  pub async fn row_count(&self, table: Table) -> Result<usize> {
    let sql = format!("SELECT COUNT(*) FROM {}", table.name());
    let count: i64 = self
      .conn
      .call(move |conn| Ok(conn.query_row(&sql, [], |r| r.get(0))?))
      .await?;
    Ok(usize::try_from(count).unwrap_or_default())
  }

  /// Run `sql` once per value row inside a single transaction.
  async fn write_batch(&self, sql: String, rows: Vec<Vec<rusqlite::types::Value>>) -> Result<usize> {
    if rows.is_empty() {
      return Ok(0);
    }

    let written = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut written = 0;
        {
          let mut stmt = tx.prepare(&sql)?;
          for row in &rows {
            written += stmt.execute(rusqlite::params_from_iter(row.iter()))?;
          }
        }
        tx.commit()?;
        Ok(written)
      })
      .await?;
    Ok(written)
  }
}

// ─── WarehouseStore impl ─────────────────────────────────────────────────────

impl WarehouseStore for SqliteStore {
  type Error = crate::Error;

  async fn select_distinct(&self, table: Table, column: &'static str) -> Result<Vec<String>> {
    let sql = format!(
      "SELECT DISTINCT {column} FROM {} WHERE {column} IS NOT NULL ORDER BY {column}",
      table.name()
    );

    let values = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], |row| row.get::<_, String>(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(values)
  }

  async fn insert_append<R: Record>(&self, rows: &[R]) -> Result<usize> {
    let encoded = encode_rows(rows)?;
    self.write_batch(insert_sql(R::TABLE, R::COLUMNS), encoded).await
  }

  async fn merge_upsert<R: Record>(&self, rows: &[R]) -> Result<usize> {
    let sql = upsert_sql(R::TABLE, R::COLUMNS)?;
    let encoded = encode_rows(rows)?;
    self.write_batch(sql, encoded).await
  }

  async fn execute_delete(&self, deletions: &[Deletion]) -> Result<Vec<usize>> {
    let statements: Vec<(String, String)> = deletions
      .iter()
      .map(|d| {
        (
          format!("DELETE FROM {} WHERE {} = ?1", d.table.name(), d.column),
          d.value.clone(),
        )
      })
      .collect();

    let counts = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut counts = Vec::with_capacity(statements.len());
        for (sql, value) in &statements {
          counts.push(tx.execute(sql, rusqlite::params![value])?);
        }
        tx.commit()?;
        Ok(counts)
      })
      .await?;
    Ok(counts)
  }

  async fn select_match_views(&self, keys: &[String]) -> Result<Vec<MatchViewKey>> {
    let chunks: Vec<Vec<String>> = keys.chunks(LOOKUP_CHUNK).map(<[String]>::to_vec).collect();

    let mut mapping = self
      .conn
      .call(move |conn| {
        let mut mapping = Vec::new();
        for chunk in &chunks {
          let sql = format!(
            "SELECT match_view_id, match_key FROM matches WHERE match_key IN ({})",
            vec!["?"; chunk.len()].join(", ")
          );
          let mut stmt = conn.prepare(&sql)?;
          let rows = stmt
            .query_map(rusqlite::params_from_iter(chunk.iter()), |row| {
              Ok(MatchViewKey {
                match_view_id: row.get(0)?,
                match_key:     row.get(1)?,
              })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          mapping.extend(rows);
        }
        Ok(mapping)
      })
      .await?;

    mapping.sort_by_key(|m| m.match_view_id);
    Ok(mapping)
  }
}

// ─── QuarantineRepository impl ───────────────────────────────────────────────

impl QuarantineRepository for SqliteStore {
  type Error = crate::Error;

  async fn load(&self) -> Result<BTreeSet<String>> {
    let ids = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare("SELECT player_id FROM quarantined_players")?;
        let ids = stmt
          .query_map([], |row| row.get::<_, String>(0))?
          .collect::<rusqlite::Result<BTreeSet<_>>>()?;
        Ok(ids)
      })
      .await?;
    Ok(ids)
  }

  async fn persist(&self, ids: &BTreeSet<String>) -> Result<()> {
    let ids: Vec<String> = ids.iter().cloned().collect();
    let at = Utc::now().to_rfc3339();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt = tx.prepare(
            "INSERT OR IGNORE INTO quarantined_players (player_id, quarantined_at) VALUES (?1, ?2)",
          )?;
          for id in &ids {
            stmt.execute(rusqlite::params![id, at])?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
