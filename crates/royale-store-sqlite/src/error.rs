//! Error type for `royale-store-sqlite`.

use royale_core::record::Table;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  /// A merge-upsert was requested for a table without a natural key.
  #[error("table {0} has no key columns to merge on")]
  NoKeyColumns(Table),

  /// A record produced a different number of values than it has columns.
  #[error("{table} row has {values} values for {columns} columns")]
  ColumnMismatch {
    table:   Table,
    columns: usize,
    values:  usize,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
