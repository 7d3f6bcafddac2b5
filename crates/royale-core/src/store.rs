//! The `WarehouseStore` trait and supporting types.
//!
//! The trait is implemented by storage backends (e.g. `royale-store-sqlite`).
//! The pipeline depends on this abstraction, not on any concrete backend.
//! Every write method runs as a single transaction: a batch either commits
//! in full or not at all.

use std::future::Future;

use crate::record::{Record, Table};

// ─── Supporting types ────────────────────────────────────────────────────────

/// Delete every row of `table` whose `column` equals `value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deletion {
  pub table:  Table,
  pub column: &'static str,
  pub value:  String,
}

/// One row of the surrogate-key mapping of the `matches` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchViewKey {
  pub match_view_id: i64,
  pub match_key:     String,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the relational warehouse.
pub trait WarehouseStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Distinct non-null values of a text `column`, ascending.
  fn select_distinct(
    &self,
    table: Table,
    column: &'static str,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + '_;

  /// Append `rows` to `R::TABLE`. Returns the number of rows written.
  fn insert_append<'a, R: Record>(
    &'a self,
    rows: &'a [R],
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + 'a;

  /// Merge `rows` into `R::TABLE` on its key columns: update every non-key
  /// column of matching rows, insert the rest. Returns the number of rows
  /// written.
  fn merge_upsert<'a, R: Record>(
    &'a self,
    rows: &'a [R],
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + 'a;

  /// Execute `deletions` in order, in one transaction. Returns the number of
  /// rows removed by each deletion.
  fn execute_delete<'a>(
    &'a self,
    deletions: &'a [Deletion],
  ) -> impl Future<Output = Result<Vec<usize>, Self::Error>> + Send + 'a;

  /// Surrogate keys of every stored match view whose `match_key` is in
  /// `keys`, ordered by surrogate key.
  fn select_match_views<'a>(
    &'a self,
    keys: &'a [String],
  ) -> impl Future<Output = Result<Vec<MatchViewKey>, Self::Error>> + Send + 'a;
}
