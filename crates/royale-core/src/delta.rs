//! Delta resolution: which remote identifiers are not yet persisted.

use std::collections::HashSet;

/// A snapshot of the identifiers already persisted for one entity type.
#[derive(Debug, Clone, Default)]
pub struct Delta {
  persisted: HashSet<String>,
}

impl Delta {
  pub fn against<I>(persisted: I) -> Self
  where
    I: IntoIterator<Item = String>,
  {
    Self { persisted: persisted.into_iter().collect() }
  }

  pub fn contains(&self, key: &str) -> bool { self.persisted.contains(key) }

  /// Candidates absent from the snapshot, in first-seen order, each at most
  /// once.
  pub fn new_keys<'a, I>(&self, candidates: I) -> Vec<String>
  where
    I: IntoIterator<Item = &'a str>,
  {
    let mut seen = HashSet::new();
    candidates
      .into_iter()
      .filter(|c| !self.persisted.contains(*c) && seen.insert(*c))
      .map(str::to_owned)
      .collect()
  }

  /// Keep the rows whose key is absent from the snapshot.
  pub fn retain_new<T, F>(&self, mut rows: Vec<T>, key: F) -> Vec<T>
  where
    F: Fn(&T) -> &str,
  {
    rows.retain(|row| !self.persisted.contains(key(row)));
    rows
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn delta(keys: &[&str]) -> Delta { Delta::against(keys.iter().map(|k| k.to_string())) }

  #[test]
  fn returns_candidates_not_yet_persisted() {
    let d = delta(&["2024-01"]);
    let new = d.new_keys(["2024-01", "2024-02", "2024-03"]);
    assert_eq!(new, ["2024-02", "2024-03"]);
  }

  #[test]
  fn resolution_is_idempotent() {
    let d = delta(&["a", "c"]);
    let candidates = ["a", "b", "c", "d"];
    assert_eq!(d.new_keys(candidates), d.new_keys(candidates));
  }

  #[test]
  fn duplicate_candidates_are_reported_once() {
    let d = delta(&[]);
    assert_eq!(d.new_keys(["x", "y", "x"]), ["x", "y"]);
  }

  #[test]
  fn everything_persisted_yields_empty_delta() {
    let d = delta(&["a", "b"]);
    assert!(d.new_keys(["b", "a"]).is_empty());
  }

  #[test]
  fn retain_new_filters_rows_by_key() {
    let d = delta(&["k1"]);
    let rows = vec![("k1", 1), ("k2", 2), ("k3", 3)];
    let kept = d.retain_new(rows, |r| r.0);
    assert_eq!(kept, [("k2", 2), ("k3", 3)]);
  }
}
