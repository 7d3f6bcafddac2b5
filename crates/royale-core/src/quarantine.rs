//! Quarantine: the persisted set of player ids that are never fetched again.
//!
//! The set is append-only. [`QuarantineTracker`] loads it once at the start
//! of a run, answers membership queries before every per-player fetch, and
//! flushes new members to its [`QuarantineRepository`] before returning from
//! [`QuarantineTracker::record_failures`], so that later stages never run
//! ahead of what has been persisted.

use std::{collections::BTreeSet, future::Future};

use serde::{Deserialize, Serialize};

use crate::source::FetchError;

// ─── Policy ──────────────────────────────────────────────────────────────────

/// Which player-fetch failures lead to quarantine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuarantinePolicy {
  /// Every failure is treated as permanent.
  #[default]
  AllFailures,
  /// Only failures that signal a deleted or banned account.
  PermanentOnly,
}

impl QuarantinePolicy {
  pub fn should_quarantine(self, failure: &FetchError) -> bool {
    match self {
      Self::AllFailures => true,
      Self::PermanentOnly => failure.is_permanent(),
    }
  }
}

// ─── Repository ──────────────────────────────────────────────────────────────

/// Durable storage for the quarantine set.
pub trait QuarantineRepository: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Read every quarantined id.
  fn load(&self) -> impl Future<Output = Result<BTreeSet<String>, Self::Error>> + Send + '_;

  /// Merge `ids` into the persisted set. Existing members are kept.
  fn persist<'a>(
    &'a self,
    ids: &'a BTreeSet<String>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}

// ─── Tracker ─────────────────────────────────────────────────────────────────

pub struct QuarantineTracker<R> {
  repo:    R,
  members: BTreeSet<String>,
}

impl<R: QuarantineRepository> QuarantineTracker<R> {
  pub async fn load(repo: R) -> Result<Self, R::Error> {
    let members = repo.load().await?;
    Ok(Self { repo, members })
  }

  pub fn is_quarantined(&self, player_id: &str) -> bool { self.members.contains(player_id) }

  pub fn len(&self) -> usize { self.members.len() }

  pub fn is_empty(&self) -> bool { self.members.is_empty() }

  /// Every quarantined id, sorted.
  pub fn members(&self) -> impl Iterator<Item = &str> { self.members.iter().map(String::as_str) }

  /// Union `ids` into the set and flush the additions.
  ///
  /// Returns the ids that were not already quarantined, sorted. Nothing is
  /// written when every id is already a member.
  pub async fn record_failures<I>(&mut self, ids: I) -> Result<Vec<String>, R::Error>
  where
    I: IntoIterator<Item = String>,
  {
    let added: BTreeSet<String> = ids
      .into_iter()
      .filter(|id| !self.members.contains(id))
      .collect();

    if added.is_empty() {
      return Ok(Vec::new());
    }

    self.repo.persist(&added).await?;
    self.members.extend(added.iter().cloned());
    Ok(added.into_iter().collect())
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
  };

  use super::*;

  #[derive(Default)]
  struct MemoryRepo {
    ids:     Mutex<BTreeSet<String>>,
    flushes: AtomicUsize,
  }

  impl QuarantineRepository for &MemoryRepo {
    type Error = std::io::Error;

    async fn load(&self) -> Result<BTreeSet<String>, Self::Error> {
      Ok(self.ids.lock().unwrap().clone())
    }

    async fn persist(&self, ids: &BTreeSet<String>) -> Result<(), Self::Error> {
      self.flushes.fetch_add(1, Ordering::SeqCst);
      self.ids.lock().unwrap().extend(ids.iter().cloned());
      Ok(())
    }
  }

  fn ids(raw: &[&str]) -> Vec<String> { raw.iter().map(|s| s.to_string()).collect() }

  #[tokio::test]
  async fn recorded_failures_are_flushed_and_visible() {
    let repo = MemoryRepo::default();
    let mut tracker = QuarantineTracker::load(&repo).await.unwrap();

    let added = tracker.record_failures(ids(&["#B", "#A"])).await.unwrap();
    assert_eq!(added, ["#A", "#B"]);
    assert!(tracker.is_quarantined("#A"));
    assert_eq!(repo.ids.lock().unwrap().len(), 2);
    assert_eq!(repo.flushes.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn recording_is_idempotent() {
    let repo = MemoryRepo::default();
    let mut tracker = QuarantineTracker::load(&repo).await.unwrap();

    tracker.record_failures(ids(&["#A"])).await.unwrap();
    let again = tracker.record_failures(ids(&["#A"])).await.unwrap();
    assert!(again.is_empty());
    assert_eq!(tracker.len(), 1);
    assert_eq!(repo.flushes.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn membership_survives_reload_and_only_grows() {
    let repo = MemoryRepo::default();
    {
      let mut tracker = QuarantineTracker::load(&repo).await.unwrap();
      tracker.record_failures(ids(&["#A"])).await.unwrap();
    }
    let mut tracker = QuarantineTracker::load(&repo).await.unwrap();
    assert!(tracker.is_quarantined("#A"));

    tracker.record_failures(ids(&["#B"])).await.unwrap();
    assert!(tracker.is_quarantined("#A"));
    assert!(tracker.is_quarantined("#B"));
  }

  #[test]
  fn policy_controls_classification() {
    let transient = FetchError::Transport("connection reset".into());
    let gone = FetchError::Status(404);
    assert!(QuarantinePolicy::AllFailures.should_quarantine(&transient));
    assert!(!QuarantinePolicy::PermanentOnly.should_quarantine(&transient));
    assert!(QuarantinePolicy::PermanentOnly.should_quarantine(&gone));
  }
}
