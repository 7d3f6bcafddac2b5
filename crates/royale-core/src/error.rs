//! Error types for `royale-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("season start hour must be between 0 and 23, got {0}")]
  InvalidStartHour(u32),

  #[error("season calendar out of range at month index {0}")]
  CalendarOutOfRange(i32),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
