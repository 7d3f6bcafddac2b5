//! Season window arithmetic.
//!
//! A season starts on the first Monday of a calendar month at a fixed UTC
//! hour and runs until one second before the next month's start. Windows are
//! addressed by a month index (`year * 12 + month0`) so that rollover across
//! years is plain integer arithmetic.

use chrono::{DateTime, Datelike, NaiveDate, TimeDelta, Utc, Weekday};

use crate::{Error, Result, record::Season};

/// Pure calculator for season windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeasonCalendar {
  start_hour: u32,
}

impl Default for SeasonCalendar {
  fn default() -> Self { Self { start_hour: 9 } }
}

impl SeasonCalendar {
  pub fn new(start_hour: u32) -> Result<Self> {
    if start_hour > 23 {
      return Err(Error::InvalidStartHour(start_hour));
    }
    Ok(Self { start_hour })
  }

  /// Start of the window whose reset falls in the month with `index`.
  fn window_start(&self, index: i32) -> Result<DateTime<Utc>> {
    let year = index.div_euclid(12);
    let month = index.rem_euclid(12) as u32 + 1;
    NaiveDate::from_weekday_of_month_opt(year, month, Weekday::Mon, 1)
      .and_then(|monday| monday.and_hms_opt(self.start_hour, 0, 0))
      .map(|naive| naive.and_utc())
      .ok_or(Error::CalendarOutOfRange(index))
  }

  fn window(&self, index: i32) -> Result<Season> {
    let start = self.window_start(index)?;
    let end = self.window_start(index + 1)? - TimeDelta::seconds(1);
    Ok(Season { season_id: start.format("%Y-%m").to_string(), start, end })
  }

  /// Index of the window that contains `t`.
  fn index_of(&self, t: DateTime<Utc>) -> Result<i32> {
    let index = t.year() * 12 + t.month0() as i32;
    if t < self.window_start(index)? { Ok(index - 1) } else { Ok(index) }
  }

  /// The window that is open at `reference`.
  pub fn current_window(&self, reference: DateTime<Utc>) -> Result<Season> {
    self.window(self.index_of(reference)?)
  }

  /// The `n` most recently completed windows, oldest first.
  ///
  /// A window is completed when its end lies strictly before `reference`,
  /// which holds for every window before the currently open one.
  pub fn past_windows(&self, reference: DateTime<Utc>, n: usize) -> Result<Vec<Season>> {
    let current = self.index_of(reference)?;
    let first = i32::try_from(n)
      .ok()
      .and_then(|n| current.checked_sub(n))
      .ok_or(Error::CalendarOutOfRange(current))?;
    (first..current).map(|i| self.window(i)).collect()
  }

  /// The currently open window followed by up to `n` future windows.
  pub fn current_and_future_windows(
    &self,
    reference: DateTime<Utc>,
    n: usize,
  ) -> Result<Vec<Season>> {
    let current = self.index_of(reference)?;
    let last = i32::try_from(n)
      .ok()
      .and_then(|n| current.checked_add(n))
      .ok_or(Error::CalendarOutOfRange(current))?;
    (current..=last).map(|i| self.window(i)).collect()
  }

  /// Build a lookup over `past` completed windows plus the current window and
  /// `future` windows after it.
  pub fn lookup(
    &self,
    reference: DateTime<Utc>,
    past: usize,
    future: usize,
  ) -> Result<SeasonLookup> {
    let mut windows = self.past_windows(reference, past)?;
    for window in self.current_and_future_windows(reference, future)? {
      if !windows.iter().any(|w| w.season_id == window.season_id) {
        windows.push(window);
      }
    }
    Ok(SeasonLookup { windows })
  }
}

/// A bounded, ordered set of windows used to assign timestamps to seasons.
#[derive(Debug, Clone)]
pub struct SeasonLookup {
  windows: Vec<Season>,
}

impl SeasonLookup {
  /// The id of the first window containing `t`, or `None` when `t` lies
  /// outside every known window.
  pub fn season_id_for(&self, t: DateTime<Utc>) -> Option<&str> {
    self
      .windows
      .iter()
      .find(|w| w.contains(t))
      .map(|w| w.season_id.as_str())
  }

  pub fn windows(&self) -> &[Season] { &self.windows }
}
