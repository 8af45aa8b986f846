use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::time::Weekday;

/// Rejected slot grid configurations.
#[derive(Serialize, Error, Debug, Eq, PartialEq)]
pub enum ConfigError {
    #[error("an interval of {0} minutes does not divide an hour evenly")]
    UnevenInterval(u16),
    #[error("daily window {start}:00..{end}:00 is empty or outside the day")]
    EmptyWindow { start: u8, end: u8 },
    #[error("no days of the week are allowed")]
    NoAllowedDays,
}

/// The discretization grid: how finely availability is sliced, and the daily
/// window and weekdays a slot may fall in.
///
/// Defaults are 10-minute slots between 09:00 and 21:00 on any day of the
/// week, giving a keyspace of 7 * 12 * 6 = 504 slot keys.
///
/// # Examples
/// ```
/// use treffzeit::config::GridConfig;
///
/// let config = GridConfig::default();
/// assert_eq!(config.interval_minutes, 10);
/// assert_eq!(config.slots_per_hour(), 6);
/// assert_eq!(config.keyspace_size(), 504);
/// assert!(config.validate().is_ok());
///
/// let halves = GridConfig::default()
///     .with_interval_minutes(30)
///     .with_window(9, 19);
/// assert_eq!(halves.window_slots_per_day(), 20);
/// ```
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct GridConfig {
    /// Width of one slot in minutes. Must divide 60.
    pub interval_minutes: u16,
    /// First hour of the day that may hold slots (inclusive).
    pub window_start_hour: u8,
    /// Hour the window ends at (exclusive).
    pub window_end_hour: u8,
    /// Days of the week slots may fall on.
    pub allowed_days: Vec<Weekday>,
}

impl Default for GridConfig {
    fn default() -> GridConfig {
        GridConfig {
            interval_minutes: 10,
            window_start_hour: 9,
            window_end_hour: 21,
            allowed_days: Weekday::ALL.to_vec(),
        }
    }
}

impl GridConfig {
    pub fn new() -> GridConfig {
        GridConfig::default()
    }

    pub fn with_interval_minutes(mut self, interval_minutes: u16) -> GridConfig {
        self.interval_minutes = interval_minutes;
        self
    }

    pub fn with_window(mut self, start_hour: u8, end_hour: u8) -> GridConfig {
        self.window_start_hour = start_hour;
        self.window_end_hour = end_hour;
        self
    }

    pub fn with_allowed_days(mut self, days: Vec<Weekday>) -> GridConfig {
        self.allowed_days = days;
        self
    }

    /// Checks the grid is usable: the interval tiles an hour exactly, the
    /// window is a non-empty part of one day, and at least one day is allowed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_minutes == 0
            || self.interval_minutes > 60
            || 60 % self.interval_minutes != 0
        {
            return Err(ConfigError::UnevenInterval(self.interval_minutes));
        }
        if self.window_start_hour >= self.window_end_hour || self.window_end_hour > 24 {
            return Err(ConfigError::EmptyWindow {
                start: self.window_start_hour,
                end: self.window_end_hour,
            });
        }
        if self.allowed_days.is_empty() {
            return Err(ConfigError::NoAllowedDays);
        }
        Ok(())
    }

    pub fn slots_per_hour(&self) -> u16 {
        60 / self.interval_minutes
    }

    /// First minute of the day inside the window (inclusive).
    pub fn window_start_minute(&self) -> u16 {
        u16::from(self.window_start_hour) * 60
    }

    /// First minute of the day past the window (exclusive).
    pub fn window_end_minute(&self) -> u16 {
        u16::from(self.window_end_hour) * 60
    }

    pub fn window_slots_per_day(&self) -> u16 {
        (self.window_end_minute() - self.window_start_minute()) / self.interval_minutes
    }

    /// Total number of distinct slot keys this grid can produce.
    pub fn keyspace_size(&self) -> usize {
        self.allowed_days.len() * usize::from(self.window_slots_per_day())
    }

    pub fn day_allowed(&self, day: Weekday) -> bool {
        self.allowed_days.contains(&day)
    }
}
