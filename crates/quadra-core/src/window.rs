//! Per-domain working-hours windows.
//!
//! A domain's tasks may only be placed inside that domain's daily working
//! window (default 09:00-17:00). Sleep and non-domain hours are never
//! candidate time. Windows may overlap between domains; the conflict
//! detector, not the windows, prevents double-booking.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::Domain;
use crate::error::ConfigError;

/// One domain's daily working window, `[open, close)` in wall-clock time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkingWindow {
    pub open: NaiveTime,
    pub close: NaiveTime,
}

impl WorkingWindow {
    /// Window from open/close times; close must be after open (windows
    /// do not wrap midnight).
    pub fn new(open: NaiveTime, close: NaiveTime) -> Result<Self, ConfigError> {
        if close <= open {
            return Err(ConfigError::InvalidValue {
                key: "working_window".to_string(),
                message: format!("close ({close}) must be after open ({open})"),
            });
        }
        Ok(Self { open, close })
    }

    /// Parse from "HH:MM" strings.
    pub fn parse(open: &str, close: &str) -> Result<Self, ConfigError> {
        let parse_one = |value: &str| {
            NaiveTime::parse_from_str(value, "%H:%M").map_err(|e| ConfigError::InvalidValue {
                key: "working_window".to_string(),
                message: format!("bad time '{value}': {e}"),
            })
        };
        Self::new(parse_one(open)?, parse_one(close)?)
    }

    /// Concrete UTC bounds of this window on a given day.
    pub fn bounds_on(&self, day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        (
            day.and_time(self.open).and_utc(),
            day.and_time(self.close).and_utc(),
        )
    }

    /// Window length in minutes.
    pub fn minutes(&self) -> i64 {
        (self.close - self.open).num_minutes()
    }
}

impl Default for WorkingWindow {
    fn default() -> Self {
        Self {
            open: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            close: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
        }
    }
}

/// Working windows for all four domains.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct WorkingHours {
    pub academic: WorkingWindow,
    pub income: WorkingWindow,
    pub growth: WorkingWindow,
    pub life: WorkingWindow,
}

impl WorkingHours {
    /// The window for a domain.
    pub fn window(&self, domain: Domain) -> WorkingWindow {
        match domain {
            Domain::Academic => self.academic,
            Domain::Income => self.income,
            Domain::Growth => self.growth,
            Domain::Life => self.life,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_window_is_nine_to_five() {
        let window = WorkingWindow::default();
        assert_eq!(window.open, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(window.close, NaiveTime::from_hms_opt(17, 0, 0).unwrap());
        assert_eq!(window.minutes(), 480);
    }

    #[test]
    fn parse_rejects_inverted_window() {
        assert!(WorkingWindow::parse("17:00", "09:00").is_err());
        assert!(WorkingWindow::parse("09:00", "09:00").is_err());
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(WorkingWindow::parse("9am", "5pm").is_err());
    }

    #[test]
    fn bounds_land_on_the_requested_day() {
        let window = WorkingWindow::parse("06:00", "10:00").unwrap();
        let day = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let (start, end) = window.bounds_on(day);
        assert_eq!(start.date_naive(), day);
        assert_eq!((end - start).num_minutes(), 240);
    }

    #[test]
    fn per_domain_lookup() {
        let mut hours = WorkingHours::default();
        hours.academic = WorkingWindow::parse("06:00", "10:00").unwrap();
        assert_eq!(hours.window(Domain::Academic).minutes(), 240);
        assert_eq!(hours.window(Domain::Life).minutes(), 480);
    }
}
