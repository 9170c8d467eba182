//! Date-time epoch for the magnetic field model

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Epoch validation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EpochError {
    #[error("invalid calendar date-time {year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}")]
    InvalidDateTime {
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        second: u32,
    },
    #[error("epoch year {year} outside supported range [{min}, {max})")]
    OutOfRange { year: i32, min: i32, max: i32 },
}

/// Date-time at which conversions are evaluated
///
/// Set once by the caller before a batch and shared read-only by every sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochContext {
    datetime: NaiveDateTime,
}

impl EpochContext {
    pub fn new(
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        second: u32,
    ) -> Result<Self, EpochError> {
        NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|date| date.and_hms_opt(hour, minute, second))
            .map(|datetime| Self { datetime })
            .ok_or(EpochError::InvalidDateTime {
                year,
                month,
                day,
                hour,
                minute,
                second,
            })
    }

    pub fn from_datetime(datetime: NaiveDateTime) -> Self {
        Self { datetime }
    }

    pub fn datetime(&self) -> NaiveDateTime {
        self.datetime
    }

    pub fn year(&self) -> i32 {
        self.datetime.year()
    }

    /// Year plus the elapsed fraction of that year
    pub fn decimal_year(&self) -> f64 {
        let year = self.datetime.year();
        let days_in_year = if NaiveDate::from_ymd_opt(year, 2, 29).is_some() {
            366.0
        } else {
            365.0
        };
        let seconds_of_day = f64::from(self.datetime.num_seconds_from_midnight());
        let day_fraction = (f64::from(self.datetime.ordinal0()) + seconds_of_day / 86_400.0) / days_in_year;
        f64::from(year) + day_fraction
    }

    /// Fail unless the epoch year lies in `[min_year, max_year)`
    pub fn ensure_year_in(&self, min_year: i32, max_year: i32) -> Result<(), EpochError> {
        let year = self.year();
        if year < min_year || year >= max_year {
            return Err(EpochError::OutOfRange {
                year,
                min: min_year,
                max: max_year,
            });
        }
        Ok(())
    }
}
