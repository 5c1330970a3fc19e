use std::fmt;

use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};

use crate::error::{Error, Result};

/// Hour at which the observing night label changes to the current date.
const NIGHT_BOUNDARY_HOUR: u32 = 12;

/// The evening date an observation session is filed under.
///
/// A night spans local midnight, so anything recorded before noon belongs to
/// the previous calendar date. Displays as `YYYYMMDD`, the directory name in
/// the calibration store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObservingNight(pub NaiveDate);

impl ObservingNight {
    /// Parse a `DATE-OBS` value (`YYYY-MM-DDTHH:MM:SS`, optional fractional seconds).
    pub fn from_timestamp(value: &str) -> Result<Self> {
        let timestamp = NaiveDateTime::parse_from_str(value.trim(), "%Y-%m-%dT%H:%M:%S%.f")
            .map_err(|_| Error::InvalidTimestamp {
                value: value.to_string(),
            })?;
        Ok(Self::from_datetime(timestamp))
    }

    pub fn from_datetime(timestamp: NaiveDateTime) -> Self {
        let date = timestamp.date();
        if timestamp.hour() < NIGHT_BOUNDARY_HOUR {
            Self(date - Duration::days(1))
        } else {
            Self(date)
        }
    }
}

impl fmt::Display for ObservingNight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y%m%d"))
    }
}
