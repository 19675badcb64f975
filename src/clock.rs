//! Twelve-hour clock settings and the time shift derived from two of them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Meridiem {
    Am,
    Pm,
}

/// A time of day as shown on a 12-hour clock face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClockTime {
    hour: u8,
    minute: u8,
    meridiem: Meridiem,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClockError {
    #[error("hour {0} is outside 1..=12")]
    Hour(u8),
    #[error("minute {0} is outside 0..=59")]
    Minute(u8),
    #[error("expected HH:MM, got `{0}`")]
    Format(String),
}

impl ClockTime {
    pub fn new(hour: u8, minute: u8, meridiem: Meridiem) -> Result<Self, ClockError> {
        if !(1..=12).contains(&hour) {
            return Err(ClockError::Hour(hour));
        }
        if minute > 59 {
            return Err(ClockError::Minute(minute));
        }
        Ok(Self {
            hour,
            minute,
            meridiem,
        })
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    pub fn meridiem(&self) -> Meridiem {
        self.meridiem
    }

    /// 12:xx AM is just after midnight, 12:xx PM just after noon.
    pub fn minutes_since_midnight(&self) -> i32 {
        let hour24 = match self.meridiem {
            Meridiem::Am => i32::from(self.hour % 12),
            Meridiem::Pm => i32::from(self.hour % 12) + 12,
        };
        hour24 * 60 + i32::from(self.minute)
    }

    pub fn toggle_meridiem(self) -> Self {
        let meridiem = match self.meridiem {
            Meridiem::Am => Meridiem::Pm,
            Meridiem::Pm => Meridiem::Am,
        };
        Self { meridiem, ..self }
    }
}

/// Default left and right clocks: 12:00 PM and 2:00 PM.
pub fn default_clocks() -> (ClockTime, ClockTime) {
    (
        ClockTime {
            hour: 12,
            minute: 0,
            meridiem: Meridiem::Pm,
        },
        ClockTime {
            hour: 2,
            minute: 0,
            meridiem: Meridiem::Pm,
        },
    )
}

/// Shift in minutes between two clock settings, `left - right`.
pub fn time_delta(left: ClockTime, right: ClockTime) -> i32 {
    left.minutes_since_midnight() - right.minutes_since_midnight()
}

/// Parses 24-hour `HH:MM` text.
impl FromStr for ClockTime {
    type Err = ClockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let format_err = || ClockError::Format(s.to_string());
        let (hour, minute) = s.trim().split_once(':').ok_or_else(format_err)?;
        let hour: u8 = hour.parse().map_err(|_| format_err())?;
        let minute: u8 = minute.parse().map_err(|_| format_err())?;
        if hour > 23 {
            return Err(format_err());
        }

        let meridiem = if hour >= 12 { Meridiem::Pm } else { Meridiem::Am };
        let hour12 = match hour % 12 {
            0 => 12,
            h => h,
        };
        ClockTime::new(hour12, minute, meridiem)
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let meridiem = match self.meridiem {
            Meridiem::Am => "AM",
            Meridiem::Pm => "PM",
        };
        write!(f, "{:02}:{:02} {}", self.hour, self.minute, meridiem)
    }
}
