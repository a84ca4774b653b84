//! Compact ISO-8601 durations for trek length and transport legs.
//!
//! The editor collects an hours + minutes pair. The backend stores a
//! duration string such as `PT5H30M`. Whole hours are always present and
//! the minutes component is omitted when it is zero (`PT5H`).

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CoreError;

static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^P(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?)?$").expect("valid regex")
});

const MINUTES_PER_HOUR: u32 = 60;
const HOURS_PER_DAY: u32 = 24;

/// A non-negative duration with minute resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TrekDuration {
    total_minutes: u32,
}

impl TrekDuration {
    /// Build a duration from the editor's hours + minutes pair.
    ///
    /// Minutes of 60 or more carry over into hours.
    pub fn from_parts(hours: u32, minutes: u32) -> Self {
        Self {
            total_minutes: hours
                .saturating_mul(MINUTES_PER_HOUR)
                .saturating_add(minutes),
        }
    }

    pub fn from_minutes(total_minutes: u32) -> Self {
        Self { total_minutes }
    }

    pub fn total_minutes(&self) -> u32 {
        self.total_minutes
    }

    /// Whole hours, for the editor's hours field.
    pub fn hours(&self) -> u32 {
        self.total_minutes / MINUTES_PER_HOUR
    }

    /// Remainder minutes (0..60), for the editor's minutes field.
    pub fn minutes(&self) -> u32 {
        self.total_minutes % MINUTES_PER_HOUR
    }

    pub fn is_zero(&self) -> bool {
        self.total_minutes == 0
    }

    /// Parse a duration string produced by the backend.
    ///
    /// Accepts `PT5H30M`, `PT5H`, `PT45M` and a leading day component
    /// (`P1DT2H`). At least one component must be present.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        let s = s.trim();
        let caps = DURATION_RE
            .captures(s)
            .ok_or_else(|| CoreError::Validation(format!("Invalid duration '{s}'")))?;

        if caps.get(1).is_none() && caps.get(2).is_none() && caps.get(3).is_none() {
            return Err(CoreError::Validation(format!(
                "Duration '{s}' has no components"
            )));
        }

        let component = |idx: usize| -> Result<u32, CoreError> {
            caps.get(idx).map_or(Ok(0), |m| {
                m.as_str().parse::<u32>().map_err(|_| {
                    CoreError::Validation(format!("Duration component in '{s}' is too large"))
                })
            })
        };

        let days = component(1)?;
        let hours = component(2)?;
        let minutes = component(3)?;

        let total = days
            .checked_mul(HOURS_PER_DAY)
            .and_then(|h| h.checked_add(hours))
            .and_then(|h| h.checked_mul(MINUTES_PER_HOUR))
            .and_then(|m| m.checked_add(minutes))
            .ok_or_else(|| CoreError::Validation(format!("Duration '{s}' is too large")))?;

        Ok(Self::from_minutes(total))
    }
}

impl fmt::Display for TrekDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PT{}H", self.hours())?;
        if self.minutes() > 0 {
            write!(f, "{}M", self.minutes())?;
        }
        Ok(())
    }
}

impl FromStr for TrekDuration {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for TrekDuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TrekDuration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
