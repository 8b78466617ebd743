//! Domain primitives: TimeMs, Address, Direction and UTC day helpers.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Required prefix of every Kaspa address.
pub const ADDRESS_PREFIX: &str = "kaspa:";

const MS_PER_DAY: i64 = 86_400_000;

/// `num_days_from_ce` of 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i64 = 719_163;

/// Time in milliseconds since Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeMs(pub i64);

impl TimeMs {
    /// Create a TimeMs from milliseconds.
    pub fn new(ms: i64) -> Self {
        TimeMs(ms)
    }

    /// Current wall-clock time.
    pub fn now() -> Self {
        TimeMs(Utc::now().timestamp_millis())
    }

    /// Get the underlying milliseconds value.
    pub fn as_ms(&self) -> i64 {
        self.0
    }

    /// UTC calendar day containing this instant.
    pub fn date(&self) -> NaiveDate {
        DateTime::<Utc>::from_timestamp_millis(self.0)
            .map(|dt| dt.date_naive())
            .unwrap_or(NaiveDate::MIN)
    }
}

/// Milliseconds at UTC midnight starting `date`.
pub fn day_start_ms(date: NaiveDate) -> i64 {
    (i64::from(date.num_days_from_ce()) - UNIX_EPOCH_DAYS_FROM_CE) * MS_PER_DAY
}

/// Last millisecond of the UTC day `date`.
pub fn day_end_ms(date: NaiveDate) -> i64 {
    day_start_ms(date) + MS_PER_DAY - 1
}

/// Iterate every calendar day in `[from, to]`.
pub fn days_inclusive(from: NaiveDate, to: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    let span = (to - from).num_days().max(-1);
    (0..=span).map(move |offset| from + Duration::days(offset))
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressParseError {
    #[error("address is empty")]
    Empty,
    #[error("address must begin with \"kaspa:\": {0}")]
    InvalidPrefix(String),
    #[error("address has no payload after the prefix")]
    MissingPayload,
}

/// Kaspa wallet address, always carrying the `kaspa:` prefix.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Address(String);

impl Address {
    /// Validate and wrap a user-supplied address.
    pub fn parse(input: &str) -> Result<Self, AddressParseError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(AddressParseError::Empty);
        }
        let Some(payload) = trimmed.strip_prefix(ADDRESS_PREFIX) else {
            return Err(AddressParseError::InvalidPrefix(trimmed.to_string()));
        };
        if payload.is_empty() {
            return Err(AddressParseError::MissingPayload);
        }
        Ok(Address(trimmed.to_string()))
    }

    /// Get the address as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::parse(s)
    }
}

/// Direction of a balance change relative to the tracked address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    In,
    Out,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::In => write!(f, "in"),
            Direction::Out => write!(f, "out"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_requires_prefix() {
        assert!(Address::parse("kaspa:qpz2abc").is_ok());
        assert_eq!(
            Address::parse("xrp:rAbc"),
            Err(AddressParseError::InvalidPrefix("xrp:rAbc".to_string()))
        );
        assert_eq!(Address::parse("  "), Err(AddressParseError::Empty));
        assert_eq!(Address::parse("kaspa:"), Err(AddressParseError::MissingPayload));
    }

    #[test]
    fn test_address_display_trims() {
        let addr = Address::parse(" kaspa:qq123 ").unwrap();
        assert_eq!(addr.to_string(), "kaspa:qq123");
    }

    #[test]
    fn test_direction_serialization() {
        assert_eq!(serde_json::to_string(&Direction::In).unwrap(), "\"in\"");
        assert_eq!(serde_json::to_string(&Direction::Out).unwrap(), "\"out\"");
    }

    #[test]
    fn test_day_bounds() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert_eq!(day_start_ms(d), 1_704_153_600_000);
        assert_eq!(day_end_ms(d), 1_704_239_999_999);
        assert_eq!(TimeMs::new(day_end_ms(d)).date(), d);
        assert_eq!(TimeMs::new(day_end_ms(d) + 1).date(), d.succ_opt().unwrap());
    }

    #[test]
    fn test_days_inclusive() {
        let from = NaiveDate::from_ymd_opt(2024, 2, 28).unwrap();
        let to = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let days: Vec<_> = days_inclusive(from, to).collect();
        assert_eq!(days.len(), 3);
        assert_eq!(days[1], NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(days_inclusive(to, from).count(), 0);
    }
}
