//! Retention policy
//!
//! Maps a retention class to an absolute expiry instant, or never, and
//! exposes the expiry predicate consumed by the external sweep job. The
//! sweep orchestration itself lives in `crate::maintenance`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Window ahead of `now` in which a file counts as "expiring soon".
pub const EXPIRING_SOON_HOURS: i64 = 24;

/// How long a file may persist before expiry.
///
/// Serialized with the variant name as the wire value
/// (`OneHour | OneDay | SevenDays | Never | SingleUse`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetentionClass {
    /// Expires one hour after upload
    OneHour,
    /// Expires 24 hours after upload
    OneDay,
    /// Expires seven days after upload
    #[default]
    SevenDays,
    /// No expiry
    Never,
    /// Deleted on consumption, not by elapsed time
    SingleUse,
}

impl RetentionClass {
    /// Absolute expiry instant for a file created at `now`.
    ///
    /// `Never` has no expiry. `SingleUse` also returns no expiry: deletion
    /// is triggered by consumption, and any configured instant would be
    /// irrelevant to that.
    pub fn expiry_for(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            RetentionClass::OneHour => Some(now + Duration::hours(1)),
            RetentionClass::OneDay => Some(now + Duration::hours(24)),
            RetentionClass::SevenDays => Some(now + Duration::days(7)),
            RetentionClass::Never | RetentionClass::SingleUse => None,
        }
    }

    /// Wire value of this class
    pub fn as_str(&self) -> &'static str {
        match self {
            RetentionClass::OneHour => "OneHour",
            RetentionClass::OneDay => "OneDay",
            RetentionClass::SevenDays => "SevenDays",
            RetentionClass::Never => "Never",
            RetentionClass::SingleUse => "SingleUse",
        }
    }
}

impl fmt::Display for RetentionClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RetentionClass {
    type Err = String;

    /// Accepts the wire value or a kebab/snake-case CLI spelling.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();
        match folded.as_str() {
            "onehour" => Ok(RetentionClass::OneHour),
            "oneday" => Ok(RetentionClass::OneDay),
            "sevendays" => Ok(RetentionClass::SevenDays),
            "never" => Ok(RetentionClass::Never),
            "singleuse" => Ok(RetentionClass::SingleUse),
            _ => Err(format!("unknown retention class: {s}")),
        }
    }
}

/// The expiry predicate: a file is expired iff it has an expiry instant and
/// that instant is at or before `now`.
pub fn is_expired(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    matches!(expires_at, Some(at) if at <= now)
}

/// True if the file expires within the next [`EXPIRING_SOON_HOURS`] but has
/// not expired yet.
pub fn is_expiring_soon(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match expires_at {
        Some(at) => at > now && at <= now + Duration::hours(EXPIRING_SOON_HOURS),
        None => false,
    }
}
