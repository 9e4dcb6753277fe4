use diesel::{AsExpression, FromSqlRow, sql_types::BigInt};
use serde::{Deserialize, Serialize};
use utils::current_unix_time;
use utoipa::{IntoParams, ToSchema};

use crate::macros::diesel_i64_wrapper;

#[derive(
    Debug,
    Clone,
    Copy,
    Deserialize,
    Serialize,
    ToSchema,
    IntoParams,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Default,
    FromSqlRow,
    AsExpression,
)]
#[diesel(sql_type = BigInt)]
pub struct UnixTime {
    pub ut: i64,
}

impl UnixTime {
    pub const SECONDS_IN_HOUR: i64 = 60 * 60;

    pub fn new(value: i64) -> Self {
        Self { ut: value }
    }

    pub fn as_i64(&self) -> &i64 {
        &self.ut
    }

    pub fn current_time() -> Self {
        Self {
            ut: current_unix_time(),
        }
    }

    pub fn add_seconds(&self, seconds: u32) -> Self {
        let seconds: i64 = seconds.into();
        Self {
            ut: self.ut + seconds,
        }
    }

    pub fn add_hours(&self, hours: u32) -> Self {
        Self {
            ut: self.ut + i64::from(hours) * Self::SECONDS_IN_HOUR,
        }
    }

    /// Whole hours from `now` until `self`, rounded up.
    /// Returns zero if `self` is not in the future.
    pub fn hours_remaining_from(&self, now: UnixTime) -> i64 {
        let remaining = self.ut - now.ut;
        if remaining <= 0 {
            0
        } else {
            (remaining + Self::SECONDS_IN_HOUR - 1) / Self::SECONDS_IN_HOUR
        }
    }

    pub fn to_chrono_time(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        chrono::DateTime::from_timestamp(self.ut, 0)
    }
}

diesel_i64_wrapper!(UnixTime);

impl std::fmt::Display for UnixTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.ut)
    }
}

impl From<chrono::DateTime<chrono::Utc>> for UnixTime {
    fn from(value: chrono::DateTime<chrono::Utc>) -> Self {
        Self {
            ut: value.timestamp(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hours_remaining_is_rounded_up() {
        let now = UnixTime::new(1_000);
        assert_eq!(UnixTime::new(1_000 + 1).hours_remaining_from(now), 1);
        assert_eq!(UnixTime::new(1_000 + 3600).hours_remaining_from(now), 1);
        assert_eq!(UnixTime::new(1_000 + 3601).hours_remaining_from(now), 2);
        assert_eq!(now.add_hours(48).hours_remaining_from(now), 48);
    }

    #[test]
    fn hours_remaining_is_zero_for_past_time() {
        let now = UnixTime::new(10_000);
        assert_eq!(UnixTime::new(9_000).hours_remaining_from(now), 0);
        assert_eq!(now.hours_remaining_from(now), 0);
    }
}
