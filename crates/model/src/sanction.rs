use diesel::{
    AsChangeset, AsExpression, FromSqlRow, Queryable, Selectable, sql_types::Text,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{AccountId, ModerationResult, UnixTime, macros::diesel_text_try_from};

/// Severity of a recorded content violation. The upload handler decides
/// the severity.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Deserialize,
    Serialize,
    ToSchema,
    FromSqlRow,
    AsExpression,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ViolationSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl TryFrom<&str> for ViolationSeverity {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let severity = match value {
            "low" => Self::Low,
            "medium" => Self::Medium,
            "high" => Self::High,
            "critical" => Self::Critical,
            value => return Err(format!("Unknown violation severity {}", value)),
        };

        Ok(severity)
    }
}

diesel_text_try_from!(ViolationSeverity);

/// Violation type used for rejected image uploads.
pub const VIOLATION_TYPE_INAPPROPRIATE_IMAGE: &str = "inappropriate_image";

/// Input for the violation recorder.
#[derive(Debug, Clone, PartialEq)]
pub struct NewViolation {
    pub account_id: AccountId,
    pub violation_type: String,
    pub severity: ViolationSeverity,
    pub moderation_details: ModerationResult,
    pub image_data: Option<Vec<u8>>,
}

/// Persisted violation. Rows are only appended.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct ViolationRecord {
    pub id: i64,
    pub account_id: AccountId,
    pub violation_type: String,
    pub severity: ViolationSeverity,
    pub moderation_details: ModerationResult,
    /// Omitted from API responses.
    #[serde(skip)]
    pub image_data: Option<Vec<u8>>,
    pub created_at: UnixTime,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct ViolationList {
    pub violations: Vec<ViolationRecord>,
}

/// Sanction related fields of a user profile.
///
/// `is_banned` with `banned_until` set to `None` is a permanent ban.
/// `is_banned` with `banned_until` set is a temporary ban which ends at
/// that time.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, ToSchema, Queryable, Selectable,
)]
#[diesel(table_name = crate::schema::profile_sanction)]
#[diesel(check_for_backend(crate::Db))]
pub struct UserSanctionState {
    pub violation_count: i64,
    pub is_banned: bool,
    pub ban_reason: Option<String>,
    pub banned_at: Option<UnixTime>,
    pub banned_until: Option<UnixTime>,
}

impl UserSanctionState {
    /// Point in time check which treats expired temporary bans as lifted.
    /// Stored state is not modified.
    pub fn is_banned_at(&self, now: UnixTime) -> bool {
        if !self.is_banned {
            return false;
        }

        match self.banned_until {
            None => true,
            Some(until) => until > now,
        }
    }

    /// Returns `None` if the user is not banned at `now`.
    pub fn ban_info_at(&self, now: UnixTime) -> Option<BanInfo> {
        if !self.is_banned_at(now) {
            return None;
        }

        Some(BanInfo {
            permanent: self.banned_until.is_none(),
            reason: self.ban_reason.clone(),
            banned_at: self.banned_at,
            banned_until: self.banned_until,
            hours_remaining: self.banned_until.map(|v| v.hours_remaining_from(now)),
        })
    }
}

/// Write model for ban fields. `None` values are written as NULL.
#[derive(Debug, Clone, Default, PartialEq, Eq, AsChangeset)]
#[diesel(table_name = crate::schema::profile_sanction)]
#[diesel(treat_none_as_null = true)]
pub struct BanUpdate {
    pub is_banned: bool,
    pub ban_reason: Option<String>,
    pub banned_at: Option<UnixTime>,
    pub banned_until: Option<UnixTime>,
}

impl BanUpdate {
    pub fn permanent(reason: impl Into<String>, now: UnixTime) -> Self {
        Self {
            is_banned: true,
            ban_reason: Some(reason.into()),
            banned_at: Some(now),
            banned_until: None,
        }
    }

    pub fn temporary(reason: impl Into<String>, now: UnixTime, banned_until: UnixTime) -> Self {
        Self {
            is_banned: true,
            ban_reason: Some(reason.into()),
            banned_at: Some(now),
            banned_until: Some(banned_until),
        }
    }

    /// Clears all ban fields.
    pub fn unban() -> Self {
        Self::default()
    }
}

/// Details for creating a user visible ban message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
pub struct BanInfo {
    pub permanent: bool,
    pub reason: Option<String>,
    pub banned_at: Option<UnixTime>,
    pub banned_until: Option<UnixTime>,
    /// Whole hours until the temporary ban ends, rounded up.
    /// Not available for permanent bans.
    pub hours_remaining: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
pub struct BanState {
    pub banned: bool,
    pub info: Option<BanInfo>,
}

/// Response body for requests blocked by the ban gate.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
pub struct BanDenial {
    pub error: String,
    pub message: String,
    pub ban_info: BanInfo,
    pub should_logout: bool,
}
