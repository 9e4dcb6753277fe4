use std::str::FromStr;

use diesel::{AsExpression, FromSqlRow, sql_types::Binary};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::macros::diesel_uuid_wrapper;

/// Account ID of a marketplace user (client or professional).
#[derive(
    Debug,
    Serialize,
    Deserialize,
    ToSchema,
    Clone,
    Eq,
    Hash,
    PartialEq,
    IntoParams,
    Copy,
    FromSqlRow,
    AsExpression,
)]
#[diesel(sql_type = Binary)]
pub struct AccountId {
    pub aid: uuid::Uuid,
}

impl AccountId {
    pub fn new(aid: uuid::Uuid) -> Self {
        Self { aid }
    }

    pub fn new_random() -> Self {
        Self {
            aid: uuid::Uuid::new_v4(),
        }
    }

    pub fn as_uuid(&self) -> &uuid::Uuid {
        &self.aid
    }
}

diesel_uuid_wrapper!(AccountId);

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.aid)
    }
}

impl FromStr for AccountId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::parse_str(s.trim()).map(Self::new)
    }
}
