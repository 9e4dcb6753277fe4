use diesel::prelude::*;
use error_stack::{Result, ResultExt};
use model::{AccountId, UnixTime, UserSanctionState, ViolationRecord, ViolationSeverity};

use crate::{DieselDatabaseError, IntoDatabaseError, define_current_read_commands};

define_current_read_commands!(CurrentReadSanction);

#[derive(Queryable, Selectable)]
#[diesel(table_name = model::schema::content_violation)]
#[diesel(check_for_backend(model::Db))]
struct ViolationRow {
    id: i64,
    account_id: AccountId,
    violation_type: String,
    severity: ViolationSeverity,
    moderation_details: String,
    image_data: Option<Vec<u8>>,
    created_at: UnixTime,
}

impl ViolationRow {
    fn into_record(self) -> Result<ViolationRecord, DieselDatabaseError> {
        let moderation_details = serde_json::from_str(&self.moderation_details)
            .change_context(DieselDatabaseError::SerdeDeserialize)
            .attach_printable_lazy(|| format!("Violation {}", self.id))?;

        Ok(ViolationRecord {
            id: self.id,
            account_id: self.account_id,
            violation_type: self.violation_type,
            severity: self.severity,
            moderation_details,
            image_data: self.image_data,
            created_at: self.created_at,
        })
    }
}

impl CurrentReadSanction<'_> {
    /// Missing profile row is the default state.
    pub fn sanction_state(
        &mut self,
        account: AccountId,
    ) -> Result<UserSanctionState, DieselDatabaseError> {
        use model::schema::profile_sanction::dsl::*;

        let state = profile_sanction
            .filter(account_id.eq(account))
            .select(UserSanctionState::as_select())
            .first(self.conn())
            .optional()
            .into_db_error(account)?;

        Ok(state.unwrap_or_default())
    }

    /// Oldest violation first.
    pub fn violations(
        &mut self,
        account: AccountId,
    ) -> Result<Vec<ViolationRecord>, DieselDatabaseError> {
        use model::schema::content_violation::dsl::*;

        let rows: Vec<ViolationRow> = content_violation
            .filter(account_id.eq(account))
            .order(id.asc())
            .select(ViolationRow::as_select())
            .load(self.conn())
            .into_db_error(account)?;

        rows.into_iter().map(ViolationRow::into_record).collect()
    }
}
