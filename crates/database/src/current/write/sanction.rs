use diesel::{insert_into, prelude::*, update};
use error_stack::{Result, ResultExt};
use model::{AccountId, BanUpdate, NewViolation, UnixTime, ViolationSeverity};

use crate::{DieselDatabaseError, IntoDatabaseError, define_current_write_commands};

define_current_write_commands!(CurrentWriteSanction);

#[derive(Insertable)]
#[diesel(table_name = model::schema::content_violation)]
#[diesel(check_for_backend(model::Db))]
struct NewViolationRow<'a> {
    account_id: AccountId,
    violation_type: &'a str,
    severity: ViolationSeverity,
    moderation_details: &'a str,
    image_data: Option<&'a [u8]>,
    created_at: UnixTime,
}

impl CurrentWriteSanction<'_> {
    /// Append violation to the log. Returns the new row ID.
    pub fn insert_violation(
        &mut self,
        violation: &NewViolation,
        time: UnixTime,
    ) -> Result<i64, DieselDatabaseError> {
        use model::schema::content_violation::dsl::*;

        let details = serde_json::to_string(&violation.moderation_details)
            .change_context(DieselDatabaseError::SerdeSerialize)?;

        let row = NewViolationRow {
            account_id: violation.account_id,
            violation_type: &violation.violation_type,
            severity: violation.severity,
            moderation_details: &details,
            image_data: violation.image_data.as_deref(),
            created_at: time,
        };

        insert_into(content_violation)
            .values(&row)
            .returning(id)
            .get_result(self.conn())
            .into_db_error(violation.account_id)
    }

    /// Increment violation count with a single statement and return the
    /// new count. Profile row is created if it does not exist.
    pub fn increment_violation_count(
        &mut self,
        account: AccountId,
    ) -> Result<i64, DieselDatabaseError> {
        use model::schema::profile_sanction::dsl::*;

        insert_into(profile_sanction)
            .values((account_id.eq(account), violation_count.eq(1)))
            .on_conflict(account_id)
            .do_update()
            .set(violation_count.eq(violation_count + 1))
            .returning(violation_count)
            .get_result(self.conn())
            .into_db_error(account)
    }

    /// Returns false if the profile row does not exist. Row is not created
    /// in that case.
    pub fn set_ban_state(
        &mut self,
        account: AccountId,
        ban: &BanUpdate,
    ) -> Result<bool, DieselDatabaseError> {
        use model::schema::profile_sanction::dsl::*;

        let updated_rows = update(profile_sanction.filter(account_id.eq(account)))
            .set(ban)
            .execute(self.conn())
            .into_db_error((account, ban))?;

        Ok(updated_rows > 0)
    }
}
