#![deny(unsafe_code)]
#![deny(unused_must_use)]
#![deny(unused_features)]
#![warn(unused_crate_dependencies)]

//! SQLite storage for profile sanction state and the violation log.

pub mod current;
pub mod db_macros;
pub mod diesel_db;

use std::{fmt::Debug, fs, path::PathBuf};

use config::Config;
use current::{read::CurrentReadCommands, write::CurrentWriteCommands};
use diesel::Connection;
use diesel_migrations::{EmbeddedMigrations, embed_migrations};
use error_stack::{Context, Report, Result, ResultExt};

pub use diesel_db::{
    DatabaseLocation, DieselCloseHandle, DieselConnection, DieselDatabaseError, DieselReadHandle,
    DieselWriteHandle, ObjectExtensions, PoolObject,
};

pub const DIESEL_MIGRATIONS: EmbeddedMigrations = embed_migrations!();

pub const SQLITE_DIR_NAME: &str = "sqlite";
pub const DATABASE_FILE_NAME: &str = "current.db";

#[derive(thiserror::Error, Debug)]
pub enum DatabaseError {
    #[error("Diesel error")]
    Diesel,
    #[error("File path creation failed")]
    FilePathCreationFailed,
}

pub trait IntoDatabaseError {
    type Ok;

    #[track_caller]
    fn into_db_error<T: Debug>(self, request_context: T) -> Result<Self::Ok, DieselDatabaseError>;
}

impl<Ok, Err: Context> IntoDatabaseError for std::result::Result<Ok, Err> {
    type Ok = Ok;

    fn into_db_error<T: Debug>(self, request_context: T) -> Result<Ok, DieselDatabaseError> {
        match self {
            Ok(value) => Ok(value),
            Err(e) => Err(Report::new(e))
                .change_context(DieselDatabaseError::Execute)
                .attach_printable(format!("{:?}", request_context)),
        }
    }
}

/// Error type for diesel transactions. Transaction is rolled back when
/// the action returns an error.
pub struct TransactionError(Report<DieselDatabaseError>);

impl TransactionError {
    pub fn into_report(self) -> Report<DieselDatabaseError> {
        self.0
    }
}

impl From<Report<DieselDatabaseError>> for TransactionError {
    fn from(value: Report<DieselDatabaseError>) -> Self {
        Self(value)
    }
}

impl From<diesel::result::Error> for TransactionError {
    fn from(value: diesel::result::Error) -> Self {
        Self(
            Report::new(value)
                .change_context(DieselDatabaseError::FromDieselErrorToTransactionError),
        )
    }
}

#[derive(Clone, Debug)]
pub struct DbWriteHandle {
    diesel_write: DieselWriteHandle,
}

impl DbWriteHandle {
    pub fn diesel(&self) -> &DieselWriteHandle {
        &self.diesel_write
    }

    /// Run write commands in a transaction.
    pub async fn write<
        T: Send + 'static,
        F: FnOnce(CurrentWriteCommands<'_>) -> Result<T, DieselDatabaseError> + Send + 'static,
    >(
        &self,
        action: F,
    ) -> Result<T, DieselDatabaseError> {
        let conn = self
            .diesel_write
            .pool()
            .get()
            .await
            .change_context(DieselDatabaseError::GetConnection)?;

        conn.interact(move |conn| {
            conn.transaction::<_, TransactionError, _>(|conn| {
                action(CurrentWriteCommands::new(conn)).map_err(TransactionError::from)
            })
            .map_err(TransactionError::into_report)
        })
        .await?
    }
}

#[derive(Clone, Debug)]
pub struct DbReadHandle {
    diesel_read: DieselReadHandle,
}

impl DbReadHandle {
    pub fn diesel(&self) -> &DieselReadHandle {
        &self.diesel_read
    }

    pub async fn read<
        T: Send + 'static,
        F: FnOnce(CurrentReadCommands<'_>) -> Result<T, DieselDatabaseError> + Send + 'static,
    >(
        &self,
        action: F,
    ) -> Result<T, DieselDatabaseError> {
        let conn = self
            .diesel_read
            .pool()
            .get()
            .await
            .change_context(DieselDatabaseError::GetConnection)?;

        conn.interact(move |conn| action(CurrentReadCommands::new(conn)))
            .await?
    }
}

pub struct DbCloseHandle {
    write: DieselCloseHandle,
    read: DieselCloseHandle,
}

impl DbCloseHandle {
    /// Call this before closing the server.
    pub async fn close(self) {
        self.read.close().await;
        self.write.close().await;
    }
}

pub struct DatabaseHandleCreator {}

impl DatabaseHandleCreator {
    /// Create write and read handles for the database configured in
    /// `config`. Runs migrations.
    pub async fn create_from_config(
        config: &Config,
    ) -> Result<(DbWriteHandle, DbReadHandle, DbCloseHandle), DatabaseError> {
        let location = if config.sqlite_in_ram() {
            DatabaseLocation::InRam {
                name: "current".to_string(),
            }
        } else {
            DatabaseLocation::File(create_dirs_and_get_sqlite_database_file_path(config)?)
        };

        Self::create(&location).await
    }

    /// Create handles. Write handle is created first as it runs
    /// the migrations.
    pub async fn create(
        location: &DatabaseLocation,
    ) -> Result<(DbWriteHandle, DbReadHandle, DbCloseHandle), DatabaseError> {
        let (diesel_write, write_close) = DieselWriteHandle::new(location, DIESEL_MIGRATIONS)
            .await
            .change_context(DatabaseError::Diesel)?;

        let (diesel_read, read_close) = DieselReadHandle::new(location)
            .await
            .change_context(DatabaseError::Diesel)?;

        let version = diesel_write
            .sqlite_version()
            .await
            .change_context(DatabaseError::Diesel)?;
        tracing::info!("SQLite version: {}", version);

        Ok((
            DbWriteHandle { diesel_write },
            DbReadHandle { diesel_read },
            DbCloseHandle {
                write: write_close,
                read: read_close,
            },
        ))
    }
}

pub fn create_dirs_and_get_sqlite_database_file_path(
    config: &Config,
) -> Result<PathBuf, DatabaseError> {
    let sqlite = config.data_dir().join(SQLITE_DIR_NAME);
    if !sqlite.exists() {
        fs::create_dir_all(&sqlite).change_context(DatabaseError::FilePathCreationFailed)?;
    }

    Ok(sqlite.join(DATABASE_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use model::{
        AccountId, BanUpdate, Likelihood, ModerationCategory, ModerationResult, NewViolation,
        UnixTime, VIOLATION_TYPE_INAPPROPRIATE_IMAGE, ViolationSeverity,
    };

    use super::*;

    async fn in_ram_database() -> (DbWriteHandle, DbReadHandle, DbCloseHandle) {
        let location = DatabaseLocation::InRam {
            name: uuid::Uuid::new_v4().simple().to_string(),
        };
        DatabaseHandleCreator::create(&location).await.unwrap()
    }

    fn violation(account: AccountId) -> NewViolation {
        NewViolation {
            account_id: account,
            violation_type: VIOLATION_TYPE_INAPPROPRIATE_IMAGE.to_string(),
            severity: ViolationSeverity::Medium,
            moderation_details: ModerationResult::default()
                .with(ModerationCategory::Racy, Likelihood::Likely),
            image_data: Some(vec![1, 2, 3]),
        }
    }

    #[tokio::test]
    async fn missing_profile_has_default_state() {
        let (_, read, close) = in_ram_database().await;
        let account = AccountId::new_random();

        let state = read
            .read(move |cmds| cmds.sanction().sanction_state(account))
            .await
            .unwrap();

        assert_eq!(state.violation_count, 0);
        assert!(!state.is_banned);
        assert_eq!(state.ban_reason, None);
        close.close().await;
    }

    #[tokio::test]
    async fn violation_count_increments_from_one() {
        let (write, read, close) = in_ram_database().await;
        let account = AccountId::new_random();

        for expected in 1..=3 {
            let count = write
                .write(move |cmds| cmds.sanction().increment_violation_count(account))
                .await
                .unwrap();
            assert_eq!(count, expected);
        }

        let other = write
            .write(|cmds| cmds.sanction().increment_violation_count(AccountId::new_random()))
            .await
            .unwrap();
        assert_eq!(other, 1);

        let state = read
            .read(move |cmds| cmds.sanction().sanction_state(account))
            .await
            .unwrap();
        assert_eq!(state.violation_count, 3);
        close.close().await;
    }

    #[tokio::test]
    async fn concurrent_increments_are_not_lost() {
        let (write, read, close) = in_ram_database().await;
        let account = AccountId::new_random();

        let mut tasks = Vec::new();
        for _ in 0..10 {
            let write = write.clone();
            tasks.push(tokio::spawn(async move {
                write
                    .write(move |cmds| cmds.sanction().increment_violation_count(account))
                    .await
                    .unwrap()
            }));
        }

        let mut counts = Vec::new();
        for task in tasks {
            counts.push(task.await.unwrap());
        }
        counts.sort();
        assert_eq!(counts, (1..=10).collect::<Vec<i64>>());

        let state = read
            .read(move |cmds| cmds.sanction().sanction_state(account))
            .await
            .unwrap();
        assert_eq!(state.violation_count, 10);
        close.close().await;
    }

    #[tokio::test]
    async fn ban_state_is_written_and_cleared() {
        let (write, read, close) = in_ram_database().await;
        let account = AccountId::new_random();
        let now = UnixTime::new(1000);

        let updated = write
            .write(move |cmds| {
                let mut sanction = cmds.sanction();
                sanction.increment_violation_count(account)?;
                sanction.set_ban_state(
                    account,
                    &BanUpdate::temporary("reason", now, now.add_hours(48)),
                )
            })
            .await
            .unwrap();
        assert!(updated);

        let state = read
            .read(move |cmds| cmds.sanction().sanction_state(account))
            .await
            .unwrap();
        assert!(state.is_banned);
        assert_eq!(state.ban_reason.as_deref(), Some("reason"));
        assert_eq!(state.banned_at, Some(now));
        assert_eq!(state.banned_until, Some(UnixTime::new(1000 + 48 * 3600)));

        write
            .write(move |cmds| cmds.sanction().set_ban_state(account, &BanUpdate::unban()))
            .await
            .unwrap();

        let state = read
            .read(move |cmds| cmds.sanction().sanction_state(account))
            .await
            .unwrap();
        assert!(!state.is_banned);
        assert_eq!(state.ban_reason, None);
        assert_eq!(state.banned_at, None);
        assert_eq!(state.banned_until, None);
        assert_eq!(state.violation_count, 1);
        close.close().await;
    }

    #[tokio::test]
    async fn unban_of_missing_profile_does_not_create_row() {
        let (write, read, close) = in_ram_database().await;
        let account = AccountId::new_random();

        let updated = write
            .write(move |cmds| {
                let mut sanction = cmds.sanction();
                let updated = sanction.set_ban_state(account, &BanUpdate::unban())?;
                let state = sanction.read().sanction().sanction_state(account)?;
                assert_eq!(state, Default::default());
                Ok(updated)
            })
            .await
            .unwrap();
        assert!(!updated);

        let state = read
            .read(move |cmds| cmds.sanction().sanction_state(account))
            .await
            .unwrap();
        assert_eq!(state.violation_count, 0);
        close.close().await;
    }

    #[tokio::test]
    async fn violations_are_listed_in_insert_order() {
        let (write, read, close) = in_ram_database().await;
        let account = AccountId::new_random();

        let first = violation(account);
        let mut second = violation(account);
        second.severity = ViolationSeverity::Critical;
        second.image_data = None;

        let inserted = (first.clone(), second.clone());
        write
            .write(move |cmds| {
                let mut sanction = cmds.sanction();
                sanction.insert_violation(&inserted.0, UnixTime::new(10))?;
                sanction.insert_violation(&inserted.1, UnixTime::new(20))?;
                Ok(())
            })
            .await
            .unwrap();
        write
            .write(|cmds| {
                cmds.sanction()
                    .insert_violation(&violation(AccountId::new_random()), UnixTime::new(30))
            })
            .await
            .unwrap();

        let violations = read
            .read(move |cmds| cmds.sanction().violations(account))
            .await
            .unwrap();

        assert_eq!(violations.len(), 2);
        assert!(violations[0].id < violations[1].id);
        assert_eq!(violations[0].severity, ViolationSeverity::Medium);
        assert_eq!(violations[0].moderation_details, first.moderation_details);
        assert_eq!(violations[0].image_data, Some(vec![1, 2, 3]));
        assert_eq!(violations[0].created_at, UnixTime::new(10));
        assert_eq!(violations[1].severity, ViolationSeverity::Critical);
        assert_eq!(violations[1].image_data, None);
        assert_eq!(
            violations[1].violation_type,
            VIOLATION_TYPE_INAPPROPRIATE_IMAGE
        );
        close.close().await;
    }

    #[tokio::test]
    async fn failed_action_rolls_back_transaction() {
        let (write, read, close) = in_ram_database().await;
        let account = AccountId::new_random();

        let result = write
            .write(move |cmds| -> Result<(), DieselDatabaseError> {
                let mut sanction = cmds.sanction();
                sanction.increment_violation_count(account)?;
                Err(Report::new(DieselDatabaseError::Execute))
            })
            .await;
        assert!(result.is_err());

        let state = read
            .read(move |cmds| cmds.sanction().sanction_state(account))
            .await
            .unwrap();
        assert_eq!(state.violation_count, 0);
        close.close().await;
    }
}
