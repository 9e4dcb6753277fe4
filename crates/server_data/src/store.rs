use async_trait::async_trait;
use database::{DbReadHandle, DbWriteHandle};
use error_stack::{Result, ResultExt};
use model::{AccountId, BanUpdate, NewViolation, UnixTime, UserSanctionState, ViolationRecord};

#[derive(thiserror::Error, Debug)]
pub enum DataError {
    #[error("Diesel error")]
    Diesel,
}

/// Profile sanction state and violation log storage.
#[async_trait]
pub trait SanctionStore: Send + Sync {
    /// Missing profile is the default state.
    async fn sanction_state(&self, id: AccountId) -> Result<UserSanctionState, DataError>;

    async fn insert_violation(
        &self,
        violation: NewViolation,
        time: UnixTime,
    ) -> Result<(), DataError>;

    /// Atomically increment violation count and return the new value.
    async fn increment_violation_count(&self, id: AccountId) -> Result<i64, DataError>;

    /// Does nothing if the profile does not exist.
    async fn set_ban_state(&self, id: AccountId, ban: BanUpdate) -> Result<(), DataError>;

    async fn violations(&self, id: AccountId) -> Result<Vec<ViolationRecord>, DataError>;
}

#[derive(Clone, Debug)]
pub struct DatabaseSanctionStore {
    write: DbWriteHandle,
    read: DbReadHandle,
}

impl DatabaseSanctionStore {
    pub fn new(write: DbWriteHandle, read: DbReadHandle) -> Self {
        Self { write, read }
    }
}

#[async_trait]
impl SanctionStore for DatabaseSanctionStore {
    async fn sanction_state(&self, id: AccountId) -> Result<UserSanctionState, DataError> {
        self.read
            .read(move |cmds| cmds.sanction().sanction_state(id))
            .await
            .change_context(DataError::Diesel)
    }

    async fn insert_violation(
        &self,
        violation: NewViolation,
        time: UnixTime,
    ) -> Result<(), DataError> {
        self.write
            .write(move |cmds| cmds.sanction().insert_violation(&violation, time))
            .await
            .change_context(DataError::Diesel)
            .map(|_| ())
    }

    async fn increment_violation_count(&self, id: AccountId) -> Result<i64, DataError> {
        self.write
            .write(move |cmds| cmds.sanction().increment_violation_count(id))
            .await
            .change_context(DataError::Diesel)
    }

    async fn set_ban_state(&self, id: AccountId, ban: BanUpdate) -> Result<(), DataError> {
        self.write
            .write(move |cmds| cmds.sanction().set_ban_state(id, &ban))
            .await
            .change_context(DataError::Diesel)
            .map(|_| ())
    }

    async fn violations(&self, id: AccountId) -> Result<Vec<ViolationRecord>, DataError> {
        self.read
            .read(move |cmds| cmds.sanction().violations(id))
            .await
            .change_context(DataError::Diesel)
    }
}
