use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use error_stack::{Result, report};
use model::{AccountId, BanUpdate, NewViolation, UnixTime, UserSanctionState, ViolationRecord};

use crate::{DataError, SanctionStore};

/// In memory [SanctionStore] for tests.
#[derive(Default)]
pub struct FakeSanctionStore {
    profiles: Mutex<HashMap<AccountId, UserSanctionState>>,
    violations: Mutex<Vec<ViolationRecord>>,
    fail_writes: AtomicBool,
    fail_ban_updates: AtomicBool,
}

impl FakeSanctionStore {
    pub fn new_arc() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    pub fn fail_ban_updates(&self) {
        self.fail_ban_updates.store(true, Ordering::SeqCst);
    }

    pub fn state(&self, id: AccountId) -> UserSanctionState {
        self.profiles
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn set_state(&self, id: AccountId, state: UserSanctionState) {
        self.profiles.lock().unwrap().insert(id, state);
    }

    pub fn set_violation_count(&self, id: AccountId, count: i64) {
        self.profiles
            .lock()
            .unwrap()
            .entry(id)
            .or_default()
            .violation_count = count;
    }

    pub fn violation_count(&self, id: AccountId) -> usize {
        self.violations
            .lock()
            .unwrap()
            .iter()
            .filter(|v| v.account_id == id)
            .count()
    }
}

#[async_trait]
impl SanctionStore for FakeSanctionStore {
    async fn sanction_state(&self, id: AccountId) -> Result<UserSanctionState, DataError> {
        Ok(self.state(id))
    }

    async fn insert_violation(
        &self,
        violation: NewViolation,
        time: UnixTime,
    ) -> Result<(), DataError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(report!(DataError::Diesel));
        }

        let mut violations = self.violations.lock().unwrap();
        let id = violations.len() as i64 + 1;
        violations.push(ViolationRecord {
            id,
            account_id: violation.account_id,
            violation_type: violation.violation_type,
            severity: violation.severity,
            moderation_details: violation.moderation_details,
            image_data: violation.image_data,
            created_at: time,
        });
        Ok(())
    }

    async fn increment_violation_count(&self, id: AccountId) -> Result<i64, DataError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(report!(DataError::Diesel));
        }

        let mut profiles = self.profiles.lock().unwrap();
        let state = profiles.entry(id).or_default();
        state.violation_count += 1;
        Ok(state.violation_count)
    }

    async fn set_ban_state(&self, id: AccountId, ban: BanUpdate) -> Result<(), DataError> {
        if self.fail_writes.load(Ordering::SeqCst) || self.fail_ban_updates.load(Ordering::SeqCst)
        {
            return Err(report!(DataError::Diesel));
        }

        if let Some(state) = self.profiles.lock().unwrap().get_mut(&id) {
            state.is_banned = ban.is_banned;
            state.ban_reason = ban.ban_reason;
            state.banned_at = ban.banned_at;
            state.banned_until = ban.banned_until;
        }
        Ok(())
    }

    async fn violations(&self, id: AccountId) -> Result<Vec<ViolationRecord>, DataError> {
        Ok(self
            .violations
            .lock()
            .unwrap()
            .iter()
            .filter(|v| v.account_id == id)
            .cloned()
            .collect())
    }
}
