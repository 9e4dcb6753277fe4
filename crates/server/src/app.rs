use std::{collections::HashSet, sync::Arc};

use image_moderation::ImageModerator;
use model::AccountId;
use server_data::{BanGate, ContentStore, SanctionStore, ViolationRecorder};

/// Accounts which can use the admin API.
#[derive(Debug, Clone, Default)]
pub struct AdminAccounts {
    accounts: Arc<HashSet<AccountId>>,
}

impl AdminAccounts {
    pub fn new(accounts: impl IntoIterator<Item = AccountId>) -> Self {
        Self {
            accounts: Arc::new(accounts.into_iter().collect()),
        }
    }

    pub fn is_admin(&self, id: AccountId) -> bool {
        self.accounts.contains(&id)
    }
}

/// State shared with the route handlers.
#[derive(Clone)]
pub struct AppState {
    moderator: Arc<ImageModerator>,
    recorder: Arc<ViolationRecorder>,
    ban_gate: Arc<BanGate>,
    sanctions: Arc<dyn SanctionStore>,
    content: ContentStore,
    admins: AdminAccounts,
}

impl AppState {
    pub fn new(
        moderator: ImageModerator,
        sanctions: Arc<dyn SanctionStore>,
        content: ContentStore,
        admins: AdminAccounts,
    ) -> Self {
        Self {
            moderator: Arc::new(moderator),
            recorder: Arc::new(ViolationRecorder::new(sanctions.clone())),
            ban_gate: Arc::new(BanGate::new(sanctions.clone())),
            sanctions,
            content,
            admins,
        }
    }

    pub fn moderator(&self) -> &ImageModerator {
        &self.moderator
    }

    pub fn recorder(&self) -> &ViolationRecorder {
        &self.recorder
    }

    pub fn ban_gate(&self) -> &BanGate {
        &self.ban_gate
    }

    pub fn sanctions(&self) -> &dyn SanctionStore {
        self.sanctions.as_ref()
    }

    pub fn content(&self) -> &ContentStore {
        &self.content
    }

    pub fn admins(&self) -> &AdminAccounts {
        &self.admins
    }
}
