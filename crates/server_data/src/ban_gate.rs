use std::sync::Arc;

use error_stack::{Result, ResultExt};
use model::{AccountId, BanDenial, BanInfo, BanState, BanUpdate, UnixTime};
use tracing::{error, info};

use crate::{SanctionError, SanctionStore};

pub const BAN_DENIAL_ERROR: &str = "account_banned";
const DEFAULT_BAN_REASON: &str = "Violación de políticas de contenido";
const BAN_TIME_FORMAT: &str = "%d/%m/%Y %H:%M";

/// Ban status lookups for request gating and the admin unban action.
///
/// Expired temporary bans are treated as lifted. Stored state is not
/// modified when reading.
pub struct BanGate {
    store: Arc<dyn SanctionStore>,
}

impl BanGate {
    pub fn new(store: Arc<dyn SanctionStore>) -> Self {
        Self { store }
    }

    pub async fn is_user_banned(&self, id: AccountId) -> Result<bool, SanctionError> {
        self.is_user_banned_at(id, UnixTime::current_time()).await
    }

    pub async fn is_user_banned_at(
        &self,
        id: AccountId,
        now: UnixTime,
    ) -> Result<bool, SanctionError> {
        let state = self.read_state(id).await?;
        Ok(state.is_banned_at(now))
    }

    /// Returns `None` if the user is not currently banned.
    pub async fn get_ban_info(&self, id: AccountId) -> Result<Option<BanInfo>, SanctionError> {
        self.get_ban_info_at(id, UnixTime::current_time()).await
    }

    pub async fn get_ban_info_at(
        &self,
        id: AccountId,
        now: UnixTime,
    ) -> Result<Option<BanInfo>, SanctionError> {
        let state = self.read_state(id).await?;
        Ok(state.ban_info_at(now))
    }

    pub async fn ban_state_at(
        &self,
        id: AccountId,
        now: UnixTime,
    ) -> Result<BanState, SanctionError> {
        let info = self.get_ban_info_at(id, now).await?;
        Ok(BanState {
            banned: info.is_some(),
            info,
        })
    }

    /// Returns the denial if the request must be blocked.
    pub async fn check_at(
        &self,
        id: AccountId,
        now: UnixTime,
    ) -> Result<Option<BanDenial>, SanctionError> {
        let info = self.get_ban_info_at(id, now).await?;
        Ok(info.map(create_ban_denial))
    }

    /// Clears all ban fields. Violation count is not changed. Unbanning
    /// a user which is not banned is not an error.
    pub async fn unban_user(&self, id: AccountId) -> Result<(), SanctionError> {
        if let Err(e) = self.store.set_ban_state(id, BanUpdate::unban()).await {
            error!("Unbanning account {} failed: {:?}", id, e);
            return Err(e).change_context(SanctionError::Unban);
        }

        info!("Account {} unbanned", id);
        Ok(())
    }

    async fn read_state(
        &self,
        id: AccountId,
    ) -> Result<model::UserSanctionState, SanctionError> {
        self.store
            .sanction_state(id)
            .await
            .change_context(SanctionError::ReadBanState)
    }
}

pub fn create_ban_denial(info: BanInfo) -> BanDenial {
    BanDenial {
        error: BAN_DENIAL_ERROR.to_string(),
        message: ban_message(&info),
        ban_info: info,
        should_logout: true,
    }
}

/// User visible ban message.
pub fn ban_message(info: &BanInfo) -> String {
    let reason = info.reason.as_deref().unwrap_or(DEFAULT_BAN_REASON);

    let until = info
        .banned_until
        .and_then(|until| until.to_chrono_time());

    match until {
        Some(until) if !info.permanent => format!(
            "Tu cuenta está suspendida hasta el {} UTC ({} horas restantes). Motivo: {}. Por favor, cierra sesión.",
            until.format(BAN_TIME_FORMAT),
            info.hours_remaining.unwrap_or_default(),
            reason,
        ),
        _ => format!(
            "Tu cuenta ha sido suspendida permanentemente. Motivo: {}. Por favor, cierra sesión.",
            reason,
        ),
    }
}

#[cfg(test)]
mod tests {
    use model::UserSanctionState;

    use super::*;
    use crate::fake::FakeSanctionStore;

    const NOW: UnixTime = UnixTime { ut: 1_700_000_000 };

    fn banned(until: Option<UnixTime>) -> UserSanctionState {
        UserSanctionState {
            violation_count: 2,
            is_banned: true,
            ban_reason: Some("Segunda violación de políticas de contenido".to_string()),
            banned_at: Some(NOW),
            banned_until: until,
        }
    }

    fn gate_with(state: Option<UserSanctionState>) -> (BanGate, Arc<FakeSanctionStore>, AccountId) {
        let store = FakeSanctionStore::new_arc();
        let id = AccountId::new_random();
        if let Some(state) = state {
            store.set_state(id, state);
        }
        (BanGate::new(store.clone()), store, id)
    }

    #[tokio::test]
    async fn expired_temporary_ban_does_not_block() {
        let (gate, store, id) = gate_with(Some(banned(Some(UnixTime::new(NOW.ut - 1)))));

        assert!(!gate.is_user_banned_at(id, NOW).await.unwrap());
        assert_eq!(gate.get_ban_info_at(id, NOW).await.unwrap(), None);
        assert_eq!(gate.check_at(id, NOW).await.unwrap(), None);
        // Read does not clear the stored flag
        assert!(store.state(id).is_banned);
    }

    #[tokio::test]
    async fn future_and_permanent_bans_block() {
        let (gate, _, id) = gate_with(Some(banned(Some(NOW.add_hours(1)))));
        assert!(gate.is_user_banned_at(id, NOW).await.unwrap());

        let (gate, _, id) = gate_with(Some(banned(None)));
        assert!(gate.is_user_banned_at(id, NOW).await.unwrap());
        assert!(gate.is_user_banned_at(id, UnixTime::new(i64::MAX)).await.unwrap());
    }

    #[tokio::test]
    async fn unknown_user_is_not_banned() {
        let (gate, _, id) = gate_with(None);
        assert!(!gate.is_user_banned_at(id, NOW).await.unwrap());
        let state = gate.ban_state_at(id, NOW).await.unwrap();
        assert!(!state.banned);
        assert_eq!(state.info, None);
    }

    #[tokio::test]
    async fn ban_info_hours_are_rounded_up() {
        let until = UnixTime::new(NOW.ut + 47 * 3600 + 1);
        let (gate, _, id) = gate_with(Some(banned(Some(until))));

        let info = gate.get_ban_info_at(id, NOW).await.unwrap().unwrap();

        assert!(!info.permanent);
        assert_eq!(info.hours_remaining, Some(48));
        assert_eq!(info.banned_until, Some(until));
        assert_eq!(info.banned_at, Some(NOW));
    }

    #[tokio::test]
    async fn unban_is_idempotent() {
        let (gate, store, id) = gate_with(Some(banned(None)));

        gate.unban_user(id).await.unwrap();
        gate.unban_user(id).await.unwrap();

        let state = store.state(id);
        assert!(!state.is_banned);
        assert_eq!(state.ban_reason, None);
        assert_eq!(state.banned_at, None);
        assert_eq!(state.banned_until, None);
        assert_eq!(state.violation_count, 2);

        let (gate, _, never_banned) = gate_with(None);
        gate.unban_user(never_banned).await.unwrap();
    }

    #[tokio::test]
    async fn unban_failure_is_error() {
        let (gate, store, id) = gate_with(Some(banned(None)));
        store.fail_writes();
        let error = gate.unban_user(id).await.unwrap_err();
        assert!(matches!(error.current_context(), SanctionError::Unban));
    }

    #[tokio::test]
    async fn temporary_ban_denial_message() {
        // 2023-11-14 22:13:20 UTC
        let (gate, _, id) = gate_with(Some(banned(Some(NOW.add_hours(48)))));

        let denial = gate.check_at(id, NOW).await.unwrap().unwrap();

        assert!(denial.should_logout);
        assert_eq!(denial.error, BAN_DENIAL_ERROR);
        assert_eq!(
            denial.message,
            "Tu cuenta está suspendida hasta el 16/11/2023 22:13 UTC (48 horas restantes). \
            Motivo: Segunda violación de políticas de contenido. Por favor, cierra sesión."
        );
    }

    #[test]
    fn permanent_ban_message() {
        let info = BanInfo {
            permanent: true,
            reason: Some("Violación crítica de políticas de contenido".to_string()),
            banned_at: Some(NOW),
            banned_until: None,
            hours_remaining: None,
        };

        let denial = create_ban_denial(info);

        assert!(denial.should_logout);
        assert_eq!(
            denial.message,
            "Tu cuenta ha sido suspendida permanentemente. \
            Motivo: Violación crítica de políticas de contenido. Por favor, cierra sesión."
        );
    }
}
