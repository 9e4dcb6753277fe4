use std::sync::Arc;

use error_stack::{Result, ResultExt};
use model::{AccountId, BanUpdate, NewViolation, UnixTime, ViolationSeverity};
use tracing::{error, warn};

use crate::{SanctionError, SanctionStore};

pub const TEMPORARY_BAN_HOURS: u32 = 48;
/// Violation count which makes the ban permanent.
pub const PERMANENT_BAN_VIOLATION_COUNT: i64 = 3;

pub const BAN_REASON_CRITICAL: &str = "Violación crítica de políticas de contenido";
pub const BAN_REASON_MULTIPLE: &str = "Múltiples violaciones de políticas de contenido";
pub const BAN_REASON_SECOND: &str = "Segunda violación de políticas de contenido";

/// Sanction which was applied after recording a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SanctionOutcome {
    /// First non-critical violation. Nothing else than the violation
    /// count is stored.
    Warning,
    TemporaryBan { banned_until: UnixTime },
    PermanentBan,
}

impl SanctionOutcome {
    /// Escalation for the violation count which includes the new violation.
    /// Critical severity always leads to a permanent ban.
    pub fn for_violation(
        severity: ViolationSeverity,
        violation_count: i64,
        now: UnixTime,
    ) -> Self {
        if severity == ViolationSeverity::Critical
            || violation_count >= PERMANENT_BAN_VIOLATION_COUNT
        {
            Self::PermanentBan
        } else if violation_count == 2 {
            Self::TemporaryBan {
                banned_until: now.add_hours(TEMPORARY_BAN_HOURS),
            }
        } else {
            Self::Warning
        }
    }

    fn ban_update(
        &self,
        severity: ViolationSeverity,
        now: UnixTime,
    ) -> Option<BanUpdate> {
        match *self {
            Self::Warning => None,
            Self::TemporaryBan { banned_until } => {
                Some(BanUpdate::temporary(BAN_REASON_SECOND, now, banned_until))
            }
            Self::PermanentBan if severity == ViolationSeverity::Critical => {
                Some(BanUpdate::permanent(BAN_REASON_CRITICAL, now))
            }
            Self::PermanentBan => Some(BanUpdate::permanent(BAN_REASON_MULTIPLE, now)),
        }
    }
}

/// Stores violations and escalates sanctions.
pub struct ViolationRecorder {
    store: Arc<dyn SanctionStore>,
}

impl ViolationRecorder {
    pub fn new(store: Arc<dyn SanctionStore>) -> Self {
        Self { store }
    }

    pub async fn record_violation(
        &self,
        violation: NewViolation,
    ) -> Result<SanctionOutcome, SanctionError> {
        self.record_violation_at(violation, UnixTime::current_time())
            .await
    }

    pub async fn record_violation_at(
        &self,
        violation: NewViolation,
        now: UnixTime,
    ) -> Result<SanctionOutcome, SanctionError> {
        let id = violation.account_id;
        let severity = violation.severity;

        if let Err(e) = self.store.insert_violation(violation, now).await {
            error!("Inserting violation for account {} failed: {:?}", id, e);
            return Err(e).change_context(SanctionError::RecordViolation);
        }

        let violation_count = match self.store.increment_violation_count(id).await {
            Ok(count) => count,
            Err(e) => {
                error!("Incrementing violation count for account {} failed: {:?}", id, e);
                return Err(e).change_context(SanctionError::RecordViolation);
            }
        };

        let outcome = SanctionOutcome::for_violation(severity, violation_count, now);
        self.apply(id, outcome, severity, violation_count, now)
            .await?;

        Ok(outcome)
    }

    async fn apply(
        &self,
        id: AccountId,
        outcome: SanctionOutcome,
        severity: ViolationSeverity,
        violation_count: i64,
        now: UnixTime,
    ) -> Result<(), SanctionError> {
        let Some(ban) = outcome.ban_update(severity, now) else {
            warn!(
                "Account {} received a warning, violation count: {}",
                id, violation_count
            );
            return Ok(());
        };

        if let Err(e) = self.store.set_ban_state(id, ban).await {
            error!("Applying sanction {:?} for account {} failed: {:?}", outcome, id, e);
            return Err(e).change_context(SanctionError::ApplySanction);
        }

        match outcome {
            SanctionOutcome::TemporaryBan { banned_until } => warn!(
                "Account {} banned until {}, violation count: {}",
                id, banned_until, violation_count
            ),
            _ => warn!(
                "Account {} banned permanently, severity: {}, violation count: {}",
                id,
                severity.as_str(),
                violation_count
            ),
        }

        Ok(())
    }
}
