use model::{Likelihood, ModerationCategory, ModerationDecision, ModerationResult};

/// Decides whether classified image content is acceptable.
pub trait ModerationPolicy: Send + Sync {
    fn should_allow(&self, result: &ModerationResult) -> ModerationDecision;
}

/// Blocks a category when its rating is at least `block_from`.
/// The same threshold is used for every category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdModerationPolicy {
    block_from: Likelihood,
}

impl ThresholdModerationPolicy {
    pub const fn new(block_from: Likelihood) -> Self {
        Self { block_from }
    }

    /// Allows only [Likelihood::VeryUnlikely] and [Likelihood::Unlikely].
    pub const fn strict() -> Self {
        Self::new(Likelihood::Possible)
    }

    pub fn block_from(&self) -> Likelihood {
        self.block_from
    }
}

impl Default for ThresholdModerationPolicy {
    fn default() -> Self {
        Self::strict()
    }
}

impl ModerationPolicy for ThresholdModerationPolicy {
    fn should_allow(&self, result: &ModerationResult) -> ModerationDecision {
        let violated: Vec<ModerationCategory> = ModerationCategory::ALL
            .into_iter()
            .filter(|c| result.get(*c) >= self.block_from)
            .collect();

        if violated.is_empty() {
            ModerationDecision::allow(*result)
        } else {
            ModerationDecision::deny(&violated, *result)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_blocked_level(level: Likelihood) -> bool {
        matches!(
            level,
            Likelihood::Possible | Likelihood::Likely | Likelihood::VeryLikely
        )
    }

    /// Every combination of the other four categories for each category
    /// and level.
    #[test]
    fn strict_policy_denies_if_and_only_if_possible_or_higher() {
        let policy = ThresholdModerationPolicy::strict();
        let levels = Likelihood::ALL;

        for category in ModerationCategory::ALL {
            let others: Vec<ModerationCategory> = ModerationCategory::ALL
                .into_iter()
                .filter(|c| *c != category)
                .collect();

            for level in levels {
                for combination in 0..levels.len().pow(4) {
                    let mut result = ModerationResult::default().with(category, level);
                    let mut index = combination;
                    for other in &others {
                        result.set(*other, levels[index % levels.len()]);
                        index /= levels.len();
                    }

                    let decision = policy.should_allow(&result);
                    let any_blocked = ModerationCategory::ALL
                        .iter()
                        .any(|c| is_blocked_level(result.get(*c)));
                    assert_eq!(decision.allowed, !any_blocked);
                    if is_blocked_level(level) {
                        assert!(!decision.allowed);
                        let reason = decision.reason.unwrap();
                        assert!(reason.contains(category.label()));
                    }
                }
            }
        }
    }

    #[test]
    fn allowed_decision_has_no_reason() {
        let result = ModerationResult::default()
            .with(ModerationCategory::Adult, Likelihood::Unlikely)
            .with(ModerationCategory::Racy, Likelihood::Unlikely);
        let decision = ThresholdModerationPolicy::strict().should_allow(&result);
        assert!(decision.allowed);
        assert_eq!(decision.reason, None);
        assert_eq!(decision.details, result);
    }

    #[test]
    fn reason_lists_categories_in_check_order() {
        let result = ModerationResult {
            adult: Likelihood::VeryLikely,
            violence: Likelihood::Possible,
            racy: Likelihood::Unlikely,
            spoof: Likelihood::Likely,
            medical: Likelihood::Possible,
        };
        let decision = ThresholdModerationPolicy::strict().should_allow(&result);
        assert_eq!(
            decision.reason.as_deref(),
            Some(
                "Imagen rechazada por: contenido adulto/desnudez, violencia explícita, \
                imagen manipulada/fake, contenido médico sensible"
            ),
        );
    }

    #[test]
    fn permissive_policy_allows_possible() {
        let policy = ThresholdModerationPolicy::new(Likelihood::Likely);
        let result = ModerationResult::default().with(ModerationCategory::Racy, Likelihood::Possible);
        assert!(policy.should_allow(&result).allowed);
        let result = ModerationResult::default().with(ModerationCategory::Racy, Likelihood::Likely);
        assert!(!policy.should_allow(&result).allowed);
    }
}
