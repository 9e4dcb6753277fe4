use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Ordinal likelihood rating returned by the image classifier.
///
/// Variants are ordered from the least to the most likely, so comparison
/// operators can be used for thresholds.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Deserialize,
    Serialize,
    ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Likelihood {
    /// The classifier reports `UNKNOWN` when it can not rate a category.
    /// That is treated the same way as the lowest rating.
    #[default]
    #[serde(alias = "UNKNOWN")]
    VeryUnlikely,
    Unlikely,
    Possible,
    Likely,
    VeryLikely,
}

impl Likelihood {
    pub const ALL: [Likelihood; 5] = [
        Self::VeryUnlikely,
        Self::Unlikely,
        Self::Possible,
        Self::Likely,
        Self::VeryLikely,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ModerationCategory {
    Adult,
    Violence,
    Racy,
    Spoof,
    Medical,
}

impl ModerationCategory {
    /// Categories in the order the policy checks them.
    pub const ALL: [ModerationCategory; 5] = [
        Self::Adult,
        Self::Violence,
        Self::Racy,
        Self::Spoof,
        Self::Medical,
    ];

    /// User visible name of the category.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Adult => "contenido adulto/desnudez",
            Self::Violence => "violencia explícita",
            Self::Racy => "contenido sugestivo",
            Self::Spoof => "imagen manipulada/fake",
            Self::Medical => "contenido médico sensible",
        }
    }
}

/// Classifier output for one image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
pub struct ModerationResult {
    pub adult: Likelihood,
    pub violence: Likelihood,
    pub racy: Likelihood,
    pub spoof: Likelihood,
    pub medical: Likelihood,
}

impl ModerationResult {
    /// Result which every policy allows.
    pub fn all_very_unlikely() -> Self {
        Self::default()
    }

    pub fn get(&self, category: ModerationCategory) -> Likelihood {
        match category {
            ModerationCategory::Adult => self.adult,
            ModerationCategory::Violence => self.violence,
            ModerationCategory::Racy => self.racy,
            ModerationCategory::Spoof => self.spoof,
            ModerationCategory::Medical => self.medical,
        }
    }

    pub fn set(&mut self, category: ModerationCategory, value: Likelihood) {
        match category {
            ModerationCategory::Adult => self.adult = value,
            ModerationCategory::Violence => self.violence = value,
            ModerationCategory::Racy => self.racy = value,
            ModerationCategory::Spoof => self.spoof = value,
            ModerationCategory::Medical => self.medical = value,
        }
    }

    pub fn with(mut self, category: ModerationCategory, value: Likelihood) -> Self {
        self.set(category, value);
        self
    }

    /// Highest rating over all categories.
    pub fn max_likelihood(&self) -> Likelihood {
        ModerationCategory::ALL
            .iter()
            .map(|c| self.get(*c))
            .max()
            .unwrap_or_default()
    }
}

pub const REJECTED_IMAGE_REASON_PREFIX: &str = "Imagen rechazada por: ";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
pub struct ModerationDecision {
    pub allowed: bool,
    /// Comma separated list of violated categories. Only available when
    /// `allowed` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub details: ModerationResult,
}

impl ModerationDecision {
    pub fn allow(details: ModerationResult) -> Self {
        Self {
            allowed: true,
            reason: None,
            details,
        }
    }

    /// Create denied decision. Labels are joined in the given order.
    pub fn deny(violated: &[ModerationCategory], details: ModerationResult) -> Self {
        let labels = violated
            .iter()
            .map(|c| c.label())
            .collect::<Vec<_>>()
            .join(", ");
        Self {
            allowed: false,
            reason: Some(format!("{REJECTED_IMAGE_REASON_PREFIX}{labels}")),
            details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn likelihood_order_is_ascending() {
        for pair in Likelihood::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn likelihood_parses_classifier_names() {
        let value: Likelihood = serde_json::from_str("\"VERY_LIKELY\"").unwrap();
        assert_eq!(value, Likelihood::VeryLikely);
        let value: Likelihood = serde_json::from_str("\"UNKNOWN\"").unwrap();
        assert_eq!(value, Likelihood::VeryUnlikely);
    }

    #[test]
    fn deny_joins_labels_in_given_order() {
        let decision = ModerationDecision::deny(
            &[ModerationCategory::Adult, ModerationCategory::Racy],
            ModerationResult::default(),
        );
        assert!(!decision.allowed);
        assert_eq!(
            decision.reason.as_deref(),
            Some("Imagen rechazada por: contenido adulto/desnudez, contenido sugestivo"),
        );
    }
}
