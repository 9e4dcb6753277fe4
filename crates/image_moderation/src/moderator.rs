use std::sync::Arc;

use config::ImageModerationSettings;
use error_stack::{Result, ResultExt};
use model::{ModerationDecision, ModerationResult};
use tracing::{error, info};
use utils::ContextExt;

use crate::{
    GoogleVisionClassifier, ImageClassifier, ModerationPolicy, ThresholdModerationPolicy,
};

#[derive(thiserror::Error, Debug)]
pub enum ModerationError {
    /// User visible error. Classifier error details are only logged.
    #[error("No se pudo verificar la imagen. Por favor, intenta de nuevo.")]
    ImageVerificationFailed,
    #[error("Image moderator creation failed")]
    Init,
}

/// Runs the classifier and the policy for uploaded images.
pub struct ImageModerator {
    enabled: bool,
    classifier: Option<Arc<dyn ImageClassifier>>,
    policy: Arc<dyn ModerationPolicy>,
}

impl ImageModerator {
    /// Classifier is required when `enabled` is true.
    pub fn new(
        enabled: bool,
        classifier: Option<Arc<dyn ImageClassifier>>,
        policy: Arc<dyn ModerationPolicy>,
    ) -> Result<Self, ModerationError> {
        if enabled && classifier.is_none() {
            return Err(ModerationError::Init.report())
                .attach_printable("Moderation is enabled but classifier is missing");
        }

        Ok(Self {
            enabled,
            classifier,
            policy,
        })
    }

    /// Create moderator using Google Cloud Vision and the strict policy.
    /// Invalid credentials make this fail.
    pub fn from_settings(
        settings: &ImageModerationSettings,
        client: reqwest::Client,
    ) -> Result<Self, ModerationError> {
        let classifier: Option<Arc<dyn ImageClassifier>> = if settings.enabled {
            let classifier = GoogleVisionClassifier::new(settings, client)
                .change_context(ModerationError::Init)?;
            Some(Arc::new(classifier))
        } else {
            info!("Image moderation disabled, classifier is not created");
            None
        };

        Self::new(
            settings.enabled,
            classifier,
            Arc::new(ThresholdModerationPolicy::strict()),
        )
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Classify the image and apply the policy. A denied image is a
    /// normal decision, not an error.
    pub async fn check_image(&self, image: &[u8]) -> Result<ModerationDecision, ModerationError> {
        let classifier = match &self.classifier {
            Some(classifier) if self.enabled => classifier,
            _ => return Ok(ModerationDecision::allow(ModerationResult::all_very_unlikely())),
        };

        let result = match classifier.classify(image).await {
            Ok(result) => result,
            Err(e) => {
                error!("Image classification failed: {:?}", e);
                return Err(ModerationError::ImageVerificationFailed.report());
            }
        };

        let decision = self.policy.should_allow(&result);
        if !decision.allowed {
            info!(
                "Image rejected: {}",
                decision.reason.as_deref().unwrap_or_default()
            );
        }

        Ok(decision)
    }
}
