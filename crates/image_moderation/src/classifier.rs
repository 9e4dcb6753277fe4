use async_trait::async_trait;
use error_stack::Result;
use model::ModerationResult;

#[derive(thiserror::Error, Debug)]
pub enum ClassifierError {
    #[error("Classifier credentials are missing or invalid")]
    InvalidCredentials,
    #[error("Access token request failed")]
    TokenRequest,
    #[error("Image classifier API request failed")]
    ClassifierUnavailable,
    #[error("Image classifier API response was invalid")]
    InvalidResponse,
}

/// Rates image content. Implementations only report ratings and do not
/// decide whether the image is acceptable.
#[async_trait]
pub trait ImageClassifier: Send + Sync {
    async fn classify(&self, image: &[u8]) -> Result<ModerationResult, ClassifierError>;
}
