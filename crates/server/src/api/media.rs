use axum::{
    Extension,
    body::Bytes,
    extract::State,
    response::{IntoResponse, Response},
};
use model::{
    AccountId, Likelihood, ModerationResult, NewViolation, VIOLATION_TYPE_INAPPROPRIATE_IMAGE,
    ViolationSeverity,
};
use serde::{Deserialize, Serialize};
use tracing::warn;
use utoipa::ToSchema;

use super::utils::{Json, StatusCode};
use crate::app::AppState;

pub const PATH_PUT_MODERATED_IMAGE: &str = "/media_api/moderated_image";

/// Maximum accepted image size.
pub const MAX_IMAGE_SIZE_BYTES: usize = 1024 * 1024 * 10;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
pub struct ContentUrl {
    pub url: String,
}

/// Upload was not accepted. The reason is user visible.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
pub struct ImageRejected {
    pub reason: String,
}

/// Severity for a rejected image. Adult content rated
/// [Likelihood::VeryLikely] is critical.
pub fn violation_severity(result: &ModerationResult) -> ViolationSeverity {
    if result.adult == Likelihood::VeryLikely {
        ViolationSeverity::Critical
    } else if result.max_likelihood() == Likelihood::VeryLikely {
        ViolationSeverity::High
    } else if result.max_likelihood() == Likelihood::Likely {
        ViolationSeverity::Medium
    } else {
        ViolationSeverity::Low
    }
}

/// Upload image which is checked before it is stored.
///
/// Rejected image is recorded as a content violation which might lead to
/// a ban.
///
/// # Access
/// - Account which is not banned
#[utoipa::path(
    put,
    path = PATH_PUT_MODERATED_IMAGE,
    request_body(content = Vec<u8>, content_type = "application/octet-stream"),
    responses(
        (status = 200, description = "Image accepted.", body = ContentUrl),
        (status = 401, description = "Unauthorized."),
        (status = 403, description = "Account is banned.", body = model::BanDenial),
        (status = 406, description = "Image rejected.", body = ImageRejected),
        (status = 500, description = "Internal server error."),
        (status = 503, description = "Image verification failed.", body = ImageRejected),
    ),
    security(("account_id" = [])),
)]
pub async fn put_moderated_image(
    State(state): State<AppState>,
    Extension(api_caller): Extension<AccountId>,
    image: Bytes,
) -> Result<Response, StatusCode> {
    if image.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let decision = match state.moderator().check_image(&image).await {
        Ok(decision) => decision,
        Err(e) => {
            let rejected = ImageRejected {
                reason: e.current_context().to_string(),
            };
            return Ok((
                axum::http::StatusCode::SERVICE_UNAVAILABLE,
                Json(rejected),
            )
                .into_response());
        }
    };

    if !decision.allowed {
        let severity = violation_severity(&decision.details);
        let violation = NewViolation {
            account_id: api_caller,
            violation_type: VIOLATION_TYPE_INAPPROPRIATE_IMAGE.to_string(),
            severity,
            moderation_details: decision.details,
            image_data: None,
        };
        let outcome = state.recorder().record_violation(violation).await?;
        warn!(
            "Image from account {} rejected, severity: {}, sanction: {:?}",
            api_caller,
            severity.as_str(),
            outcome
        );

        let rejected = ImageRejected {
            reason: decision.reason.unwrap_or_default(),
        };
        return Ok((axum::http::StatusCode::NOT_ACCEPTABLE, Json(rejected)).into_response());
    }

    let url = state.content().save(api_caller, &image).await?;
    Ok(Json(ContentUrl {
        url: url.to_string(),
    })
    .into_response())
}
