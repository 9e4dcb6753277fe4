use axum::{
    body::Body,
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use model::{AccountId, UnixTime};
use serde::Serialize;
use server_data::{DataError, FileError, SanctionError};
use utoipa::{
    Modify,
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
};

use crate::app::AppState;

/// Account ID of the API caller. Upstream authentication sets this.
pub const ACCOUNT_ID_HEADER_STR: &str = "x-account-id";

fn account_id_from_headers(headers: &HeaderMap) -> Result<AccountId, StatusCode> {
    let header = headers
        .get(ACCOUNT_ID_HEADER_STR)
        .ok_or(StatusCode::UNAUTHORIZED)?;
    let value = header.to_str().map_err(|_| StatusCode::BAD_REQUEST)?;
    value.parse().map_err(|_| StatusCode::BAD_REQUEST)
}

/// Middleware for identifying the API caller.
///
/// Adds `AccountId` extension to request, so that adding
/// "Extension(api_caller): Extension<AccountId>"
/// to handlers is possible.
pub async fn authenticate_with_account_id(
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let id = account_id_from_headers(req.headers())?;
    req.extensions_mut().insert(id);
    Ok(next.run(req).await)
}

/// Middleware which blocks requests from currently banned accounts.
///
/// Must run after [authenticate_with_account_id].
pub async fn ban_gate(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let id = req
        .extensions()
        .get::<AccountId>()
        .copied()
        .ok_or(StatusCode::UNAUTHORIZED)?;

    match state
        .ban_gate()
        .check_at(id, UnixTime::current_time())
        .await?
    {
        Some(denial) => {
            tracing::info!("Request from banned account {} denied", id);
            Ok((axum::http::StatusCode::FORBIDDEN, Json(denial)).into_response())
        }
        None => Ok(next.run(req).await),
    }
}

/// Middleware which allows only admin accounts to continue.
///
/// Must run after [authenticate_with_account_id].
pub async fn authorize_admin(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let id = req
        .extensions()
        .get::<AccountId>()
        .copied()
        .ok_or(StatusCode::UNAUTHORIZED)?;

    if !state.admins().is_admin(id) {
        tracing::warn!("Admin API access denied for account {}", id);
        return Err(StatusCode::FORBIDDEN);
    }

    Ok(next.run(req).await)
}

/// Utoipa API doc security config
pub struct SecurityApiAccountIdDefault;

impl Modify for SecurityApiAccountIdDefault {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "account_id",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(ACCOUNT_ID_HEADER_STR))),
            )
        }
    }
}

pub struct Json<T>(pub T);

impl<T> From<T> for Json<T> {
    fn from(value: T) -> Self {
        Self(value)
    }
}

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 400
    BAD_REQUEST,
    /// 401
    UNAUTHORIZED,
    /// 403
    FORBIDDEN,
    /// 500
    INTERNAL_SERVER_ERROR,
}

impl From<StatusCode> for axum::http::StatusCode {
    fn from(value: StatusCode) -> Self {
        match value {
            StatusCode::BAD_REQUEST => axum::http::StatusCode::BAD_REQUEST,
            StatusCode::UNAUTHORIZED => axum::http::StatusCode::UNAUTHORIZED,
            StatusCode::FORBIDDEN => axum::http::StatusCode::FORBIDDEN,
            StatusCode::INTERNAL_SERVER_ERROR => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for StatusCode {
    fn into_response(self) -> Response {
        let status: axum::http::StatusCode = self.into();
        status.into_response()
    }
}

#[derive(thiserror::Error, Debug)]
enum RequestError {
    #[error("Sanction handling failed")]
    Sanction,
    #[error("Data reading or writing failed")]
    Data,
    #[error("File error")]
    File,
}

macro_rules! impl_error_to_status_code {
    ($err_type:ty, $err_expr:expr) => {
        impl From<error_stack::Report<$err_type>> for StatusCode {
            #[track_caller]
            fn from(value: error_stack::Report<$err_type>) -> Self {
                tracing::error!("{:?}", value.change_context($err_expr));
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    };
}

impl_error_to_status_code!(SanctionError, RequestError::Sanction);
impl_error_to_status_code!(DataError, RequestError::Data);
impl_error_to_status_code!(FileError, RequestError::File);
