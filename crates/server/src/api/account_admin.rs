use axum::{
    Extension,
    extract::{Path, State},
};
use model::{AccountId, ViolationList};
use tracing::info;

use super::utils::{Json, StatusCode};
use crate::app::AppState;

pub const PATH_POST_UNBAN: &str = "/account_admin_api/unban/{aid}";

/// Remove ban from account. Violation count is not changed.
///
/// Unbanning an account which is not banned is not an error.
///
/// # Access
/// - Admin account listed in the config file
#[utoipa::path(
    post,
    path = PATH_POST_UNBAN,
    params(AccountId),
    responses(
        (status = 200, description = "Successfull."),
        (status = 401, description = "Unauthorized."),
        (status = 403, description = "Caller is not an admin."),
        (status = 500, description = "Internal server error."),
    ),
    security(("account_id" = [])),
)]
pub async fn post_unban(
    State(state): State<AppState>,
    Extension(api_caller): Extension<AccountId>,
    Path(account): Path<AccountId>,
) -> Result<(), StatusCode> {
    state.ban_gate().unban_user(account).await?;
    info!("Account {} unbanned by admin {}", account, api_caller);
    Ok(())
}

pub const PATH_GET_VIOLATIONS: &str = "/account_admin_api/violations/{aid}";

/// Get content violations of an account. Oldest first.
///
/// # Access
/// - Admin account listed in the config file
#[utoipa::path(
    get,
    path = PATH_GET_VIOLATIONS,
    params(AccountId),
    responses(
        (status = 200, description = "Successfull.", body = ViolationList),
        (status = 401, description = "Unauthorized."),
        (status = 403, description = "Caller is not an admin."),
        (status = 500, description = "Internal server error."),
    ),
    security(("account_id" = [])),
)]
pub async fn get_violations(
    State(state): State<AppState>,
    Path(account): Path<AccountId>,
) -> Result<Json<ViolationList>, StatusCode> {
    let violations = state.sanctions().violations(account).await?;
    Ok(ViolationList { violations }.into())
}
