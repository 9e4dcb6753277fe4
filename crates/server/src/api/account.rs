use axum::{Extension, extract::State};
use model::{AccountId, BanState, UnixTime};

use super::utils::{Json, StatusCode};
use crate::app::AppState;

pub const PATH_GET_BAN_INFO: &str = "/account_api/ban_info";

/// Get current ban state of the API caller.
///
/// Expired temporary ban is reported as not banned.
#[utoipa::path(
    get,
    path = PATH_GET_BAN_INFO,
    responses(
        (status = 200, description = "Successfull.", body = BanState),
        (status = 401, description = "Unauthorized."),
        (status = 500, description = "Internal server error."),
    ),
    security(("account_id" = [])),
)]
pub async fn get_ban_info(
    State(state): State<AppState>,
    Extension(api_caller): Extension<AccountId>,
) -> Result<Json<BanState>, StatusCode> {
    let ban_state = state
        .ban_gate()
        .ban_state_at(api_caller, UnixTime::current_time())
        .await?;
    Ok(ban_state.into())
}
