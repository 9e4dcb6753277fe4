//! HTTP API

pub mod account;
pub mod account_admin;
pub mod media;
pub mod utils;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post, put},
};

use crate::app::AppState;

/// Routes which change account state. Ban gate is checked before these.
pub fn mutating_routes(state: AppState) -> Router {
    Router::new()
        .route(
            media::PATH_PUT_MODERATED_IMAGE,
            put(media::put_moderated_image)
                .layer(DefaultBodyLimit::max(media::MAX_IMAGE_SIZE_BYTES)),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            utils::ban_gate,
        ))
        .route_layer(middleware::from_fn(utils::authenticate_with_account_id))
        .with_state(state)
}

pub fn account_routes(state: AppState) -> Router {
    Router::new()
        .route(account::PATH_GET_BAN_INFO, get(account::get_ban_info))
        .route_layer(middleware::from_fn(utils::authenticate_with_account_id))
        .with_state(state)
}

/// Routes for admin accounts listed in the config file.
pub fn admin_routes(state: AppState) -> Router {
    Router::new()
        .route(account_admin::PATH_POST_UNBAN, post(account_admin::post_unban))
        .route(
            account_admin::PATH_GET_VIOLATIONS,
            get(account_admin::get_violations),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            utils::authorize_admin,
        ))
        .route_layer(middleware::from_fn(utils::authenticate_with_account_id))
        .with_state(state)
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(mutating_routes(state.clone()))
        .merge(account_routes(state.clone()))
        .merge(admin_routes(state))
}
