//! Runtime control surface: the resilience toggle and fault injection knobs.

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

pub fn setup_admin_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/resilience/status", get(get_status))
        .route("/resilience/toggle", post(toggle))
        .route("/resilience/enable", post(enable))
        .route("/resilience/disable", post(disable))
        .route("/mock/configure", post(configure_mock))
        .route("/mock/settings", get(get_mock_settings))
        .route_layer(middleware::from_fn_with_state(state, admin_auth_middleware))
}
