//! Protected endpoint backed by the simulated external service.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::chaos::SimulatedFailure;
use crate::http::server::AppState;
use crate::resilience::fallback;

/// Operation identity used for toggle metrics and logs.
pub const EXTERNAL_OPERATION: &str = "ExternalService.callExternalService";

/// `GET /api/external`
pub async fn call_external(State(state): State<AppState>) -> Response {
    tracing::info!("External service call initiated");

    let injector = &state.injector;
    let (result, outcome) = state
        .gate
        .invoke_with_outcome(
            EXTERNAL_OPERATION,
            || injector.call(),
            fallback::degraded_response::<SimulatedFailure>,
        )
        .await;

    match result {
        Ok(response) if outcome.is_degraded() => (
            StatusCode::OK,
            Json(json!({ "status": "degraded", "response": response })),
        )
            .into_response(),
        Ok(response) => (
            StatusCode::OK,
            Json(json!({ "status": "success", "response": response })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "External service call failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "error", "message": e.to_string() })),
            )
                .into_response()
        }
    }
}
