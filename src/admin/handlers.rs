use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::validation::{validate_delay_ms, validate_failure_rate};
use crate::config::{FaultSettings, ValidationError};
use crate::http::server::AppState;

const ENABLED_MESSAGE: &str = "Resilience patterns ENABLED (circuit breaker, retry, bulkhead, rate limiter)";
const DISABLED_MESSAGE: &str = "Resilience patterns DISABLED (all protections bypassed)";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternStatus {
    pub circuit_breaker: bool,
    pub retry: bool,
    pub bulkhead: bool,
    pub rate_limiter: bool,
}

#[derive(Debug, Serialize)]
pub struct ResilienceStatus {
    pub enabled: bool,
    pub patterns: PatternStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleResponse {
    pub previous_state: bool,
    pub current_state: bool,
    pub message: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct ToggleParams {
    pub enabled: bool,
}

/// Partial fault-injection update. Absent fields keep their value.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockSettingsUpdate {
    pub failure_rate: Option<f64>,
    pub delay_ms: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MockConfigureResponse {
    pub message: &'static str,
    pub current_settings: FaultSettings,
}

#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("invalid request body: {0}")]
    InvalidBody(String),
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        tracing::warn!(error = %self, "Rejected admin request");
        (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}

pub async fn get_status(State(state): State<AppState>) -> Json<ResilienceStatus> {
    let enabled = state.store.is_enabled();
    Json(ResilienceStatus {
        enabled,
        patterns: PatternStatus {
            circuit_breaker: enabled,
            retry: enabled,
            bulkhead: enabled,
            rate_limiter: enabled,
        },
    })
}

pub async fn toggle(
    State(state): State<AppState>,
    Query(params): Query<ToggleParams>,
) -> Json<ToggleResponse> {
    Json(apply_toggle(&state, params.enabled))
}

pub async fn enable(State(state): State<AppState>) -> Json<ToggleResponse> {
    Json(apply_toggle(&state, true))
}

pub async fn disable(State(state): State<AppState>) -> Json<ToggleResponse> {
    Json(apply_toggle(&state, false))
}

fn apply_toggle(state: &AppState, enabled: bool) -> ToggleResponse {
    let previous = state.store.set_enabled(enabled);
    tracing::warn!(
        previous,
        current = enabled,
        "Resilience toggle changed (all patterns affected)"
    );
    state.metrics.record_toggle(previous, enabled);

    ToggleResponse {
        previous_state: previous,
        current_state: enabled,
        message: if enabled { ENABLED_MESSAGE } else { DISABLED_MESSAGE },
    }
}

/// `POST /mock/configure`: JSON body fields win over query parameters.
///
/// Every supplied value is validated before any is applied.
pub async fn configure_mock(
    State(state): State<AppState>,
    Query(query): Query<MockSettingsUpdate>,
    body: Bytes,
) -> Result<Json<MockConfigureResponse>, AdminError> {
    let from_body = if body.iter().all(u8::is_ascii_whitespace) {
        MockSettingsUpdate::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| AdminError::InvalidBody(e.to_string()))?
    };

    let failure_rate = from_body.failure_rate.or(query.failure_rate);
    let delay_ms = from_body.delay_ms.or(query.delay_ms);

    failure_rate.map(validate_failure_rate).transpose()?;
    delay_ms.map(validate_delay_ms).transpose()?;

    if let Some(rate) = failure_rate {
        state.store.set_failure_rate(rate)?;
    }
    if let Some(delay) = delay_ms {
        state.store.set_delay_ms(delay)?;
    }

    let current = state.store.fault_settings();
    tracing::info!(
        failure_rate = current.failure_rate,
        delay_ms = current.delay_ms,
        "Mock service configuration updated"
    );

    Ok(Json(MockConfigureResponse {
        message: "Mock configuration updated",
        current_settings: current,
    }))
}

pub async fn get_mock_settings(State(state): State<AppState>) -> Json<FaultSettings> {
    Json(state.store.fault_settings())
}
