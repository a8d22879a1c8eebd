//! End-to-end tests over HTTP using the client SDK.

use std::time::Duration;

use resilience_toggle::observability::metrics::{TOGGLE_BYPASSED, TOGGLE_CHANGED};
use resilience_toggle::resilience::CircuitState;
use toggle_sdk::ToggleClient;

mod common;

#[tokio::test]
async fn test_toggle_round_trip() {
    let server = common::start_server(common::fast_config()).await;
    let client = ToggleClient::new(&server.url());

    let status = client.status().await.unwrap();
    assert!(status.enabled);
    assert!(status.patterns.circuit_breaker);

    let off = client.toggle(false).await.unwrap();
    assert!(off.previous_state);
    assert!(!off.current_state);
    assert_eq!(off.message, "Resilience patterns DISABLED (all protections bypassed)");
    assert!(!client.status().await.unwrap().enabled);

    let on = client.enable().await.unwrap();
    assert!(!on.previous_state);
    assert_eq!(
        on.message,
        "Resilience patterns ENABLED (circuit breaker, retry, bulkhead, rate limiter)"
    );

    // Setting the same value still reports the change request.
    let again = client.enable().await.unwrap();
    assert!(again.previous_state && again.current_state);
    assert_eq!(server.state.metrics.counter_total(TOGGLE_CHANGED), 3);
}

#[tokio::test]
async fn test_invalid_failure_rate_is_rejected() {
    let server = common::start_server(common::fast_config()).await;
    let client = ToggleClient::new(&server.url());

    let err = client.configure_mock(Some(1.5), None).await.unwrap_err();
    assert!(err.to_string().contains("400"), "{err}");
    assert_eq!(client.mock_settings().await.unwrap().failure_rate, 0.0);

    let ok = client.configure_mock(Some(0.25), Some(10)).await.unwrap();
    assert_eq!(ok.current_settings.failure_rate, 0.25);
    assert_eq!(ok.current_settings.delay_ms, 10);
}

#[tokio::test]
async fn test_enabled_failures_degrade_and_open_breaker() {
    let mut config = common::fast_config();
    config.mock.failure_rate = 1.0;
    config.resilience.circuit_breaker.failure_threshold = 3;
    let server = common::start_server(config).await;
    let client = ToggleClient::new(&server.url());

    for _ in 0..6 {
        let resp = client.call_external().await.unwrap();
        assert_eq!(resp.status_code, 200);
        assert_eq!(resp.status, "degraded");
        assert!(resp.response.unwrap().contains("Graceful Degradation"));
    }

    let breaker = server.state.gate.chain().circuit_breaker().state();
    assert!(matches!(breaker, CircuitState::Open { .. }), "{breaker:?}");
}

#[tokio::test]
async fn test_disabled_failures_reach_the_caller() {
    let mut config = common::fast_config();
    config.mock.failure_rate = 1.0;
    config.resilience.enabled = false;
    let server = common::start_server(config).await;
    let client = ToggleClient::new(&server.url());

    for _ in 0..10 {
        let resp = client.call_external().await.unwrap();
        assert_eq!(resp.status_code, 503);
        assert_eq!(resp.status, "error");
        assert_eq!(
            resp.message.as_deref(),
            Some("External service unavailable (simulated failure)")
        );
    }

    let chain = server.state.gate.chain();
    assert_eq!(chain.invocations(), 0);
    assert_eq!(chain.circuit_breaker().state(), CircuitState::initial());
    assert_eq!(server.state.metrics.counter_total(TOGGLE_BYPASSED), 10);
}

#[tokio::test]
async fn test_api_key_is_enforced() {
    let mut config = common::fast_config();
    config.admin.api_key = Some("s3cret".to_string());
    let server = common::start_server(config).await;

    let anonymous = ToggleClient::new(&server.url());
    assert!(anonymous.status().await.is_err());
    // The protected endpoint stays open.
    assert_eq!(anonymous.call_external().await.unwrap().status, "success");

    let admin = ToggleClient::new(&server.url()).with_api_key("s3cret");
    assert!(admin.disable().await.unwrap().previous_state);
}

#[tokio::test]
async fn test_graceful_shutdown() {
    let server = common::start_server(common::fast_config()).await;
    let client = ToggleClient::new(&server.url());
    assert!(client.status().await.is_ok());

    server.shutdown.trigger();
    let finished = tokio::time::timeout(Duration::from_secs(5), server.handle).await;
    assert!(matches!(finished, Ok(Ok(Ok(())))));
}
