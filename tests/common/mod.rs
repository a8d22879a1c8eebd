//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::time::Duration;

use resilience_toggle::config::AppConfig;
use resilience_toggle::http::{AppState, HttpServer};
use resilience_toggle::lifecycle::Shutdown;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub struct TestServer {
    pub addr: SocketAddr,
    pub state: AppState,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<Result<(), std::io::Error>>,
}

impl TestServer {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

/// Config with fast retries and no injected latency.
#[allow(dead_code)]
pub fn fast_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.mock.delay_ms = 0;
    config.mock.failure_rate = 0.0;
    config.resilience.retry.base_delay_ms = 1;
    config.resilience.retry.max_delay_ms = 5;
    config
}

/// Start the service on an ephemeral port.
pub async fn start_server(config: AppConfig) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = HttpServer::new(config).unwrap();
    let state = server.state().clone();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();

    let handle = tokio::spawn(async move { server.run(listener, server_shutdown).await });
    tokio::time::sleep(Duration::from_millis(50)).await;

    TestServer {
        addr,
        state,
        shutdown,
        handle,
    }
}
