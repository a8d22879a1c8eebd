use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub type SdkError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternStatus {
    pub circuit_breaker: bool,
    pub retry: bool,
    pub bulkhead: bool,
    pub rate_limiter: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResilienceStatus {
    pub enabled: bool,
    pub patterns: PatternStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleResponse {
    pub previous_state: bool,
    pub current_state: bool,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaultSettings {
    pub failure_rate: f64,
    pub delay_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockConfigureResponse {
    pub message: String,
    pub current_settings: FaultSettings,
}

/// Body of `GET /api/external`. `status` is "success", "degraded" or "error".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalResponse {
    #[serde(skip)]
    pub status_code: u16,
    pub status: String,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MockSettingsUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    failure_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    delay_ms: Option<i64>,
}

pub struct ToggleClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl ToggleClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: None,
        }
    }

    /// Send `Authorization: Bearer <key>` on admin calls.
    pub fn with_api_key(mut self, api_key: &str) -> Self {
        self.api_key = Some(api_key.to_string());
        self
    }

    pub async fn status(&self) -> Result<ResilienceStatus, SdkError> {
        self.send(self.admin(self.client.get(self.url("/resilience/status")))).await
    }

    pub async fn toggle(&self, enabled: bool) -> Result<ToggleResponse, SdkError> {
        let req = self
            .client
            .post(self.url("/resilience/toggle"))
            .query(&[("enabled", enabled)]);
        self.send(self.admin(req)).await
    }

    pub async fn enable(&self) -> Result<ToggleResponse, SdkError> {
        self.send(self.admin(self.client.post(self.url("/resilience/enable")))).await
    }

    pub async fn disable(&self) -> Result<ToggleResponse, SdkError> {
        self.send(self.admin(self.client.post(self.url("/resilience/disable")))).await
    }

    /// Update fault injection. `None` fields are left unchanged.
    pub async fn configure_mock(
        &self,
        failure_rate: Option<f64>,
        delay_ms: Option<i64>,
    ) -> Result<MockConfigureResponse, SdkError> {
        let req = self
            .client
            .post(self.url("/mock/configure"))
            .json(&MockSettingsUpdate { failure_rate, delay_ms });
        self.send(self.admin(req)).await
    }

    pub async fn mock_settings(&self) -> Result<FaultSettings, SdkError> {
        self.send(self.admin(self.client.get(self.url("/mock/settings")))).await
    }

    /// Call the protected endpoint. A 503 is returned as a value, not an error.
    pub async fn call_external(&self) -> Result<ExternalResponse, SdkError> {
        let resp = self.client.get(self.url("/api/external")).send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        let mut body: ExternalResponse = serde_json::from_str(&text)
            .map_err(|e| format!("Unexpected response ({}): {} [{}]", status, text, e))?;
        body.status_code = status.as_u16();
        Ok(body)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn admin(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => req.bearer_auth(key),
            None => req,
        }
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, SdkError> {
        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(format!("Service returned error status {}: {}", status, text).into());
        }

        Ok(serde_json::from_str::<T>(&text)?)
    }
}
