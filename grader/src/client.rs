//! # Scoring service client
//!
//! [`GradingClient`] is the seam between the dispatcher and whatever scores a
//! portfolio. [`MlClient`] is the production implementation: one
//! `POST {ML_SERVICE_URL}/grade` per portfolio, no retries. Retrying is the
//! caller's business.

use crate::error::GradingServiceError;
use crate::request::{GradeRequest, GradeResult};
use async_trait::async_trait;
use std::time::Duration;
use util::config::{AppConfig, DEFAULT_ML_TIMEOUT_MS};

#[async_trait]
pub trait GradingClient: Send + Sync {
    async fn grade(&self, request: &GradeRequest) -> Result<GradeResult, GradingServiceError>;
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    /// Whole-request timeout. Inference is slow, so the default is long.
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".into(),
            timeout: Duration::from_millis(DEFAULT_ML_TIMEOUT_MS),
        }
    }
}

impl From<&AppConfig> for ClientConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            base_url: cfg.ml_service_url.clone(),
            timeout: cfg.ml_timeout(),
        }
    }
}

/// HTTP client for the ML scoring service.
#[derive(Debug, Clone)]
pub struct MlClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl MlClient {
    pub fn new(config: ClientConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Probe `GET /health`. `Ok(false)` means the service answered but is not ready.
    pub async fn health(&self) -> Result<bool, reqwest::Error> {
        let response = self.http.get(self.endpoint("health")).send().await?;
        if !response.status().is_success() {
            return Ok(false);
        }
        let body: serde_json::Value = response.json().await?;
        Ok(body.get("ok").and_then(|v| v.as_bool()).unwrap_or(false))
    }

    fn classify(&self, portfolio_id: i64, err: reqwest::Error) -> GradingServiceError {
        if err.is_timeout() {
            GradingServiceError::Timeout {
                portfolio_id,
                detail: format!(
                    "no response within {}ms ({err})",
                    self.config.timeout.as_millis()
                ),
            }
        } else {
            GradingServiceError::Transport {
                portfolio_id,
                status: err.status().map(|s| s.as_u16()),
                detail: err.to_string(),
            }
        }
    }

    async fn send(&self, request: &GradeRequest) -> Result<GradeResult, GradingServiceError> {
        let portfolio_id = request.portfolio_id();

        let response = self
            .http
            .post(self.endpoint("grade"))
            .json(&request.payload())
            .send()
            .await
            .map_err(|e| self.classify(portfolio_id, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.classify(portfolio_id, e))?;

        if !status.is_success() {
            return Err(GradingServiceError::Status {
                portfolio_id,
                status: status.as_u16(),
                detail: error_detail(&body, status.canonical_reason()),
            });
        }

        serde_json::from_str::<GradeResult>(&body).map_err(|e| GradingServiceError::Transport {
            portfolio_id,
            status: Some(status.as_u16()),
            detail: format!("error decoding response body: {e}. Full response: {body}"),
        })
    }
}

#[async_trait]
impl GradingClient for MlClient {
    async fn grade(&self, request: &GradeRequest) -> Result<GradeResult, GradingServiceError> {
        tracing::debug!(
            portfolio_id = request.portfolio_id(),
            file_path = %request.file_path().display(),
            has_rubric = request.rubric_text().is_some(),
            "sending portfolio to scoring service"
        );

        let result = self.send(request).await;

        if let Err(err) = &result {
            tracing::error!(
                portfolio_id = request.portfolio_id(),
                file_path = %request.file_path().display(),
                status = ?err.status(),
                kind = err.kind(),
                "ML grading request failed: {err}"
            );
        }
        result
    }
}

/// The service's own explanation: its `detail` field when the body is JSON
/// carrying one, else the whole body.
fn error_detail(body: &str, reason: Option<&str>) -> String {
    if body.trim().is_empty() {
        return reason.unwrap_or("empty response").to_string();
    }
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(json) => match json.get("detail") {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => json.to_string(),
        },
        Err(_) => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_prefers_structured_field() {
        assert_eq!(
            error_detail(r#"{"detail":"Ollama not running"}"#, Some("Internal Server Error")),
            "Ollama not running"
        );
        assert_eq!(
            error_detail(r#"{"detail":[{"loc":["body","file_path"]}]}"#, None),
            r#"[{"loc":["body","file_path"]}]"#
        );
        assert_eq!(error_detail(r#"{"error":"boom"}"#, None), r#"{"error":"boom"}"#);
        assert_eq!(error_detail("gateway down", None), "gateway down");
        assert_eq!(error_detail("", Some("Bad Gateway")), "Bad Gateway");
    }

    #[test]
    fn endpoint_tolerates_trailing_slash() {
        let client = MlClient::new(ClientConfig {
            base_url: "http://ml:8000/".into(),
            timeout: Duration::from_secs(1),
        })
        .unwrap();
        assert_eq!(client.endpoint("grade"), "http://ml:8000/grade");
    }

    #[test]
    fn default_timeout_is_ten_minutes() {
        assert_eq!(ClientConfig::default().timeout, Duration::from_secs(600));
    }
}
