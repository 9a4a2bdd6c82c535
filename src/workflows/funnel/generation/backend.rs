use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::compliance::{ComplianceReport, ComplianceReviewer};
use crate::workflows::funnel::domain::FunnelStructure;

/// Free-text prompt plus the business context forwarded verbatim to the
/// generation backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    #[serde(default)]
    pub context: serde_json::Value,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            context: serde_json::Value::Null,
        }
    }
}

/// Per-attempt failure taxonomy. Everything except `Auth` is eligible for
/// retry under the orchestrator's policy.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GenerationError {
    #[error("attempt exceeded its allotted time")]
    Timeout,
    #[error("authentication rejected by generation backend: {0}")]
    Auth(String),
    #[error("generation backend unavailable: {0}")]
    Backend(String),
    #[error("generation backend declined the request: {0}")]
    Rejected(String),
    #[error("generation backend returned an unusable payload: {0}")]
    InvalidResponse(String),
    #[error("generated funnel is structurally incomplete: {0}")]
    Incomplete(String),
    #[error("compliance review blocked the result: {0}")]
    ComplianceBlocking(String),
}

impl GenerationError {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, GenerationError::Auth(_))
    }

    /// Short class name for telemetry fields.
    pub const fn class(&self) -> &'static str {
        match self {
            GenerationError::Timeout => "timeout",
            GenerationError::Auth(_) => "auth",
            GenerationError::Backend(_) => "backend",
            GenerationError::Rejected(_) => "rejected",
            GenerationError::InvalidResponse(_) => "invalid_response",
            GenerationError::Incomplete(_) => "incomplete",
            GenerationError::ComplianceBlocking(_) => "compliance_blocking",
        }
    }
}

/// Outbound hook for a generation path (primary or fallback).
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn generate(&self, request: &GenerationRequest)
        -> Result<FunnelStructure, GenerationError>;

    /// Label used in telemetry events.
    fn label(&self) -> &str;
}

/// Connection settings for the hosted generation service.
#[derive(Debug, Clone)]
pub struct GenerationBackendConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub request_timeout: Duration,
}

impl Default for GenerationBackendConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8787/v1/funnels".to_string(),
            api_key: None,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// HTTP client for the hosted generation service. The wire contract is the
/// logical `{success, funnel | error}` envelope; transport-level failures map
/// onto the retryable error classes.
pub struct HttpGenerationBackend {
    client: Client,
    config: GenerationBackendConfig,
    label: String,
}

impl HttpGenerationBackend {
    pub fn new(
        label: impl Into<String>,
        config: GenerationBackendConfig,
    ) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| GenerationError::Backend(format!("http client: {err}")))?;

        Ok(Self {
            client,
            config,
            label: label.into(),
        })
    }

    fn classify_status(status: StatusCode, body: String) -> GenerationError {
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            GenerationError::Auth(body)
        } else if status.is_server_error() {
            GenerationError::Backend(format!("status {status}: {body}"))
        } else {
            GenerationError::Rejected(format!("status {status}: {body}"))
        }
    }
}

#[async_trait]
impl GenerationBackend for HttpGenerationBackend {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<FunnelStructure, GenerationError> {
        let mut outbound = self.client.post(&self.config.endpoint).json(request);
        if let Some(api_key) = &self.config.api_key {
            outbound = outbound.bearer_auth(api_key);
        }

        let response = outbound.send().await.map_err(|err| {
            if err.is_timeout() {
                GenerationError::Timeout
            } else {
                GenerationError::Backend(err.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::classify_status(status, body));
        }

        let envelope: GenerationEnvelope = response
            .json()
            .await
            .map_err(|err| GenerationError::InvalidResponse(err.to_string()))?;

        if !envelope.success {
            return Err(GenerationError::Rejected(
                envelope.error.unwrap_or_else(|| "unspecified".to_string()),
            ));
        }

        envelope
            .funnel
            .ok_or_else(|| GenerationError::InvalidResponse("success without funnel".to_string()))
    }

    fn label(&self) -> &str {
        &self.label
    }
}

#[derive(Debug, Deserialize)]
struct GenerationEnvelope {
    success: bool,
    #[serde(default)]
    funnel: Option<FunnelStructure>,
    #[serde(default)]
    error: Option<String>,
}

/// HTTP client for the compliance/validation service.
pub struct HttpComplianceReviewer {
    client: Client,
    config: GenerationBackendConfig,
}

impl HttpComplianceReviewer {
    pub fn new(config: GenerationBackendConfig) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| GenerationError::Backend(format!("http client: {err}")))?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl ComplianceReviewer for HttpComplianceReviewer {
    async fn review(&self, funnel: &FunnelStructure) -> Result<ComplianceReport, GenerationError> {
        let mut outbound = self.client.post(&self.config.endpoint).json(funnel);
        if let Some(api_key) = &self.config.api_key {
            outbound = outbound.bearer_auth(api_key);
        }

        let response = outbound.send().await.map_err(|err| {
            if err.is_timeout() {
                GenerationError::Timeout
            } else {
                GenerationError::Backend(err.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HttpGenerationBackend::classify_status(status, body));
        }

        response
            .json()
            .await
            .map_err(|err| GenerationError::InvalidResponse(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification_separates_auth_from_transient() {
        let auth = HttpGenerationBackend::classify_status(
            StatusCode::UNAUTHORIZED,
            "bad key".to_string(),
        );
        assert!(matches!(auth, GenerationError::Auth(_)));
        assert!(!auth.is_retryable());

        let transient = HttpGenerationBackend::classify_status(
            StatusCode::BAD_GATEWAY,
            "upstream down".to_string(),
        );
        assert!(matches!(transient, GenerationError::Backend(_)));
        assert!(transient.is_retryable());

        let rejected =
            HttpGenerationBackend::classify_status(StatusCode::BAD_REQUEST, "nope".to_string());
        assert!(matches!(rejected, GenerationError::Rejected(_)));
    }

    #[test]
    fn envelope_parses_both_shapes() {
        let success: GenerationEnvelope = serde_json::from_str(
            r#"{"success":true,"funnel":{"id":"fnl-1","name":"Launch","steps":[]}}"#,
        )
        .expect("parse");
        assert!(success.success);
        assert!(success.funnel.is_some());

        let failure: GenerationEnvelope =
            serde_json::from_str(r#"{"success":false,"error":"quota exceeded"}"#).expect("parse");
        assert!(!failure.success);
        assert_eq!(failure.error.as_deref(), Some("quota exceeded"));
    }
}
