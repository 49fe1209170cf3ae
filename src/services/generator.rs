use std::collections::HashMap;
use std::time::{Duration as StdDuration, Instant};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value as JsonValue};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult, GeneratorErrorCode};
use crate::models::settings::GeneratorConfig;
use crate::services::prompt_templates::{day_planning_system_prompt, distribution_system_prompt};

/// External schedule generator. Implementations return the raw structured
/// response; validation happens in the orchestrator.
#[async_trait]
pub trait ScheduleGenerator: Send + Sync {
    async fn plan_day(&self, payload: &JsonValue) -> AppResult<JsonValue>;

    async fn distribute(&self, payload: &JsonValue) -> AppResult<JsonValue>;
}

#[derive(Clone, Copy)]
enum GeneratorOperation {
    PlanDay,
    Distribute,
}

impl GeneratorOperation {
    fn as_str(self) -> &'static str {
        match self {
            GeneratorOperation::PlanDay => "planDay",
            GeneratorOperation::Distribute => "distributeTasks",
        }
    }

    fn system_prompt(self) -> &'static str {
        match self {
            GeneratorOperation::PlanDay => day_planning_system_prompt(),
            GeneratorOperation::Distribute => distribution_system_prompt(),
        }
    }

    fn temperature(self) -> f32 {
        match self {
            GeneratorOperation::PlanDay => 0.3,
            GeneratorOperation::Distribute => 0.2,
        }
    }
}

/// OpenAI-compatible chat-completions client. Each call is a single attempt;
/// failures surface immediately so the orchestrator can fall back.
pub struct ChatCompletionGenerator {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
}

impl ChatCompletionGenerator {
    pub fn try_new(config: &GeneratorConfig) -> AppResult<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                AppError::generator(
                    GeneratorErrorCode::NotConfigured,
                    "generator API key is not configured",
                )
            })?
            .to_string();

        let client = reqwest::Client::builder()
            .timeout(StdDuration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(2)
            .pool_idle_timeout(Some(StdDuration::from_secs(90)))
            .build()
            .map_err(|err| AppError::other(format!("failed to build generator HTTP client: {err}")))?;

        let base_url = config.base_url.trim_end_matches('/');
        let endpoint = format!("{}/v1/chat/completions", base_url);

        Ok(Self {
            client,
            api_key,
            endpoint,
            model: config.model.clone(),
        })
    }

    async fn invoke_chat(
        &self,
        operation: GeneratorOperation,
        payload: &JsonValue,
    ) -> AppResult<JsonValue> {
        let correlation_id = Uuid::new_v4().to_string();
        let request_body = self.build_request_body(operation, payload);

        debug!(
            target: "app::generator",
            operation = operation.as_str(),
            correlation_id = %correlation_id,
            model = %self.model,
            "invoking schedule generator"
        );

        let start = Instant::now();
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await;

        let resp = match response {
            Ok(resp) => resp,
            Err(err) => {
                let error = Self::error_from_reqwest(err, correlation_id.as_str());
                warn!(
                    target: "app::generator",
                    correlation_id = %correlation_id,
                    code = ?error.generator_code(),
                    "generator request failed"
                );
                return Err(error);
            }
        };

        let status = resp.status();
        if !status.is_success() {
            warn!(
                target: "app::generator",
                correlation_id = %correlation_id,
                status = status.as_u16(),
                "generator returned non-success status"
            );
            return Err(Self::map_http_error(status, correlation_id.as_str()));
        }

        let latency_ms = start.elapsed().as_millis();
        let body: JsonValue = resp.json().await.map_err(|err| {
            AppError::generator_with_details(
                GeneratorErrorCode::InvalidResponse,
                "failed to decode generator response body",
                Some(correlation_id.as_str()),
                Some(json!({ "reason": err.to_string() })),
            )
        })?;

        let content = body
            .pointer("/choices/0/message/content")
            .and_then(|value| value.as_str())
            .ok_or_else(|| {
                AppError::generator_with_details(
                    GeneratorErrorCode::InvalidResponse,
                    "generator response is missing message.content",
                    Some(correlation_id.as_str()),
                    Some(json!({ "reason": "missing_message_content" })),
                )
            })?;
        let content_value = Self::parse_content(content, &correlation_id)?;
        let tokens_used = Self::extract_tokens(&body);

        debug!(
            target: "app::generator",
            correlation_id = %correlation_id,
            latency_ms,
            tokens = ?tokens_used,
            "schedule generator responded"
        );

        Ok(content_value)
    }

    fn build_request_body(&self, operation: GeneratorOperation, payload: &JsonValue) -> JsonValue {
        let user_content = serde_json::to_string(payload).unwrap_or_else(|_| "{}".to_string());
        json!({
            "model": self.model,
            "temperature": operation.temperature(),
            "top_p": 0.9,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": operation.system_prompt() },
                { "role": "user", "content": user_content }
            ]
        })
    }

    fn parse_content(content: &str, correlation_id: &str) -> AppResult<JsonValue> {
        let trimmed = content.trim();
        let cleaned = if trimmed.starts_with("```") {
            trimmed
                .trim_start_matches("```json")
                .trim_start_matches("```JSON")
                .trim_start_matches("```")
                .trim_end_matches("```")
                .trim()
        } else {
            trimmed
        };

        serde_json::from_str(cleaned).map_err(|err| {
            AppError::generator_with_details(
                GeneratorErrorCode::InvalidResponse,
                format!("generator content is not JSON: {err}"),
                Some(correlation_id),
                Some(json!({ "reason": "invalid_json" })),
            )
        })
    }

    fn extract_tokens(body: &JsonValue) -> HashMap<String, u64> {
        let mut tokens = HashMap::new();

        if let Some(usage) = body.get("usage") {
            for (field, key) in [
                ("prompt_tokens", "prompt"),
                ("completion_tokens", "completion"),
                ("total_tokens", "total"),
            ] {
                if let Some(value) = usage.get(field).and_then(|v| v.as_u64()) {
                    tokens.insert(key.to_string(), value);
                }
            }
        }

        tokens
    }

    fn map_http_error(status: StatusCode, correlation_id: &str) -> AppError {
        let (code, message) = match status {
            StatusCode::UNAUTHORIZED => (
                GeneratorErrorCode::NotConfigured,
                "generator API key is invalid or unauthorized".to_string(),
            ),
            StatusCode::FORBIDDEN => (
                GeneratorErrorCode::Forbidden,
                "generator API access is forbidden".to_string(),
            ),
            StatusCode::TOO_MANY_REQUESTS => (
                GeneratorErrorCode::RateLimited,
                "generator rate limit reached".to_string(),
            ),
            status if status.is_server_error() => (
                GeneratorErrorCode::Unavailable,
                format!("generator unavailable (status {})", status.as_u16()),
            ),
            StatusCode::BAD_REQUEST => (
                GeneratorErrorCode::InvalidRequest,
                "generator rejected the request format".to_string(),
            ),
            StatusCode::NOT_FOUND => (
                GeneratorErrorCode::InvalidRequest,
                "generator endpoint not found".to_string(),
            ),
            status => (
                GeneratorErrorCode::Unknown,
                format!("generator returned status {}", status.as_u16()),
            ),
        };

        AppError::generator_with_details(code, message, Some(correlation_id), None)
    }

    fn error_from_reqwest(err: reqwest::Error, correlation_id: &str) -> AppError {
        if err.is_timeout() {
            AppError::generator_with_details(
                GeneratorErrorCode::Timeout,
                "generator request timed out",
                Some(correlation_id),
                None,
            )
        } else if err.is_connect() {
            AppError::generator_with_details(
                GeneratorErrorCode::Unavailable,
                "could not connect to generator",
                Some(correlation_id),
                None,
            )
        } else if let Some(status) = err.status() {
            Self::map_http_error(status, correlation_id)
        } else {
            AppError::generator_with_details(
                GeneratorErrorCode::Unknown,
                format!("generator request failed: {err}"),
                Some(correlation_id),
                None,
            )
        }
    }
}

#[async_trait]
impl ScheduleGenerator for ChatCompletionGenerator {
    async fn plan_day(&self, payload: &JsonValue) -> AppResult<JsonValue> {
        self.invoke_chat(GeneratorOperation::PlanDay, payload).await
    }

    async fn distribute(&self, payload: &JsonValue) -> AppResult<JsonValue> {
        self.invoke_chat(GeneratorOperation::Distribute, payload).await
    }
}

pub mod testing {
    use super::*;

    /// Expose status mapping for integration tests without widening the public API surface.
    pub fn map_http_error(status: StatusCode) -> AppError {
        ChatCompletionGenerator::map_http_error(status, "test-correlation-id")
    }

    pub fn parse_content(content: &str) -> AppResult<JsonValue> {
        ChatCompletionGenerator::parse_content(content, "test-correlation-id")
    }
}
