use std::fmt;

use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{error, warn};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorErrorCode {
    NotConfigured,
    Forbidden,
    Timeout,
    RateLimited,
    InvalidResponse,
    InvalidRequest,
    Unavailable,
    Unknown,
}

impl GeneratorErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            GeneratorErrorCode::NotConfigured => "GENERATOR_NOT_CONFIGURED",
            GeneratorErrorCode::Forbidden => "FORBIDDEN",
            GeneratorErrorCode::Timeout => "GENERATOR_TIMEOUT",
            GeneratorErrorCode::RateLimited => "RATE_LIMITED",
            GeneratorErrorCode::InvalidResponse => "INVALID_RESPONSE",
            GeneratorErrorCode::InvalidRequest => "INVALID_REQUEST",
            GeneratorErrorCode::Unavailable => "GENERATOR_UNAVAILABLE",
            GeneratorErrorCode::Unknown => "UNKNOWN_GENERATOR_ERROR",
        }
    }
}

impl fmt::Display for GeneratorErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed: {message}")]
    Validation {
        message: String,
        details: Option<JsonValue>,
    },

    #[error("{message}")]
    Generator {
        code: GeneratorErrorCode,
        message: String,
        correlation_id: Option<String>,
        details: Option<JsonValue>,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        let message = message.into();
        warn!(target: "app::validation", %message, "validation error");
        AppError::Validation {
            message,
            details: None,
        }
    }

    pub fn validation_with_details(message: impl Into<String>, details: JsonValue) -> Self {
        let message = message.into();
        warn!(target: "app::validation", %message, details = %details, "validation error with details");
        AppError::Validation {
            message,
            details: Some(details),
        }
    }

    pub fn generator(code: GeneratorErrorCode, message: impl Into<String>) -> Self {
        Self::generator_with_details(code, message, None, None)
    }

    pub fn generator_with_details(
        code: GeneratorErrorCode,
        message: impl Into<String>,
        correlation_id: Option<&str>,
        details: Option<JsonValue>,
    ) -> Self {
        let message = message.into();
        let correlation = correlation_id.map(|value| value.to_string());
        match (&correlation, &details) {
            (Some(id), Some(payload)) => {
                warn!(
                    target: "app::generator::error",
                    code = %code,
                    correlation_id = %id,
                    details = %payload,
                    %message
                );
            }
            (Some(id), None) => {
                warn!(
                    target: "app::generator::error",
                    code = %code,
                    correlation_id = %id,
                    %message
                );
            }
            (None, Some(payload)) => {
                warn!(target: "app::generator::error", code = %code, details = %payload, %message);
            }
            (None, None) => {
                warn!(target: "app::generator::error", code = %code, %message);
            }
        }

        AppError::Generator {
            code,
            message,
            correlation_id: correlation,
            details,
        }
    }

    pub fn generator_code(&self) -> Option<GeneratorErrorCode> {
        match self {
            AppError::Generator { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn generator_correlation_id(&self) -> Option<&str> {
        match self {
            AppError::Generator { correlation_id, .. } => correlation_id.as_deref(),
            _ => None,
        }
    }

    pub fn generator_details(&self) -> Option<&JsonValue> {
        match self {
            AppError::Generator { details, .. } => details.as_ref(),
            _ => None,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, AppError::Validation { .. })
    }

    pub fn config(message: impl Into<String>) -> Self {
        let message = message.into();
        warn!(target: "app::config", %message, "configuration error");
        AppError::Config(message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        let message = message.into();
        error!(target: "app::other", %message, "other error");
        AppError::Other(message)
    }
}
