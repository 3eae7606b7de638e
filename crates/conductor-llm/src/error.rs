//! LLM-related error types.

use thiserror::Error;

/// Errors that can occur with LLM operations.
#[derive(Debug, Error)]
pub enum LlmError {
    /// API key not configured.
    #[error("API key not configured for {provider}")]
    ApiKeyNotConfigured {
        /// Provider name.
        provider: String,
    },

    /// API request failed.
    #[error("API request failed: {0}")]
    ApiRequestFailed(String),

    /// Rate limit exceeded.
    #[error("Rate limit exceeded, retry after {retry_after_secs} seconds")]
    RateLimitExceeded {
        /// Seconds to wait before retrying.
        retry_after_secs: u64,
    },

    /// Invalid response from API.
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    /// Model not supported.
    #[error("Model not supported: {model}")]
    ModelNotSupported {
        /// Model name.
        model: String,
    },

    /// Context length exceeded.
    #[error("Context length exceeded: {current} tokens, max is {max}")]
    ContextLengthExceeded {
        /// Current token count.
        current: usize,
        /// Maximum allowed.
        max: usize,
    },

    /// Streaming error.
    #[error("Streaming error: {0}")]
    StreamingError(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// HTTP error.
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for LLM operations.
pub type LlmResult<T> = Result<T, LlmError>;

impl LlmError {
    /// Classify this error for the retry policy (spec §4.D): retryable
    /// errors are rate limits, and request failures carrying an HTTP
    /// 429 or 5xx status or a rate-limit/overload substring. Auth and
    /// schema errors are never retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimitExceeded { .. } => true,
            Self::ApiRequestFailed(message) | Self::StreamingError(message) => {
                is_retryable_message(message)
            }
            Self::HttpError(source) => source
                .status()
                .is_some_and(|status| status.as_u16() == 429 || status.is_server_error()),
            Self::ApiKeyNotConfigured { .. }
            | Self::InvalidResponse(_)
            | Self::ModelNotSupported { .. }
            | Self::ContextLengthExceeded { .. }
            | Self::SerializationError(_)
            | Self::ConfigError(_) => false,
        }
    }
}

fn is_retryable_message(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("429")
        || lower.contains("rate limit")
        || lower.contains("rate-limit")
        || lower.contains("overloaded")
        || (500..600).any(|code| lower.contains(&code.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_is_retryable() {
        let err = LlmError::RateLimitExceeded {
            retry_after_secs: 1,
        };
        assert!(err.is_retryable());
    }

    #[test]
    fn auth_error_is_not_retryable() {
        let err = LlmError::ApiKeyNotConfigured {
            provider: "anthropic".into(),
        };
        assert!(!err.is_retryable());
    }

    #[test]
    fn server_error_substring_is_retryable() {
        let err = LlmError::ApiRequestFailed("503 Service Unavailable".into());
        assert!(err.is_retryable());
    }

    #[test]
    fn client_error_substring_is_not_retryable() {
        let err = LlmError::ApiRequestFailed("401 Unauthorized".into());
        assert!(!err.is_retryable());
    }
}
