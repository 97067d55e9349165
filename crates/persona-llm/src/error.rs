//! Error types for the LLM client

use thiserror::Error;

/// Result alias for LLM operations
pub type LlmResult<T> = std::result::Result<T, LlmError>;

/// Errors raised while talking to a generation backend
#[derive(Debug, Error)]
pub enum LlmError {
    /// Missing or invalid client configuration
    #[error("configuration error: {message}")]
    Configuration {
        /// What is wrong
        message: String,
    },

    /// Transport-level failure (connect, timeout, TLS)
    #[error("http error during {operation}: {source}")]
    Http {
        /// Operation being performed
        operation: String,
        /// Underlying reqwest error
        #[source]
        source: reqwest::Error,
    },

    /// The backend answered with a non-success status
    #[error("api error {status}: {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Body or error message returned by the backend
        message: String,
    },

    /// The backend answered but the payload was not what we expected
    #[error("invalid response: {message}")]
    InvalidResponse {
        /// Description of the mismatch
        message: String,
    },
}

impl LlmError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Wrap a transport error
    pub fn http(operation: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Http {
            operation: operation.into(),
            source,
        }
    }

    /// Create an API status error
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create an invalid response error
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    /// Whether retrying the same request might succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http { source, .. } => source.is_timeout() || source.is_connect(),
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
