//! Error types for the persona pipeline

use thiserror::Error;

/// Result alias used throughout the crate
pub type RagResult<T> = std::result::Result<T, RagError>;

/// Errors raised by the persona pipeline
#[derive(Debug, Error)]
pub enum RagError {
    /// Key-value backend failure or undecodable stored value
    #[error("storage error during {operation}: {source}")]
    Storage {
        /// Operation being performed
        operation: String,
        /// Underlying cause
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Generation backend failure
    #[error("llm error during {operation}: {source}")]
    Llm {
        /// Pipeline stage that called the backend
        operation: String,
        /// Underlying client error
        #[source]
        source: persona_llm::LlmError,
    },

    /// The classifier produced output that does not match its contract
    #[error("classification failed: {reason}")]
    Classification {
        /// What was wrong with the output
        reason: String,
    },

    /// Vector index failure
    #[error("retrieval error during {operation}: {reason}")]
    Retrieval {
        /// Index operation
        operation: String,
        /// What went wrong
        reason: String,
    },

    /// Invalid input or configuration value
    #[error("validation error: {field} {constraint} (got {value})")]
    Validation {
        /// Offending field
        field: String,
        /// Constraint that was violated
        constraint: String,
        /// Value that was supplied
        value: String,
    },

    /// Source document could not be read or parsed
    #[error("ingestion error for {source_name}: {message}")]
    Ingestion {
        /// File or source identifier
        source_name: String,
        /// What went wrong
        message: String,
    },
}

impl RagError {
    /// Create a storage error
    pub fn storage(
        operation: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Storage {
            operation: operation.into(),
            source: source.into(),
        }
    }

    /// Wrap a generation backend error
    pub fn llm(operation: impl Into<String>, source: persona_llm::LlmError) -> Self {
        Self::Llm {
            operation: operation.into(),
            source,
        }
    }

    /// Create a classification error
    pub fn classification(reason: impl Into<String>) -> Self {
        Self::Classification {
            reason: reason.into(),
        }
    }

    /// Create a retrieval error
    pub fn retrieval(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Retrieval {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Create a validation error
    pub fn validation(
        field: impl Into<String>,
        constraint: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::Validation {
            field: field.into(),
            constraint: constraint.into(),
            value: value.into(),
        }
    }

    /// Create an ingestion error
    pub fn ingestion(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Ingestion {
            source_name: source_name.into(),
            message: message.into(),
        }
    }
}
