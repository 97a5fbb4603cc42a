use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FnolError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("Input file is empty: {}", .0.display())]
    EmptyInput(PathBuf),

    #[error("Failed to parse LLM response as JSON: {message}\nResponse: {raw}")]
    Decode { message: String, raw: String },

    #[error("LLM response does not match the expected shape: {message}\nResponse: {raw}")]
    Schema { message: String, raw: String },

    #[error("Gemini API error (status {status}): {message}")]
    Api {
        status: u16,
        message: String,
        /// Server-requested wait from a `Retry-After` header.
        retry_after: Option<Duration>,
    },

    #[cfg(feature = "gemini")]
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Generator call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Generator error: {0}")]
    Generator(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl FnolError {
    /// Transient transport failures worth another attempt at the HTTP level.
    pub fn is_retryable(&self) -> bool {
        match self {
            FnolError::Api { status, .. } => matches!(*status, 408 | 429) || *status >= 500,
            #[cfg(feature = "gemini")]
            FnolError::Network(_) => true,
            FnolError::Timeout(_) => true,
            _ => false,
        }
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            FnolError::Api { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Failures the feedback loop treats as "the response was unusable" rather than
    /// "the generator is broken".
    pub fn is_decode_failure(&self) -> bool {
        matches!(
            self,
            FnolError::Decode { .. } | FnolError::Schema { .. } | FnolError::Timeout(_)
        )
    }

    pub(crate) fn decode(message: impl ToString, raw: &str) -> Self {
        FnolError::Decode {
            message: message.to_string(),
            raw: raw.to_string(),
        }
    }

    pub(crate) fn schema(message: impl ToString, raw: &str) -> Self {
        FnolError::Schema {
            message: message.to_string(),
            raw: raw.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FnolError>;
