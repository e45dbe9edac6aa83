//! Error types for tome operations.
//!
//! Errors carry a stable [`ErrorCode`] for programmatic handling and an
//! optional hint for resolving them. Only [`TomeError::Extraction`] is fatal
//! to a pipeline run; everything raised by the AI service is absorbed by the
//! pipeline components and turned into degraded output.

use std::collections::HashMap;
use std::time::Duration;

use thiserror::Error;

/// Result type alias for tome operations.
pub type TomeResult<T> = Result<T, TomeError>;

/// Main error type for all tome operations.
#[derive(Error, Debug)]
pub enum TomeError {
    /// Authentication with the AI service failed.
    #[error("Authentication error: {message}")]
    Authentication {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Input validation failed.
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        code: ErrorCode,
        details: HashMap<String, String>,
        suggestion: Option<String>,
    },

    /// A referenced file or archive does not exist.
    #[error("Not found: {message}")]
    NotFound {
        message: String,
        code: ErrorCode,
        path: Option<String>,
    },

    /// Rate limit exceeded.
    #[error("Rate limit exceeded: {message}")]
    RateLimit {
        message: String,
        code: ErrorCode,
        retry_after: Option<u64>,
    },

    /// LLM operation failed.
    #[error("LLM error: {message}")]
    Llm {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Archive extraction failed.
    #[error("Extraction error: {message}")]
    Extraction {
        message: String,
        code: ErrorCode,
        exit_code: Option<i32>,
    },

    /// An external call did not finish in time.
    #[error("Timed out after {elapsed:?}: {operation}")]
    Timeout { operation: String, elapsed: Duration },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Network error.
    #[error("Network error: {message}")]
    Network {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Provider not supported.
    #[error("Provider not supported: {provider}")]
    UnsupportedProvider { provider: String },

    /// Parse error.
    #[error("Parse error: {message}")]
    Parse { message: String, code: ErrorCode },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Task join error from spawn_blocking.
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Authentication (AUTH_xxx)
    AuthInvalidKey,
    AuthMissingCredentials,

    // Validation (VAL_xxx)
    ValInvalidInput,
    ValInvalidPath,

    // Filesystem (FS_xxx)
    FsNotFound,

    // Rate Limit (RATE_xxx)
    RateLimitExceeded,

    // LLM (LLM_xxx)
    LlmConnectionFailed,
    LlmGenerationFailed,
    LlmInvalidResponse,
    LlmUnavailable,

    // Extraction (EXT_xxx)
    ExtSpawnFailed,
    ExtNonZeroExit,

    // Network (NET_xxx)
    NetTimeout,
    NetConnectionFailed,

    // Parse (PARSE_xxx)
    ParseInvalidJson,
    ParseMissingField,

    // Internal
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::AuthInvalidKey => "AUTH_001",
            ErrorCode::AuthMissingCredentials => "AUTH_002",
            ErrorCode::ValInvalidInput => "VAL_001",
            ErrorCode::ValInvalidPath => "VAL_002",
            ErrorCode::FsNotFound => "FS_001",
            ErrorCode::RateLimitExceeded => "RATE_001",
            ErrorCode::LlmConnectionFailed => "LLM_001",
            ErrorCode::LlmGenerationFailed => "LLM_002",
            ErrorCode::LlmInvalidResponse => "LLM_003",
            ErrorCode::LlmUnavailable => "LLM_004",
            ErrorCode::ExtSpawnFailed => "EXT_001",
            ErrorCode::ExtNonZeroExit => "EXT_002",
            ErrorCode::NetTimeout => "NET_001",
            ErrorCode::NetConnectionFailed => "NET_002",
            ErrorCode::ParseInvalidJson => "PARSE_001",
            ErrorCode::ParseMissingField => "PARSE_002",
            ErrorCode::Internal => "INT_001",
        }
    }
}

impl TomeError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            code: ErrorCode::ValInvalidInput,
            details: HashMap::new(),
            suggestion: None,
        }
    }

    /// Create a validation error with suggestion.
    pub fn validation_with_suggestion(
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Validation {
            message: message.into(),
            code: ErrorCode::ValInvalidInput,
            details: HashMap::new(),
            suggestion: Some(suggestion.into()),
        }
    }

    /// Create a not found error for a filesystem path.
    pub fn not_found(path: impl Into<String>) -> Self {
        let path = path.into();
        Self::NotFound {
            message: format!("'{}' does not exist", path),
            code: ErrorCode::FsNotFound,
            path: Some(path),
        }
    }

    /// Create an LLM error.
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm {
            message: message.into(),
            code: ErrorCode::LlmGenerationFailed,
            source: None,
        }
    }

    /// Create an LLM error for a provider-side outage (5xx).
    pub fn llm_unavailable(message: impl Into<String>) -> Self {
        Self::Llm {
            message: message.into(),
            code: ErrorCode::LlmUnavailable,
            source: None,
        }
    }

    /// Create an extraction error from a process exit status.
    pub fn extraction(message: impl Into<String>, exit_code: Option<i32>) -> Self {
        Self::Extraction {
            message: message.into(),
            code: ErrorCode::ExtNonZeroExit,
            exit_code,
        }
    }

    /// Create an extraction error for a process that could not be started.
    pub fn extraction_spawn(message: impl Into<String>) -> Self {
        Self::Extraction {
            message: message.into(),
            code: ErrorCode::ExtSpawnFailed,
            exit_code: None,
        }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, elapsed: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed,
        }
    }

    /// Create a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            code: ErrorCode::ParseInvalidJson,
        }
    }

    /// Create an API error.
    pub fn api(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            code: ErrorCode::NetConnectionFailed,
            source: None,
        }
    }

    /// Create an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
            code: ErrorCode::AuthInvalidKey,
            source: None,
        }
    }

    /// Create a rate limit error.
    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::RateLimit {
            message: message.into(),
            code: ErrorCode::RateLimitExceeded,
            retry_after: None,
        }
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Authentication { code, .. } => *code,
            Self::Validation { code, .. } => *code,
            Self::NotFound { code, .. } => *code,
            Self::RateLimit { code, .. } => *code,
            Self::Llm { code, .. } => *code,
            Self::Extraction { code, .. } => *code,
            Self::Timeout { .. } => ErrorCode::NetTimeout,
            Self::Network { code, .. } => *code,
            Self::Parse { code, .. } => *code,
            _ => ErrorCode::Internal,
        }
    }

    /// Whether retrying the same call could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Network { .. } | Self::RateLimit { .. } => true,
            Self::Llm { code, .. } => {
                matches!(code, ErrorCode::LlmUnavailable | ErrorCode::LlmConnectionFailed)
            }
            _ => false,
        }
    }

    /// Get a user-friendly suggestion for resolving this error.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Authentication { .. } => {
                Some("Please check your API key and authentication credentials")
            }
            Self::RateLimit { .. } => Some("Please wait before making more requests"),
            Self::NotFound { .. } => Some("Please check that the path exists"),
            Self::Validation { suggestion, .. } => suggestion.as_deref(),
            Self::Llm { .. } => Some("Please check your LLM provider configuration"),
            Self::Extraction {
                code: ErrorCode::ExtSpawnFailed,
                ..
            } => Some("Please check that the unzip program is installed and on PATH"),
            Self::Extraction { .. } => Some("Please check that the file is a valid ZIP archive"),
            Self::Timeout { .. } => Some("Consider raising the configured timeout"),
            _ => None,
        }
    }

    /// Convert from HTTP status code returned by a provider.
    pub fn from_http_status(status: u16, body: &str) -> Self {
        match status {
            400 => Self::Validation {
                message: body.to_string(),
                code: ErrorCode::ValInvalidInput,
                details: HashMap::new(),
                suggestion: Some("Please check your request parameters".to_string()),
            },
            401 | 403 => Self::Authentication {
                message: body.to_string(),
                code: ErrorCode::AuthInvalidKey,
                source: None,
            },
            408 => Self::Network {
                message: body.to_string(),
                code: ErrorCode::NetTimeout,
                source: None,
            },
            429 => Self::RateLimit {
                message: body.to_string(),
                code: ErrorCode::RateLimitExceeded,
                retry_after: None,
            },
            500..=599 => Self::llm_unavailable(format!("HTTP {}: {}", status, body)),
            _ => Self::Internal(format!("HTTP {}: {}", status, body)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error() {
        let err = TomeError::validation("Invalid input");
        assert_eq!(err.code(), ErrorCode::ValInvalidInput);
        assert!(err.to_string().contains("Invalid input"));
    }

    #[test]
    fn test_not_found_error() {
        let err = TomeError::not_found("data/archive.zip");
        assert_eq!(err.code(), ErrorCode::FsNotFound);
        assert!(err.suggestion().is_some());
        assert!(err.to_string().contains("data/archive.zip"));
    }

    #[test]
    fn test_error_code_as_str() {
        assert_eq!(ErrorCode::AuthInvalidKey.as_str(), "AUTH_001");
        assert_eq!(ErrorCode::ExtNonZeroExit.as_str(), "EXT_002");
    }

    #[test]
    fn test_http_status_mapping() {
        assert!(matches!(
            TomeError::from_http_status(401, "bad key"),
            TomeError::Authentication { .. }
        ));
        assert!(TomeError::from_http_status(429, "slow down").is_transient());
        assert!(TomeError::from_http_status(503, "overloaded").is_transient());
        assert!(!TomeError::from_http_status(400, "bad request").is_transient());
    }

    #[test]
    fn test_extraction_errors_are_not_transient() {
        let err = TomeError::extraction("unzip exited with status 9", Some(9));
        assert!(!err.is_transient());
        assert_eq!(err.code(), ErrorCode::ExtNonZeroExit);
        assert!(err.suggestion().unwrap().contains("ZIP"));

        let err = TomeError::extraction_spawn("No such file or directory");
        assert_eq!(err.code(), ErrorCode::ExtSpawnFailed);
        assert!(err.suggestion().unwrap().contains("unzip"));
    }

    #[test]
    fn test_timeout_is_transient() {
        let err = TomeError::timeout("openai chat completion", Duration::from_secs(60));
        assert!(err.is_transient());
        assert_eq!(err.code(), ErrorCode::NetTimeout);
    }
}
