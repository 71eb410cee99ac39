//! Session Error Types
//!
//! Error hierarchy for the password-grant session, its storage and transport.

use std::time::Duration;
use thiserror::Error;

/// Root error type for the session crate.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Authentication error: {0}")]
    Authentication(#[from] AuthenticationError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl SessionError {
    /// Get error code for telemetry.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "SESSION_CONFIG",
            Self::Authentication(_) => "SESSION_AUTH",
            Self::Storage(StorageError::MissingKey { .. }) => "SESSION_MISSING_KEY",
            Self::Storage(_) => "SESSION_STORAGE",
            Self::Network(_) => "SESSION_NETWORK",
            Self::Protocol(_) => "SESSION_PROTOCOL",
        }
    }

    /// Whether this is a storage miss (absent or expired key).
    pub fn is_missing_key(&self) -> bool {
        matches!(self, Self::Storage(StorageError::MissingKey { .. }))
    }

    /// Check if the caller should re-authenticate.
    pub fn needs_reauth(&self) -> bool {
        match self {
            Self::Storage(StorageError::MissingKey { .. }) => true,
            Self::Storage(StorageError::CorruptedData { .. }) => true,
            Self::Authentication(AuthenticationError::InvalidGrant { .. }) => true,
            Self::Authentication(AuthenticationError::InvalidClient { .. }) => true,
            _ => false,
        }
    }

    /// Check if error is retryable by a transport-level retry policy.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(e) => e.is_retryable(),
            Self::Authentication(AuthenticationError::ServerError { .. }) => true,
            _ => false,
        }
    }
}

/// Configuration error.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Missing required field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid login URL: {url}")]
    InvalidLoginUrl { url: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

/// Token or revoke endpoint rejected the request, or its answer is unusable.
#[derive(Error, Debug)]
pub enum AuthenticationError {
    #[error("Invalid client credentials")]
    InvalidClient { error_description: Option<String> },

    #[error("Invalid grant: {message}")]
    InvalidGrant { message: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Unsupported grant type: {grant_type}")]
    UnsupportedGrantType { grant_type: String },

    #[error("Server error: {message}")]
    ServerError { message: String },

    #[error("Endpoint returned HTTP {status}")]
    UnexpectedStatus { status: u16 },

    #[error("Malformed token response: {message}")]
    MalformedResponse { message: String },

    #[error("Incomplete token bundle, missing field: {field}")]
    IncompleteToken { field: String },

    #[error("Token signature does not match id and issued_at")]
    InvalidSignature,
}

/// Storage error.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("No value for requested key: {key}")]
    MissingKey { key: String },

    #[error("Read failed: {message}")]
    ReadFailed { message: String },

    #[error("Write failed: {message}")]
    WriteFailed { message: String },

    #[error("Delete failed: {message}")]
    DeleteFailed { message: String },

    #[error("Corrupted data for key {key}: {message}")]
    CorruptedData { key: String, message: String },
}

/// Network/transport error.
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("Request timeout after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("Client setup failed: {message}")]
    ClientSetup { message: String },
}

impl NetworkError {
    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::ClientSetup { .. })
    }
}

/// Protocol/response parsing error.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("Unexpected redirect to: {location}")]
    UnexpectedRedirect { location: String },

    #[error("Response too large: {size} bytes")]
    ResponseTooLarge { size: usize },

    #[error("Invalid JSON: {message}")]
    InvalidJson { message: String },
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// OAuth2 error response from the token endpoint.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct OAuth2ErrorResponse {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// Error entry as returned by the platform's REST layer.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformErrorEntry {
    pub error_code: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// Map token endpoint error response to error type.
pub fn map_token_error(response: &OAuth2ErrorResponse) -> AuthenticationError {
    let description = || {
        response
            .error_description
            .clone()
            .unwrap_or_else(|| response.error.clone())
    };

    match response.error.as_str() {
        "invalid_client" | "invalid_client_id" => AuthenticationError::InvalidClient {
            error_description: response.error_description.clone(),
        },
        "invalid_grant" => AuthenticationError::InvalidGrant {
            message: description(),
        },
        "unsupported_grant_type" => AuthenticationError::UnsupportedGrantType {
            grant_type: response.error_description.clone().unwrap_or_default(),
        },
        "server_error" | "temporarily_unavailable" => AuthenticationError::ServerError {
            message: description(),
        },
        _ => AuthenticationError::InvalidRequest {
            message: description(),
        },
    }
}

/// Parse error response from HTTP body.
pub fn parse_error_response(body: &str) -> Option<OAuth2ErrorResponse> {
    if let Ok(response) = serde_json::from_str::<OAuth2ErrorResponse>(body) {
        return Some(response);
    }

    let entries: Vec<PlatformErrorEntry> = serde_json::from_str(body).ok()?;
    entries.into_iter().next().map(|entry| OAuth2ErrorResponse {
        error: entry.error_code,
        error_description: entry.message,
    })
}

/// Create error from a non-success HTTP response.
pub fn create_error_from_response(status: u16, body: &str) -> SessionError {
    if let Some(response) = parse_error_response(body) {
        return SessionError::Authentication(map_token_error(&response));
    }

    let error = match status {
        401 => AuthenticationError::InvalidClient {
            error_description: Some("Unauthorized".to_string()),
        },
        500..=599 => AuthenticationError::ServerError {
            message: format!("HTTP {}", status),
        },
        _ => AuthenticationError::UnexpectedStatus { status },
    };

    SessionError::Authentication(error)
}
