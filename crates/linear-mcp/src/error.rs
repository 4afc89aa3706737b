//! Error types for the Linear MCP server.
//!
//! Uses `thiserror` for structured error handling with automatic `From` implementations.

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Errors from the Linear GraphQL client layer.
#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    /// HTTP transport error (connection, DNS, TLS, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Middleware error
    #[error("Middleware error: {0}")]
    Middleware(#[from] reqwest_middleware::Error),

    /// Access token rejected by Linear (401 response)
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Error message from API
        message: String,
    },

    /// Rate limited by Linear (429 response)
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// Suggested wait time before retry
        retry_after: Duration,
    },

    /// Resource not found (404 response or null GraphQL node)
    #[error("Resource not found: {resource}")]
    NotFound {
        /// Description of the missing resource
        resource: String,
    },

    /// Invalid request parameters (400 response)
    #[error("Bad request: {message}")]
    BadRequest {
        /// Error message from API
        message: String,
    },

    /// The GraphQL response carried an `errors` array
    #[error("GraphQL error: {message}")]
    GraphQl {
        /// Joined error messages
        message: String,
    },

    /// JSON parsing error
    #[error("Failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),

    /// Server error (5xx response)
    #[error("Server error ({status}): {message}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Error message
        message: String,
    },

    /// Unexpected HTTP status
    #[error("Unexpected status {status}: {message}")]
    UnexpectedStatus {
        /// HTTP status code
        status: u16,
        /// Response body or message
        message: String,
    },
}

impl ClientError {
    /// Create a rate limited error with retry-after duration.
    #[must_use]
    pub fn rate_limited(seconds: u64) -> Self {
        Self::RateLimited { retry_after: Duration::from_secs(seconds) }
    }

    /// Create a not found error.
    #[must_use]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound { resource: resource.into() }
    }

    /// Create a bad request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest { message: message.into() }
    }

    /// Create a server error.
    #[must_use]
    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::Server { status, message: message.into() }
    }

    /// Create a GraphQL error.
    #[must_use]
    pub fn graphql(message: impl Into<String>) -> Self {
        Self::GraphQl { message: message.into() }
    }
}

/// Errors from the key-value store backing grants and tokens.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// The backend failed to serve the request
    #[error("Store backend error: {0}")]
    Backend(String),

    /// A list cursor could not be decoded
    #[error("Invalid list cursor: {0}")]
    InvalidCursor(String),

    /// A value could not be (de)serialized
    #[error("Store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Create a backend error.
    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }
}

/// Errors from MCP tool execution.
#[derive(thiserror::Error, Debug)]
pub enum ToolError {
    /// The session carries no upstream access token
    #[error("No access token found")]
    NoAccessToken,

    /// The session carries no user id (logout needs one)
    #[error("No user ID found in session")]
    NoUserContext,

    /// Error from the API client
    #[error("API error: {0}")]
    Client(#[from] ClientError),

    /// Error from the grant store
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Input validation failed
    #[error("Validation error: {message}")]
    Validation {
        /// Field that failed validation
        field: String,
        /// Validation error message
        message: String,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ToolError {
    /// Create a validation error.
    #[must_use]
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation { field: field.into(), message: message.into() }
    }

    /// Convert to a user-friendly error message for MCP response.
    #[must_use]
    pub fn to_user_message(&self) -> String {
        match self {
            Self::Client(ClientError::RateLimited { retry_after }) => {
                format!("Rate limited by Linear. Please wait {:?} before retrying.", retry_after)
            }
            Self::Client(ClientError::NotFound { resource }) => {
                format!("Not found: {resource}. Please check the ID is correct.")
            }
            Self::Client(ClientError::Unauthorized { .. }) => {
                "Linear rejected the access token. Please log in again.".to_string()
            }
            Self::Validation { field, message } => {
                format!("Invalid input for '{field}': {message}")
            }
            _ => self.to_string(),
        }
    }
}

/// Fixed text returned when the upstream token exchange fails.
pub const UPSTREAM_EXCHANGE_FAILED_TEXT: &str = "There was an issue authenticating your account and retrieving an access token. Please try again.";

/// Errors from the `/auth/authorize` and `/auth/callback` flow.
///
/// Each variant renders as a fixed-text 400; upstream detail is only logged.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    /// Authorization request without a usable client id
    #[error("Invalid request")]
    InvalidRequest,

    /// Callback state could not be decoded or lacks a client id
    #[error("Invalid state")]
    InvalidState,

    /// Callback without an authorization code
    #[error("Invalid code")]
    InvalidCode,

    /// The upstream token endpoint (or identity lookup) failed
    #[error("{}", UPSTREAM_EXCHANGE_FAILED_TEXT)]
    UpstreamExchangeFailed,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, self.to_string()).into_response()
    }
}

/// Errors raised by the OAuth provider, rendered with RFC 6749 error codes.
#[derive(thiserror::Error, Debug)]
pub enum ProviderError {
    /// Malformed or unsupported request
    #[error("{0}")]
    InvalidRequest(String),

    /// Unknown or mismatched client
    #[error("{0}")]
    InvalidClient(String),

    /// Registration metadata rejected (RFC 7591 §3.2.2)
    #[error("{0}")]
    InvalidClientMetadata(String),

    /// Code, refresh token or PKCE verifier rejected
    #[error("{0}")]
    InvalidGrant(String),

    /// Grant type other than authorization_code / refresh_token
    #[error("Unsupported grant type: {0}")]
    UnsupportedGrantType(String),

    /// Underlying store failure
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl ProviderError {
    /// RFC 6749 §5.2 error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::InvalidClient(_) => "invalid_client",
            Self::InvalidClientMetadata(_) => "invalid_client_metadata",
            Self::InvalidGrant(_) => "invalid_grant",
            Self::UnsupportedGrantType(_) => "unsupported_grant_type",
            Self::Store(_) => "server_error",
        }
    }

    /// HTTP status for the token and registration endpoints.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::InvalidClient(_) => StatusCode::UNAUTHORIZED,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ProviderError {
    fn into_response(self) -> Response {
        let description = match &self {
            // Store internals stay in the log
            Self::Store(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };
        (
            self.status(),
            axum::Json(serde_json::json!({
                "error": self.error_code(),
                "error_description": description
            })),
        )
            .into_response()
    }
}

/// Result type alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type alias for tool operations.
pub type ToolResult<T> = Result<T, ToolError>;

/// Result type alias for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;
