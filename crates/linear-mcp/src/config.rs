//! Configuration for the Linear MCP server.

use std::time::Duration;

/// Linear API constants.
pub mod api {
    use std::time::Duration;

    /// Upstream OAuth authorize endpoint.
    pub const AUTHORIZE_URL: &str = "https://linear.app/oauth/authorize";

    /// Upstream OAuth token endpoint.
    pub const TOKEN_URL: &str = "https://api.linear.app/oauth/token";

    /// GraphQL API endpoint.
    pub const GRAPHQL_URL: &str = "https://api.linear.app/graphql";

    /// Request timeout.
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    /// Connection timeout.
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Maximum retries for transient GraphQL failures.
    pub const MAX_RETRIES: u32 = 3;

    /// Maximum keepalive connections.
    pub const MAX_KEEPALIVE: usize = 10;

    /// Keepalive expiry.
    pub const KEEPALIVE_EXPIRY: Duration = Duration::from_secs(30);
}

/// OAuth constants shared by the authorization flow and the provider.
pub mod oauth {
    /// Scopes requested from Linear and advertised to MCP clients.
    pub const SCOPES: &[&str] = &["read", "write", "issues:create", "comments:create"];

    /// Path of the upstream redirect target on this server.
    pub const CALLBACK_PATH: &str = "/auth/callback";

    /// Access token lifetime: 1 hour.
    pub const ACCESS_TOKEN_TTL_SECS: i64 = 3600;

    /// Refresh token lifetime: 30 days.
    pub const REFRESH_TOKEN_TTL_SECS: i64 = 30 * 24 * 3600;
}

/// Server configuration.
#[derive(Clone)]
pub struct Config {
    /// OAuth client id registered with Linear.
    pub linear_client_id: String,

    /// OAuth client secret registered with Linear.
    pub linear_client_secret: String,

    /// Secret used to HMAC-sign the OAuth state parameter (optional).
    pub state_secret: Option<String>,

    /// Upstream authorize URL (for testing with mock servers).
    pub authorize_url: String,

    /// Upstream token URL (for testing with mock servers).
    pub token_url: String,

    /// GraphQL API URL (for testing with mock servers).
    pub graphql_url: String,

    /// Request timeout.
    pub request_timeout: Duration,

    /// Connection timeout.
    pub connect_timeout: Duration,

    /// Maximum retries for transient failures.
    pub max_retries: u32,

    /// Lifetime of access tokens issued to MCP clients, in seconds.
    pub access_token_ttl_secs: i64,

    /// Lifetime of refresh tokens issued to MCP clients, in seconds.
    pub refresh_token_ttl_secs: i64,
}

impl Config {
    /// Create a new configuration for the given Linear OAuth application.
    #[must_use]
    pub fn new(linear_client_id: impl Into<String>, linear_client_secret: impl Into<String>) -> Self {
        Self {
            linear_client_id: linear_client_id.into(),
            linear_client_secret: linear_client_secret.into(),
            state_secret: None,
            authorize_url: api::AUTHORIZE_URL.to_string(),
            token_url: api::TOKEN_URL.to_string(),
            graphql_url: api::GRAPHQL_URL.to_string(),
            request_timeout: api::REQUEST_TIMEOUT,
            connect_timeout: api::CONNECT_TIMEOUT,
            max_retries: api::MAX_RETRIES,
            access_token_ttl_secs: oauth::ACCESS_TOKEN_TTL_SECS,
            refresh_token_ttl_secs: oauth::REFRESH_TOKEN_TTL_SECS,
        }
    }

    /// Create a test configuration with custom URLs for mock servers.
    #[must_use]
    pub fn for_testing(base_url: &str) -> Self {
        Self {
            linear_client_id: "test-linear-client".to_string(),
            linear_client_secret: "test-linear-secret".to_string(),
            state_secret: None,
            authorize_url: format!("{}/oauth/authorize", base_url),
            token_url: format!("{}/oauth/token", base_url),
            graphql_url: format!("{}/graphql", base_url),
            request_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
            max_retries: 0, // Fail fast in tests
            access_token_ttl_secs: oauth::ACCESS_TOKEN_TTL_SECS,
            refresh_token_ttl_secs: oauth::REFRESH_TOKEN_TTL_SECS,
        }
    }

    /// Set the state signing secret.
    #[must_use]
    pub fn with_state_secret(mut self, secret: Option<String>) -> Self {
        self.state_secret = secret;
        self
    }

    /// Check if the upstream OAuth application is configured.
    #[must_use]
    pub fn has_upstream_credentials(&self) -> bool {
        !self.linear_client_id.is_empty() && !self.linear_client_secret.is_empty()
    }

    /// Check if the state parameter is signed.
    #[must_use]
    pub const fn has_state_secret(&self) -> bool {
        self.state_secret.is_some()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new("", "")
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("linear_client_id", &self.linear_client_id)
            .field("has_state_secret", &self.has_state_secret())
            .field("authorize_url", &self.authorize_url)
            .field("token_url", &self.token_url)
            .field("graphql_url", &self.graphql_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(!config.has_upstream_credentials());
        assert!(!config.has_state_secret());
        assert_eq!(config.graphql_url, api::GRAPHQL_URL);
    }

    #[test]
    fn test_config_for_testing_points_at_mock() {
        let config = Config::for_testing("http://127.0.0.1:9999");
        assert_eq!(config.token_url, "http://127.0.0.1:9999/oauth/token");
        assert_eq!(config.graphql_url, "http://127.0.0.1:9999/graphql");
        assert!(config.has_upstream_credentials());
    }

    #[test]
    fn test_debug_hides_secrets() {
        let config = Config::new("id", "super-secret")
            .with_state_secret(Some("hmac-secret".to_string()));
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
        assert!(!debug.contains("hmac-secret"));
        assert!(debug.contains("has_state_secret"));
    }

    #[test]
    fn test_scopes() {
        assert_eq!(oauth::SCOPES.join(" "), "read write issues:create comments:create");
    }
}
