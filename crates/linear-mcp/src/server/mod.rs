//! MCP server implementation.
//!
//! Provides both stdio (local, API key) and HTTP (remote, OAuth) transports.

pub mod oauth;
pub mod session;
pub mod stdio;
pub mod transport;

use std::net::SocketAddr;
use std::sync::Arc;

use crate::client::LinearClient;
use crate::config::Config;
use crate::grants::SessionProps;
use crate::kv::KvStore;
use crate::oauth::AuthorizationFlow;
use crate::provider::{KvOAuthProvider, OAuthHelpers};
use crate::tools::{self, McpTool, ToolContext};

/// MCP server for Linear.
pub struct McpServer {
    config: Config,

    /// Tool execution context without session props.
    ctx: ToolContext,

    provider: Arc<KvOAuthProvider>,

    /// Registered tools.
    tools: Vec<Box<dyn McpTool>>,
}

impl McpServer {
    /// Create a new MCP server backed by `kv`.
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails.
    pub fn new(config: Config, kv: Arc<dyn KvStore>) -> anyhow::Result<Self> {
        let client = LinearClient::new(&config)?;
        let provider = Arc::new(KvOAuthProvider::new(kv, &config));
        let ctx = ToolContext::new(client, provider.clone(), None);

        Ok(Self { config, ctx, provider, tools: tools::register_all_tools() })
    }

    /// Build the HTTP router for a server reachable at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails.
    pub fn router(self, base_url: &str) -> anyhow::Result<axum::Router> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let provider: Arc<dyn OAuthHelpers> = self.provider;
        let flow =
            AuthorizationFlow::new(&self.config, Arc::clone(&provider), self.ctx.client.clone(), &base_url)?;

        Ok(transport::create_router(transport::HttpState {
            tools: self.tools,
            ctx: self.ctx,
            sessions: Arc::new(session::SessionManager::new()),
            provider,
            flow,
            base_url,
        }))
    }

    /// Run the server in stdio mode.
    ///
    /// `api_key` becomes the access token of the single local session.
    ///
    /// # Errors
    ///
    /// Returns error on I/O failure.
    pub async fn run_stdio(self, api_key: Option<String>) -> anyhow::Result<()> {
        tracing::info!("Starting MCP server in stdio mode");
        tracing::info!("Registered {} tools", self.tools.len());

        if api_key.is_none() {
            tracing::warn!("LINEAR_API_KEY not set; tool calls will fail");
        }

        let ctx = self.ctx.with_props(api_key.map(SessionProps::from_access_token));
        stdio::run_stdio(self.tools, ctx).await
    }

    /// Run the server in HTTP mode.
    ///
    /// # Errors
    ///
    /// Returns error if Linear OAuth credentials are missing or on server failure.
    pub async fn run_http(self, port: u16, base_url: Option<String>) -> anyhow::Result<()> {
        if !self.config.has_upstream_credentials() {
            anyhow::bail!("LINEAR_CLIENT_ID and LINEAR_CLIENT_SECRET are required in HTTP mode");
        }

        tracing::info!("Starting MCP server in HTTP mode on port {}", port);
        tracing::info!("Registered {} tools", self.tools.len());
        if !self.config.has_state_secret() {
            tracing::warn!("STATE_SECRET not set; OAuth state will not be signed");
        }

        let base_url = base_url.unwrap_or_else(|| format!("http://localhost:{port}"));
        let router = self.router(&base_url)?;
        let addr = SocketAddr::from(([0, 0, 0, 0], port));

        tracing::info!(%base_url, "HTTP server listening on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await?;

        tracing::info!("HTTP server shut down");
        Ok(())
    }

    /// Get tool by name.
    #[must_use]
    pub fn get_tool(&self, name: &str) -> Option<&dyn McpTool> {
        tools::find_tool(&self.tools, name)
    }

    /// The OAuth provider.
    #[must_use]
    pub fn provider(&self) -> Arc<KvOAuthProvider> {
        Arc::clone(&self.provider)
    }
}

impl std::fmt::Debug for McpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpServer").field("tools", &self.tools.len()).finish()
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install CTRL+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Received shutdown signal");
}
