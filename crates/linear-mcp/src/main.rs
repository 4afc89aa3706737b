//! Linear MCP Server - Entry Point
//!
//! Provides both stdio (local, API key) and HTTP (remote, OAuth) transports.

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use linear_mcp::{config::Config, kv::MemoryKv, server::McpServer};

#[derive(Parser, Debug)]
#[command(name = "linear-mcp")]
#[command(about = "MCP server for the Linear issue tracker")]
#[command(version)]
struct Cli {
    /// Transport mode: stdio or http
    #[arg(long, default_value = "stdio")]
    transport: Transport,

    /// HTTP server port (only used with --transport http)
    #[arg(long, default_value = "8000", env = "PORT")]
    port: u16,

    /// Public base URL of this server (e.g., https://linear-mcp.example.com)
    #[arg(long, env = "BASE_URL")]
    base_url: Option<String>,

    /// OAuth client id of the Linear application (HTTP mode)
    #[arg(long, env = "LINEAR_CLIENT_ID", default_value = "")]
    linear_client_id: String,

    /// OAuth client secret of the Linear application (HTTP mode)
    #[arg(long, env = "LINEAR_CLIENT_SECRET", default_value = "", hide_env_values = true)]
    linear_client_secret: String,

    /// Secret for signing the OAuth state parameter
    #[arg(long, env = "STATE_SECRET", hide_env_values = true)]
    state_secret: Option<String>,

    /// Personal Linear API key (stdio mode)
    #[arg(long, env = "LINEAR_API_KEY", hide_env_values = true)]
    linear_api_key: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum Transport {
    /// Standard input/output
    #[default]
    Stdio,
    /// HTTP with OAuth and Server-Sent Events
    Http,
}

fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    // Logs go to stderr so stdout stays free for the stdio transport
    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber.with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)).init();
    } else {
        subscriber
            .with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    init_tracing(&cli.log_level, cli.json_logs);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        transport = ?cli.transport,
        "Starting Linear MCP server"
    );

    let config = Config::new(cli.linear_client_id, cli.linear_client_secret)
        .with_state_secret(cli.state_secret.filter(|s| !s.is_empty()));

    // Grants live for the lifetime of the process
    let server = McpServer::new(config, Arc::new(MemoryKv::new()))?;

    match cli.transport {
        Transport::Stdio => {
            server.run_stdio(cli.linear_api_key.filter(|k| !k.is_empty())).await?;
        }
        Transport::Http => {
            tracing::info!(port = cli.port, base_url = ?cli.base_url, "Running in HTTP mode");
            server.run_http(cli.port, cli.base_url).await?;
        }
    }

    Ok(())
}
