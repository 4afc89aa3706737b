//! Linear MCP Server
//!
//! A Model Context Protocol (MCP) server for the Linear issue tracker. MCP
//! clients authenticate through an embedded OAuth provider that delegates
//! login to Linear; tools then act on Linear as the signed-in user.
//!
//! # Features
//!
//! - **12 MCP Tools**: users, teams, issues, workflow states, logout
//! - **OAuth delegation**: authorization-code exchange with Linear, grants
//!   persisted per user in a key-value store
//! - **Logout**: enumerate and revoke every grant of the current user
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use linear_mcp::{config::Config, kv::MemoryKv, server::McpServer};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::new("linear-client-id", "linear-client-secret");
//!     let server = McpServer::new(config, Arc::new(MemoryKv::new()))?;
//!     server.run_http(8000, None).await
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod grants;
pub mod kv;
pub mod models;
pub mod oauth;
pub mod provider;
pub mod server;
pub mod tools;

pub use client::LinearClient;
pub use config::Config;
pub use error::{AuthError, ClientError, StoreError, ToolError};
