//! HTTP endpoints of the OAuth layer.
//!
//! `/auth/authorize` and `/auth/callback` drive the delegated exchange with
//! Linear; the remaining routes expose the provider to MCP clients.

pub mod handlers;
