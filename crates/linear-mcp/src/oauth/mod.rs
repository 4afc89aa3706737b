//! Delegated authorization against Linear.
//!
//! `/auth/authorize` forwards the MCP client's request to Linear with the
//! pending request packed into `state`; `/auth/callback` unpacks it, exchanges
//! the code for a Linear token and hands the result to the provider, which
//! persists the grant and redirects back to the MCP client.

mod flow;
mod state;

pub use flow::{AuthorizationFlow, CallbackQuery, UpstreamToken};
pub use state::StateCodec;
