//! Data models for Linear API entities and tool inputs.
//!
//! Entity models mirror the GraphQL selections in [`crate::client::queries`]
//! and use `#[serde(rename_all = "camelCase")]` to match API naming. Optional
//! fields default to `None` so a sparse node still parses.

mod filters;
mod inputs;
mod issue;
mod team;
mod user;
mod workflow;

pub use filters::{DateComparator, IdComparator, IdFilter};
pub use inputs::*;
pub use issue::{EntityRef, Issue, IssueMutationPayload, IssueUpdatePayload};
pub use team::{Team, TeamFilter};
pub use user::User;
pub use workflow::WorkflowState;

use serde::{Deserialize, Serialize};

/// A GraphQL connection, reduced to its `nodes`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection<T> {
    #[serde(default = "Vec::new")]
    pub nodes: Vec<T>,
}
