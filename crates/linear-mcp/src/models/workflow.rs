//! Workflow state model.

use serde::{Deserialize, Serialize};

/// A workflow state (e.g. "Todo", "In Progress") belonging to a team.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowState {
    pub id: String,
    pub name: String,
    /// Ordering within the team's board.
    pub position: f64,
    /// One of `triage`, `backlog`, `unstarted`, `started`, `completed`, `canceled`.
    #[serde(rename = "type")]
    pub state_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
