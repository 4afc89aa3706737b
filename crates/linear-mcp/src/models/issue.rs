//! Issue model.

use serde::{Deserialize, Serialize};

/// Reference to a related entity by id only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    pub id: String,
}

/// A Linear issue.
///
/// Relations are selected as bare `{ id }` references; use the matching
/// `get_*_by_id` tool to expand them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub id: String,

    /// Human-readable identifier (e.g. "ENG-123").
    pub identifier: String,

    #[serde(default)]
    pub label_ids: Option<Vec<String>>,

    #[serde(default)]
    pub number: Option<f64>,

    /// 0 = none, 1 = urgent, 2 = high, 3 = normal, 4 = low.
    #[serde(default)]
    pub priority: Option<f64>,

    #[serde(default)]
    pub priority_label: Option<String>,

    #[serde(default)]
    pub sla_type: Option<String>,

    pub title: String,

    /// Markdown description.
    #[serde(default)]
    pub description: Option<String>,

    /// Suggested git branch name.
    #[serde(default)]
    pub branch_name: Option<String>,

    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub project_milestone: Option<EntityRef>,

    #[serde(default)]
    pub creator: Option<EntityRef>,

    #[serde(default)]
    pub cycle: Option<EntityRef>,

    #[serde(default)]
    pub parent: Option<EntityRef>,

    /// Workflow state of the issue.
    #[serde(default)]
    pub state: Option<EntityRef>,

    pub team: EntityRef,

    #[serde(default)]
    pub assignee: Option<EntityRef>,
}

/// `issueCreate` payload.
#[derive(Debug, Clone, Deserialize)]
pub struct IssueMutationPayload {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub issue: Option<Issue>,
}

/// `issueUpdate` payload; only the success flag is surfaced.
#[derive(Debug, Clone, Deserialize)]
pub struct IssueUpdatePayload {
    #[serde(default)]
    pub success: bool,
}
