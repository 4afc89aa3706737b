//! Input models for MCP tool parameters.

use serde::{Deserialize, Serialize};

use super::{DateComparator, IdComparator, IdFilter, TeamFilter};

/// Input for tools that look up a single entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdInput {
    /// Entity ID (issues also accept the identifier, e.g. "ENG-123").
    pub id: String,
}

/// Input for `list_teams`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListTeamsInput {
    #[serde(default)]
    pub filter: Option<TeamFilter>,
}

/// Input for `list_issues`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListIssuesInput {
    #[serde(default)]
    pub assignee: Option<IdFilter>,

    /// Workflow state filter.
    #[serde(default)]
    pub state: Option<IdFilter>,

    #[serde(default)]
    pub due_date: Option<DateComparator>,
}

impl ListIssuesInput {
    /// Build the GraphQL `IssueFilter`, omitting unset clauses.
    #[must_use]
    pub fn to_filter(&self) -> serde_json::Value {
        let mut filter = serde_json::Map::new();
        if let Some(ref assignee) = self.assignee {
            filter.insert("assignee".into(), serde_json::json!(assignee));
        }
        if let Some(ref state) = self.state {
            filter.insert("state".into(), serde_json::json!(state));
        }
        if let Some(ref due_date) = self.due_date {
            filter.insert("dueDate".into(), serde_json::json!(due_date));
        }
        serde_json::Value::Object(filter)
    }
}

/// Input for `search_issue`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchIssueInput {
    /// Free-text search term.
    pub query: String,
}

/// Input for `create_issue`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIssueInput {
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub team_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycle_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_milestone_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_id: Option<String>,
}

/// Input for `update_issue`; every field but `id` is optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateIssueInput {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycle_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_milestone_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_id: Option<String>,
}

impl UpdateIssueInput {
    /// The `IssueUpdateInput` body: everything except `id`.
    #[must_use]
    pub fn changes(&self) -> serde_json::Value {
        let mut value = serde_json::json!(self);
        if let Some(map) = value.as_object_mut() {
            map.remove("id");
        }
        value
    }
}

/// Input for `list_workflows`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListWorkflowsInput {
    /// Team the workflow states belong to.
    pub team_id: IdComparator,
}
