//! Issue tools: get_issue_by_id, list_issues, search_issue, create_issue, update_issue.

use serde_json::json;

use super::{McpTool, ToolContext, date_comparator_schema, id_comparator_schema, to_json_text};
use crate::error::{ToolError, ToolResult};
use crate::models::{
    CreateIssueInput, IdInput, ListIssuesInput, SearchIssueInput, UpdateIssueInput,
};

/// Properties shared by the create and update schemas.
fn issue_mutation_properties() -> serde_json::Value {
    json!({
        "title": {"type": "string"},
        "description": {"type": "string", "description": "Markdown description"},
        "teamId": {"type": "string"},
        "assigneeId": {"type": "string"},
        "cycleId": {"type": "string"},
        "parentId": {"type": "string", "description": "Parent issue ID for sub-issues"},
        "projectMilestoneId": {"type": "string"},
        "stateId": {"type": "string", "description": "Workflow state ID (see list_workflows)"}
    })
}

/// Issue lookup tool.
pub struct GetIssueByIdTool;

#[async_trait::async_trait]
impl McpTool for GetIssueByIdTool {
    fn name(&self) -> &'static str {
        "get_issue_by_id"
    }

    fn description(&self) -> &'static str {
        "Get an issue by its ID"
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "id": {"type": "string", "description": "Issue ID or identifier (e.g. ENG-123)"}
            },
            "required": ["id"]
        })
    }

    async fn execute(&self, ctx: &ToolContext, input: serde_json::Value) -> ToolResult<String> {
        let tracker = ctx.tracker()?;
        let params: IdInput = serde_json::from_value(input)?;

        let issue = tracker.issue(&params.id).await?;
        to_json_text(&issue)
    }
}

/// Filtered issue listing tool.
pub struct ListIssuesTool;

#[async_trait::async_trait]
impl McpTool for ListIssuesTool {
    fn name(&self) -> &'static str {
        "list_issues"
    }

    fn description(&self) -> &'static str {
        "List all issues"
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "assignee": {
                    "type": "object",
                    "description": "Search by assignee",
                    "properties": {"id": id_comparator_schema("Assignee user ID")}
                },
                "state": {
                    "type": "object",
                    "description": "Search by state ID, if needed, call a tool to get all the states first",
                    "properties": {"id": id_comparator_schema("Workflow state ID")}
                },
                "dueDate": date_comparator_schema("Search by due date")
            }
        })
    }

    async fn execute(&self, ctx: &ToolContext, input: serde_json::Value) -> ToolResult<String> {
        let tracker = ctx.tracker()?;
        let params: ListIssuesInput = serde_json::from_value(input)?;

        let issues = tracker.issues(params.to_filter()).await?;
        to_json_text(&issues)
    }
}

/// Full-text issue search tool.
pub struct SearchIssueTool;

#[async_trait::async_trait]
impl McpTool for SearchIssueTool {
    fn name(&self) -> &'static str {
        "search_issue"
    }

    fn description(&self) -> &'static str {
        "Search issues given a query string"
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "query": {"type": "string", "description": "Search term"}
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, ctx: &ToolContext, input: serde_json::Value) -> ToolResult<String> {
        let tracker = ctx.tracker()?;
        let params: SearchIssueInput = serde_json::from_value(input)?;

        if params.query.trim().is_empty() {
            return Err(ToolError::validation("query", "cannot be empty"));
        }

        let issues = tracker.search_issues(params.query.trim()).await?;
        to_json_text(&issues)
    }
}

/// Issue creation tool.
pub struct CreateIssueTool;

#[async_trait::async_trait]
impl McpTool for CreateIssueTool {
    fn name(&self) -> &'static str {
        "create_issue"
    }

    fn description(&self) -> &'static str {
        "Create an issue"
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": issue_mutation_properties(),
            "required": ["title", "teamId"]
        })
    }

    async fn execute(&self, ctx: &ToolContext, input: serde_json::Value) -> ToolResult<String> {
        let tracker = ctx.tracker()?;
        let params: CreateIssueInput = serde_json::from_value(input)?;

        if params.title.trim().is_empty() {
            return Err(ToolError::validation("title", "cannot be empty"));
        }

        let issue = tracker.create_issue(&params).await?;
        tracing::info!(issue = %issue.identifier, "Created issue");
        to_json_text(&issue)
    }
}

/// Issue update tool.
pub struct UpdateIssueTool;

#[async_trait::async_trait]
impl McpTool for UpdateIssueTool {
    fn name(&self) -> &'static str {
        "update_issue"
    }

    fn description(&self) -> &'static str {
        "Update an issue"
    }

    fn input_schema(&self) -> serde_json::Value {
        let mut properties = issue_mutation_properties();
        properties["id"] = json!({"type": "string", "description": "Issue ID"});
        json!({
            "type": "object",
            "properties": properties,
            "required": ["id"]
        })
    }

    async fn execute(&self, ctx: &ToolContext, input: serde_json::Value) -> ToolResult<String> {
        let tracker = ctx.tracker()?;
        let params: UpdateIssueInput = serde_json::from_value(input)?;

        let success = tracker.update_issue(&params).await?;
        to_json_text(&success)
    }
}
