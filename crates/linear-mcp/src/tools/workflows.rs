//! Workflow tools: list_workflows.

use serde_json::json;

use super::{McpTool, ToolContext, id_comparator_schema, to_json_text};
use crate::error::ToolResult;
use crate::models::ListWorkflowsInput;

/// Workflow state listing tool.
pub struct ListWorkflowsTool;

#[async_trait::async_trait]
impl McpTool for ListWorkflowsTool {
    fn name(&self) -> &'static str {
        "list_workflows"
    }

    fn description(&self) -> &'static str {
        "List all workflows, useful when you need a stateId"
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "teamId": id_comparator_schema(
                    "You should only get workflows relevant to the team you are working on"
                )
            },
            "required": ["teamId"]
        })
    }

    async fn execute(&self, ctx: &ToolContext, input: serde_json::Value) -> ToolResult<String> {
        let tracker = ctx.tracker()?;
        let params: ListWorkflowsInput = serde_json::from_value(input)?;

        let filter = json!({ "team": { "id": params.team_id } });
        let states = tracker.workflow_states(filter).await?;
        to_json_text(&states)
    }
}
