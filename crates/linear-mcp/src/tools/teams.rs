//! Team tools: get_team_by_id, list_teams.

use serde_json::json;

use super::{McpTool, ToolContext, to_json_text};
use crate::error::ToolResult;
use crate::models::{IdInput, ListTeamsInput};

/// Team lookup tool.
pub struct GetTeamByIdTool;

#[async_trait::async_trait]
impl McpTool for GetTeamByIdTool {
    fn name(&self) -> &'static str {
        "get_team_by_id"
    }

    fn description(&self) -> &'static str {
        "Get a team by its ID"
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "id": {"type": "string", "description": "Team ID"}
            },
            "required": ["id"]
        })
    }

    async fn execute(&self, ctx: &ToolContext, input: serde_json::Value) -> ToolResult<String> {
        let tracker = ctx.tracker()?;
        let params: IdInput = serde_json::from_value(input)?;

        let team = tracker.team(&params.id).await?;
        to_json_text(&team)
    }
}

/// Team listing tool.
pub struct ListTeamsTool;

#[async_trait::async_trait]
impl McpTool for ListTeamsTool {
    fn name(&self) -> &'static str {
        "list_teams"
    }

    fn description(&self) -> &'static str {
        "List all teams"
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "filter": {
                    "type": "object",
                    "description": "Only use this if you need to filter the teams",
                    "properties": {
                        "id": super::id_comparator_schema("Search by team ID")
                    }
                }
            }
        })
    }

    async fn execute(&self, ctx: &ToolContext, input: serde_json::Value) -> ToolResult<String> {
        let tracker = ctx.tracker()?;
        let params: ListTeamsInput = serde_json::from_value(input)?;

        let teams = tracker.teams(params.filter.as_ref()).await?;
        to_json_text(&teams)
    }
}
