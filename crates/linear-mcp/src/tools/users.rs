//! User tools: whoami, get_user_by_id, list_users.

use serde_json::json;

use super::{McpTool, ToolContext, to_json_text};
use crate::error::ToolResult;
use crate::models::IdInput;

/// Current user tool.
pub struct WhoamiTool;

#[async_trait::async_trait]
impl McpTool for WhoamiTool {
    fn name(&self) -> &'static str {
        "whoami"
    }

    fn description(&self) -> &'static str {
        "Get the current user's details"
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, ctx: &ToolContext, _input: serde_json::Value) -> ToolResult<String> {
        let user = ctx.tracker()?.viewer().await?;
        to_json_text(&user)
    }
}

/// User lookup tool.
pub struct GetUserByIdTool;

#[async_trait::async_trait]
impl McpTool for GetUserByIdTool {
    fn name(&self) -> &'static str {
        "get_user_by_id"
    }

    fn description(&self) -> &'static str {
        "Get a user by their ID"
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "id": {"type": "string", "description": "User ID"}
            },
            "required": ["id"]
        })
    }

    async fn execute(&self, ctx: &ToolContext, input: serde_json::Value) -> ToolResult<String> {
        let tracker = ctx.tracker()?;
        let params: IdInput = serde_json::from_value(input)?;

        let user = tracker.user(&params.id).await?;
        to_json_text(&user)
    }
}

/// User listing tool.
pub struct ListUsersTool;

#[async_trait::async_trait]
impl McpTool for ListUsersTool {
    fn name(&self) -> &'static str {
        "list_users"
    }

    fn description(&self) -> &'static str {
        "List all users"
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, ctx: &ToolContext, _input: serde_json::Value) -> ToolResult<String> {
        let users = ctx.tracker()?.users().await?;
        to_json_text(&users)
    }
}
