//! Session tools: logout.

use serde_json::json;

use super::{McpTool, ToolContext};
use crate::error::ToolResult;
use crate::grants;

/// Revokes every grant of the current user.
pub struct LogoutTool;

#[async_trait::async_trait]
impl McpTool for LogoutTool {
    fn name(&self) -> &'static str {
        "logout"
    }

    fn description(&self) -> &'static str {
        "Log out of Linear by revoking every authorization granted to this server"
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, ctx: &ToolContext, _input: serde_json::Value) -> ToolResult<String> {
        ctx.tracker()?;
        let user_id = ctx.user_id()?;

        let revoked = grants::revoke_all_user_grants(ctx.grants.as_ref(), user_id).await?;
        tracing::info!(user_id = %user_id, revoked, "Logged out");

        if revoked == 0 {
            Ok("No active grants found.".to_string())
        } else {
            Ok(format!("Successfully revoked {revoked} grant(s)."))
        }
    }
}
