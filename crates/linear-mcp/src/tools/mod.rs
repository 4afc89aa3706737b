//! MCP tool implementations.
//!
//! Each tool:
//! 1. Parses its typed input from the call arguments
//! 2. Calls the Linear API as the session's user
//! 3. Returns the result as JSON text

mod issues;
mod session;
mod teams;
mod users;
mod workflows;

pub use issues::*;
pub use session::*;
pub use teams::*;
pub use users::*;
pub use workflows::*;

use std::sync::Arc;

use crate::client::LinearClient;
use crate::error::{ToolError, ToolResult};
use crate::grants::{GrantStore, SessionProps};

/// Tool execution context for one session.
#[derive(Clone)]
pub struct ToolContext {
    /// API client without credentials; see [`Self::tracker`].
    pub client: LinearClient,

    /// Grant store used by `logout`.
    pub grants: Arc<dyn GrantStore>,

    /// Props of the authenticated session, if any.
    pub props: Option<SessionProps>,
}

impl ToolContext {
    /// Create a new tool context.
    #[must_use]
    pub fn new(client: LinearClient, grants: Arc<dyn GrantStore>, props: Option<SessionProps>) -> Self {
        Self { client, grants, props }
    }

    /// The same context bound to another session's props.
    #[must_use]
    pub fn with_props(&self, props: Option<SessionProps>) -> Self {
        Self { props, ..self.clone() }
    }

    /// A client authenticated with the session's access token.
    ///
    /// # Errors
    ///
    /// Returns `NoAccessToken` when the session carries none.
    pub fn tracker(&self) -> ToolResult<LinearClient> {
        self.props
            .as_ref()
            .and_then(SessionProps::access_token)
            .map(|token| self.client.with_access_token(token))
            .ok_or(ToolError::NoAccessToken)
    }

    /// The session's Linear user id.
    ///
    /// # Errors
    ///
    /// Returns `NoUserContext` when the session carries none.
    pub fn user_id(&self) -> ToolResult<&str> {
        self.props.as_ref().and_then(SessionProps::user_id).ok_or(ToolError::NoUserContext)
    }
}

impl std::fmt::Debug for ToolContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolContext")
            .field("has_props", &self.props.is_some())
            .finish()
    }
}

/// Trait for MCP tools.
#[async_trait::async_trait]
pub trait McpTool: Send + Sync {
    /// Tool name (e.g., "list_issues").
    fn name(&self) -> &'static str;

    /// Tool description for LLM.
    fn description(&self) -> &'static str;

    /// JSON Schema for input parameters.
    fn input_schema(&self) -> serde_json::Value;

    /// Execute the tool with given input.
    async fn execute(&self, ctx: &ToolContext, input: serde_json::Value) -> ToolResult<String>;
}

/// Register all tools.
#[must_use]
pub fn register_all_tools() -> Vec<Box<dyn McpTool>> {
    vec![
        // Users (3)
        Box::new(users::WhoamiTool),
        Box::new(users::GetUserByIdTool),
        Box::new(users::ListUsersTool),
        // Teams (2)
        Box::new(teams::GetTeamByIdTool),
        Box::new(teams::ListTeamsTool),
        // Issues (5)
        Box::new(issues::GetIssueByIdTool),
        Box::new(issues::ListIssuesTool),
        Box::new(issues::SearchIssueTool),
        Box::new(issues::CreateIssueTool),
        Box::new(issues::UpdateIssueTool),
        // Workflows (1)
        Box::new(workflows::ListWorkflowsTool),
        // Session (1)
        Box::new(session::LogoutTool),
    ]
}

/// Find a tool by exact name.
#[must_use]
pub fn find_tool<'a>(tools: &'a [Box<dyn McpTool>], name: &str) -> Option<&'a dyn McpTool> {
    tools.iter().find(|t| t.name() == name).map(AsRef::as_ref)
}

/// Outcome of a tool call, rendered as MCP `content`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub text: String,
    pub is_error: bool,
}

impl ToolOutput {
    /// The MCP `tools/call` result object.
    #[must_use]
    pub fn to_result(&self) -> serde_json::Value {
        let mut result = serde_json::json!({
            "content": [{
                "type": "text",
                "text": self.text
            }]
        });
        if self.is_error {
            result["isError"] = serde_json::Value::Bool(true);
        }
        result
    }
}

/// Run a tool, turning failures into error content so a call never aborts the session.
pub async fn call_tool(tool: &dyn McpTool, ctx: &ToolContext, input: serde_json::Value) -> ToolOutput {
    tracing::info!(tool = %tool.name(), "Executing tool");

    match tool.execute(ctx, input).await {
        Ok(text) => ToolOutput { text, is_error: false },
        Err(e) => {
            tracing::warn!(tool = %tool.name(), error = %e, "Tool execution failed");
            ToolOutput { text: e.to_user_message(), is_error: true }
        }
    }
}

/// Schema of [`crate::models::IdComparator`].
pub(crate) fn id_comparator_schema(description: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "description": description,
        "properties": {
            "eq": {"type": "string"},
            "neq": {"type": "string"},
            "in": {"type": "array", "items": {"type": "string"}},
            "nin": {"type": "array", "items": {"type": "string"}}
        }
    })
}

/// Schema of [`crate::models::DateComparator`].
pub(crate) fn date_comparator_schema(description: &str) -> serde_json::Value {
    let date = serde_json::json!({"type": "string", "description": "ISO 8601 date or duration"});
    let dates = serde_json::json!({"type": "array", "items": {"type": "string"}});
    serde_json::json!({
        "type": "object",
        "description": description,
        "properties": {
            "eq": date, "neq": date,
            "gt": date, "gte": date,
            "lt": date, "lte": date,
            "in": dates, "nin": dates,
            "null": {"type": "boolean"}
        }
    })
}

/// Serialize a tool result as compact JSON text.
pub(crate) fn to_json_text<T: serde::Serialize>(value: &T) -> ToolResult<String> {
    Ok(serde_json::to_string(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::grants::KvGrantStore;
    use crate::kv::MemoryKv;

    fn context(props: Option<SessionProps>) -> ToolContext {
        let client = LinearClient::new(&Config::for_testing("http://unused.localhost")).unwrap();
        ToolContext::new(client, Arc::new(KvGrantStore::new(Arc::new(MemoryKv::new()))), props)
    }

    #[test]
    fn test_registry_names_are_unique() {
        let tools = register_all_tools();
        let mut names: Vec<_> = tools.iter().map(|t| t.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), tools.len());
        assert_eq!(tools.len(), 12);
    }

    #[test]
    fn test_find_tool_is_exact() {
        let tools = register_all_tools();
        assert!(find_tool(&tools, "list_issues").is_some());
        assert!(find_tool(&tools, "list_issue").is_none());
        assert!(find_tool(&tools, "LIST_ISSUES").is_none());
    }

    #[test]
    fn test_schemas_are_objects() {
        for tool in register_all_tools() {
            assert_eq!(tool.input_schema()["type"], "object", "{}", tool.name());
        }
    }

    #[test]
    fn test_tracker_requires_token() {
        assert!(matches!(context(None).tracker(), Err(ToolError::NoAccessToken)));
        let empty = context(Some(SessionProps::from_access_token("")));
        assert!(matches!(empty.tracker(), Err(ToolError::NoAccessToken)));
        assert!(context(Some(SessionProps::from_access_token("t"))).tracker().is_ok());
    }

    #[tokio::test]
    async fn test_call_tool_wraps_errors() {
        let tools = register_all_tools();
        let tool = find_tool(&tools, "whoami").unwrap();

        let output = call_tool(tool, &context(None), serde_json::json!({})).await;
        assert!(output.is_error);
        assert_eq!(output.text, "No access token found");
        assert_eq!(output.to_result()["isError"], true);
    }
}
