//! Stdio transport for MCP protocol.
//!
//! Handles newline-delimited JSON-RPC 2.0 over stdin/stdout. There is no
//! OAuth here: the session props come from the process environment.

use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use super::transport::{JsonRpcRequest, JsonRpcResponse, dispatch};
use crate::tools::{McpTool, ToolContext};

/// Handle MCP protocol over stdio.
pub async fn run_stdio(tools: Vec<Box<dyn McpTool>>, ctx: ToolContext) -> anyhow::Result<()> {
    serve(tokio::io::stdin(), tokio::io::stdout(), &tools, &ctx).await
}

/// Serve requests from `input` until EOF, writing responses to `output`.
pub async fn serve<R, W>(
    input: R,
    mut output: W,
    tools: &[Box<dyn McpTool>],
    ctx: &ToolContext,
) -> anyhow::Result<()>
where
    R: tokio::io::AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut reader = BufReader::new(input);
    let mut line = String::new();

    tracing::info!("MCP stdio server ready, waiting for requests...");

    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            tracing::info!("Stdin closed, shutting down");
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<JsonRpcRequest>(trimmed) {
            Ok(request) => {
                tracing::debug!(method = %request.method, "Received request");
                dispatch(&request, tools, ctx).await
            }
            Err(e) => Some(JsonRpcResponse::error(None, -32700, format!("Parse error: {e}"))),
        };

        if let Some(response) = response {
            write_response(&mut output, &response).await?;
        }
    }

    Ok(())
}

async fn write_response<W: AsyncWrite + Unpin>(
    output: &mut W,
    response: &JsonRpcResponse,
) -> anyhow::Result<()> {
    let response_json = serde_json::to_string(response)?;
    output.write_all(response_json.as_bytes()).await?;
    output.write_all(b"\n").await?;
    output.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::client::LinearClient;
    use crate::config::Config;
    use crate::grants::KvGrantStore;
    use crate::kv::MemoryKv;
    use crate::tools;

    async fn run(input: &str) -> Vec<serde_json::Value> {
        let client = LinearClient::new(&Config::for_testing("http://unused.localhost")).unwrap();
        let ctx = ToolContext::new(client, Arc::new(KvGrantStore::new(Arc::new(MemoryKv::new()))), None);
        let mut output = Vec::new();

        serve(input.as_bytes(), &mut output, &tools::register_all_tools(), &ctx).await.unwrap();

        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_initialize_and_list() {
        let responses = run(concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
            "\n",
        ))
        .await;

        // The notification gets no reply
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["result"]["serverInfo"]["name"], "linear-mcp");
        assert_eq!(responses[1]["result"]["tools"].as_array().unwrap().len(), 12);
    }

    #[tokio::test]
    async fn test_tool_without_token_is_error_content() {
        let responses = run(concat!(
            r#"{"jsonrpc":"2.0","id":7,"method":"tools/call","params":{"name":"list_teams"}}"#,
            "\n"
        ))
        .await;

        let result = &responses[0]["result"];
        assert_eq!(result["isError"], true);
        assert_eq!(result["content"][0]["text"], "No access token found");
    }

    #[tokio::test]
    async fn test_parse_error() {
        let responses = run("not json\n").await;
        assert_eq!(responses[0]["error"]["code"], -32700);
    }
}
