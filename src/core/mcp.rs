use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;

use crate::tools::{Tool, ToolMetadata, ToolParameter, ToolResult};

const PROTOCOL_VERSION: &str = "2024-11-05";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MCPTool {
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "inputSchema", default = "default_input_schema")]
    pub input_schema: Value,
}

fn default_input_schema() -> Value {
    json!({
        "type": "object",
        "properties": {}
    })
}

#[derive(Debug, Deserialize)]
struct MCPResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<MCPError>,
}

#[derive(Debug, Deserialize)]
struct MCPError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct CallToolResult {
    #[serde(default)]
    content: Vec<ContentItem>,
    #[serde(rename = "isError", default)]
    is_error: bool,
}

#[derive(Debug, Deserialize)]
struct ContentItem {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Join the text parts of a `tools/call` result.
///
/// Non-text parts (images, embedded resources) are skipped. A result flagged
/// with `isError` becomes an error carrying the server's text.
pub fn extract_text(result: Value) -> Result<String> {
    let parsed: CallToolResult =
        serde_json::from_value(result).context("Malformed tools/call result")?;

    let text = parsed
        .content
        .into_iter()
        .filter(|item| item.kind == "text")
        .filter_map(|item| item.text)
        .collect::<Vec<_>>()
        .join("\n");

    if parsed.is_error {
        anyhow::bail!("Tool reported an error: {}", text);
    }
    Ok(text)
}

/// Stdio client for a single MCP server process.
///
/// Messages are newline-delimited JSON-RPC 2.0. The stdout reader lives as
/// long as the client so buffered lines are never dropped between calls.
pub struct MCPClient {
    _process: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    request_id: u64,
    /// Set while a request line is being written. Still set on entry to
    /// `send` means a cancelled call left a partial line on stdin.
    write_pending: bool,
}

impl MCPClient {
    pub async fn new(command: &str, args: &[String]) -> Result<Self> {
        let mut process = Command::new(command)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to start MCP server `{}`", command))?;

        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| anyhow::anyhow!("Failed to get stdin"))?;
        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| anyhow::anyhow!("Failed to get stdout"))?;

        let mut client = Self {
            _process: process,
            stdin,
            stdout: BufReader::new(stdout),
            request_id: 0,
            write_pending: false,
        };

        client.initialize().await?;
        Ok(client)
    }

    async fn initialize(&mut self) -> Result<()> {
        let result = self
            .request(
                "initialize",
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {
                        "name": env!("CARGO_PKG_NAME"),
                        "version": env!("CARGO_PKG_VERSION")
                    }
                }),
            )
            .await?;

        if let Some(server) = result.get("serverInfo") {
            tracing::info!("Connected to MCP server: {}", server);
        }

        self.send(&json!({
            "jsonrpc": "2.0",
            "method": "notifications/initialized"
        }))
        .await
    }

    pub async fn list_tools(&mut self) -> Result<Vec<MCPTool>> {
        let result = self.request("tools/list", json!({})).await?;
        let tools = match result.get("tools") {
            Some(tools) => serde_json::from_value(tools.clone())?,
            None => vec![],
        };
        Ok(tools)
    }

    pub async fn call_tool(&mut self, name: &str, arguments: Value) -> Result<String> {
        let result = self
            .request(
                "tools/call",
                json!({
                    "name": name,
                    "arguments": arguments
                }),
            )
            .await?;

        extract_text(result)
    }

    async fn request(&mut self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id();
        self.send(&json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params
        }))
        .await?;

        let response = self.read_response(id).await?;

        if let Some(error) = response.error {
            anyhow::bail!("{} failed ({}): {}", method, error.code, error.message);
        }
        response
            .result
            .ok_or_else(|| anyhow::anyhow!("No result from {}", method))
    }

    async fn send(&mut self, message: &Value) -> Result<()> {
        let mut line = serde_json::to_vec(message)?;
        line.push(b'\n');

        if self.write_pending {
            // terminate the fragment so this request starts on its own line
            tracing::warn!("Previous MCP request was interrupted mid-write");
            self.stdin.write_all(b"\n").await?;
        }

        self.write_pending = true;
        self.stdin.write_all(&line).await?;
        self.stdin.flush().await?;
        self.write_pending = false;
        Ok(())
    }

    /// Read lines until the response for `id` arrives, skipping
    /// notifications and any non-JSON noise the server prints.
    async fn read_response(&mut self, id: u64) -> Result<MCPResponse> {
        loop {
            let mut line = String::new();
            let read = self.stdout.read_line(&mut line).await?;
            if read == 0 {
                anyhow::bail!("MCP server closed its output");
            }

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let value: Value = match serde_json::from_str(line) {
                Ok(value) => value,
                Err(_) => {
                    tracing::debug!("Skipping non-JSON line from MCP server: {}", line);
                    continue;
                }
            };

            if value.get("id").and_then(Value::as_u64) != Some(id) {
                tracing::debug!("Skipping unrelated MCP message: {}", line);
                continue;
            }

            return Ok(serde_json::from_value(value)?);
        }
    }

    fn next_id(&mut self) -> u64 {
        self.request_id += 1;
        self.request_id
    }
}

/// One remote MCP tool exposed through the `Tool` trait.
///
/// All tools of a server share the same client, serialized by a mutex.
pub struct McpTool {
    client: Arc<Mutex<MCPClient>>,
    tool_name: String,
    description: String,
    input_schema: Value,
}

impl McpTool {
    pub fn new(client: Arc<Mutex<MCPClient>>, tool: MCPTool) -> Self {
        Self {
            client,
            tool_name: tool.name,
            description: tool.description.unwrap_or_default(),
            input_schema: tool.input_schema,
        }
    }
}

/// Flatten a JSON schema's top-level properties into tool parameters.
pub fn schema_parameters(input_schema: &Value) -> Vec<ToolParameter> {
    let Some(props) = input_schema.get("properties").and_then(Value::as_object) else {
        return vec![];
    };

    let required: Vec<&str> = input_schema
        .get("required")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let mut parameters: Vec<ToolParameter> = props
        .iter()
        .map(|(name, schema)| ToolParameter {
            name: name.clone(),
            description: schema
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string(),
            param_type: schema
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("string")
                .to_string(),
            required: required.contains(&name.as_str()),
        })
        .collect();

    parameters.sort_by(|a, b| b.required.cmp(&a.required).then(a.name.cmp(&b.name)));
    parameters
}

#[async_trait]
impl Tool for McpTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            name: self.tool_name.clone(),
            description: self.description.clone(),
            parameters: schema_parameters(&self.input_schema),
        }
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        let mut client = self.client.lock().await;
        match client.call_tool(&self.tool_name, args).await {
            Ok(text) => Ok(ToolResult::success(text)),
            Err(e) => Ok(ToolResult::failure(e.to_string())),
        }
    }

    fn validate(&self, args: &Value) -> Result<()> {
        if !args.is_object() {
            anyhow::bail!("Validation failed: arguments must be a JSON object");
        }
        for param in schema_parameters(&self.input_schema) {
            if param.required && args.get(&param.name).is_none() {
                anyhow::bail!("Validation failed: missing required argument '{}'", param.name);
            }
        }
        Ok(())
    }
}

/// Start the MCP server and wrap every tool it advertises.
pub async fn discover_mcp_tools(
    server_command: &str,
    server_args: &[String],
) -> Result<Vec<Arc<dyn Tool>>> {
    tracing::info!(
        "Discovering tools from MCP server: {} {}",
        server_command,
        server_args.join(" ")
    );

    let mut client = MCPClient::new(server_command, server_args).await?;
    let tools = client.list_tools().await?;

    tracing::info!("Found {} tools from MCP server", tools.len());

    let client = Arc::new(Mutex::new(client));
    let wrappers = tools
        .into_iter()
        .map(|tool| {
            tracing::debug!("Wrapping MCP tool: {}", tool.name);
            Arc::new(McpTool::new(client.clone(), tool)) as Arc<dyn Tool>
        })
        .collect();

    Ok(wrappers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_text_joins_text_parts() {
        let result = json!({
            "content": [
                {"type": "text", "text": "first"},
                {"type": "image", "data": "...", "mimeType": "image/png"},
                {"type": "text", "text": "second"}
            ]
        });
        assert_eq!(extract_text(result).unwrap(), "first\nsecond");
    }

    #[test]
    fn test_extract_text_empty_content() {
        assert_eq!(extract_text(json!({"content": []})).unwrap(), "");
        assert_eq!(extract_text(json!({})).unwrap(), "");
    }

    #[test]
    fn test_extract_text_error_flag() {
        let result = json!({
            "content": [{"type": "text", "text": "library not found"}],
            "isError": true
        });
        let err = extract_text(result).unwrap_err();
        assert!(err.to_string().contains("library not found"));
    }

    #[test]
    fn test_tool_listing_uses_input_schema() {
        let tool: MCPTool = serde_json::from_value(json!({
            "name": "get-library-docs",
            "description": "Fetch docs",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "context7CompatibleLibraryID": {"type": "string", "description": "Library id"},
                    "tokens": {"type": "number"}
                },
                "required": ["context7CompatibleLibraryID"]
            }
        }))
        .unwrap();

        let params = schema_parameters(&tool.input_schema);
        assert_eq!(params.len(), 2);
        assert_eq!(params[0].name, "context7CompatibleLibraryID");
        assert!(params[0].required);
        assert_eq!(params[1].name, "tokens");
        assert_eq!(params[1].param_type, "number");
        assert!(!params[1].required);
    }

    #[test]
    fn test_missing_schema_defaults_to_empty_object() {
        let tool: MCPTool = serde_json::from_value(json!({"name": "ping"})).unwrap();
        assert!(schema_parameters(&tool.input_schema).is_empty());
        assert!(tool.description.is_none());
    }

    /// Replies "clean" only if the fragment and the request arrive as
    /// separate lines.
    #[cfg(unix)]
    const RESYNC_SERVER: &str = r#"
read init
printf '%s\n' '{"jsonrpc":"2.0","id":1,"result":{}}'
read initialized
read fragment
read call
if [ "$fragment" = '{"partial":' ]; then text=clean; else text=garbled; fi
printf '{"jsonrpc":"2.0","id":2,"result":{"content":[{"type":"text","text":"%s"}]}}\n' "$text"
read done
"#;

    #[cfg(unix)]
    #[tokio::test]
    async fn test_interrupted_write_is_terminated_before_next_request() {
        let args = vec!["-c".to_string(), RESYNC_SERVER.to_string()];
        let mut client = MCPClient::new("sh", &args).await.unwrap();

        // what a call cancelled inside write_all leaves on the pipe
        client.stdin.write_all(b"{\"partial\":").await.unwrap();
        client.write_pending = true;

        let text = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            client.call_tool("get-library-docs", json!({})),
        )
        .await
        .expect("request was appended to the fragment")
        .unwrap();
        assert_eq!(text, "clean");
        assert!(!client.write_pending);
    }

    #[tokio::test]
    async fn test_spawn_failure_is_reported() {
        let result = MCPClient::new("definitely-not-a-real-mcp-binary", &[]).await;
        let err = result.err().unwrap();
        assert!(err.to_string().contains("Failed to start MCP server"));
    }
}
