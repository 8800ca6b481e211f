//! MCP server loop, reading JSON-RPC requests from stdin line by line and
//! writing responses to stdout. Logs go to stderr so the protocol channel
//! stays clean.

use crate::protocol::{
    InitializeResult, JsonRpcRequest, JsonRpcResponse, ServerCapabilities, ServerInfo,
    ToolCallParams, ToolsCapability, ToolsListResult,
};
use crate::tools::{self, Services};
use anyhow::{Context, Result};
use scribe_atlassian::ProviderTransport;
use serde_json::json;
use std::io::{self, BufRead, Write};
use tracing::{debug, error, info};

const PROTOCOL_VERSION: &str = "2024-11-05";
const SERVER_NAME: &str = "scribe";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Run the server until stdin closes.
pub fn serve<C: ProviderTransport, J: ProviderTransport>(services: &Services<C, J>) -> Result<()> {
    info!("Starting MCP server");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = line.context("Failed to read from stdin")?;

        if line.trim().is_empty() {
            continue;
        }

        debug!("Received: {}", line);

        let request: JsonRpcRequest = match serde_json::from_str(&line) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse request: {}", e);
                let response = JsonRpcResponse::error(None, -32700, format!("Parse error: {e}"));
                write_response(&mut stdout, &response)?;
                continue;
            }
        };

        if let Some(response) = handle_request(services, &request) {
            write_response(&mut stdout, &response)?;
        }
    }

    Ok(())
}

fn write_response(stdout: &mut io::Stdout, response: &JsonRpcResponse) -> Result<()> {
    let json = serde_json::to_string(response)?;
    debug!("Sending: {}", json);
    writeln!(stdout, "{json}")?;
    stdout.flush()?;
    Ok(())
}

fn handle_request<C: ProviderTransport, J: ProviderTransport>(
    services: &Services<C, J>,
    request: &JsonRpcRequest,
) -> Option<JsonRpcResponse> {
    match request.method.as_str() {
        "initialize" => Some(handle_initialize(request)),
        "tools/list" => Some(handle_tools_list(request)),
        "tools/call" => Some(handle_tools_call(services, request)),
        "ping" => Some(JsonRpcResponse::success(request.id.clone(), json!({}))),
        method if method == "initialized" || method.starts_with("notifications/") => {
            // Notifications expect no response.
            debug!("Received notification: {}", method);
            None
        }
        _ => {
            error!("Unknown method: {}", request.method);
            Some(JsonRpcResponse::error(
                request.id.clone(),
                -32601,
                format!("Method not found: {}", request.method),
            ))
        }
    }
}

fn handle_initialize(request: &JsonRpcRequest) -> JsonRpcResponse {
    let result = InitializeResult {
        protocol_version: PROTOCOL_VERSION.to_string(),
        capabilities: ServerCapabilities {
            tools: ToolsCapability { list_changed: false },
        },
        server_info: ServerInfo {
            name: SERVER_NAME.to_string(),
            version: SERVER_VERSION.to_string(),
        },
    };

    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(request.id.clone(), value),
        Err(e) => JsonRpcResponse::error(request.id.clone(), -32603, e.to_string()),
    }
}

fn handle_tools_list(request: &JsonRpcRequest) -> JsonRpcResponse {
    let result = ToolsListResult {
        tools: tools::get_tool_definitions(),
    };
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(request.id.clone(), value),
        Err(e) => JsonRpcResponse::error(request.id.clone(), -32603, e.to_string()),
    }
}

fn handle_tools_call<C: ProviderTransport, J: ProviderTransport>(
    services: &Services<C, J>,
    request: &JsonRpcRequest,
) -> JsonRpcResponse {
    let params: ToolCallParams = match &request.params {
        Some(params) => match serde_json::from_value(params.clone()) {
            Ok(p) => p,
            Err(e) => {
                return JsonRpcResponse::error(
                    request.id.clone(),
                    -32602,
                    format!("Invalid params: {e}"),
                )
            }
        },
        None => return JsonRpcResponse::error(request.id.clone(), -32602, "Missing params"),
    };

    info!("Tool call: {}", params.name);

    let result = tools::handle_tool_call(services, &params.name, params.arguments);

    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(request.id.clone(), value),
        Err(e) => JsonRpcResponse::error(request.id.clone(), -32603, e.to_string()),
    }
}
