use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::time::Duration;

use crate::config::LlmConfig;

/// A function tool the model may invoke during a conversation.
#[derive(Debug, Clone)]
pub struct ToolDef {
    pub name: &'static str,
    pub description: &'static str,
    /// JSON Schema for the tool arguments
    pub parameters: Value,
}

impl ToolDef {
    fn schema(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters,
            }
        })
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone)]
pub struct ToolCall {
    /// Call id, present for OpenAI-compatible providers
    pub id: Option<String>,
    pub name: String,
    pub arguments: Value,
}

/// One assistant turn: either final text or a batch of tool invocations.
#[derive(Debug)]
pub enum ChatTurn {
    Content(String),
    ToolCalls {
        /// The raw assistant message, echoed back into the conversation
        /// before the tool results.
        assistant_message: Value,
        calls: Vec<ToolCall>,
    },
}

/// Send the conversation so far (raw role-tagged messages) plus the tool
/// schemas, and return the model's next turn.
pub async fn chat_with_tools(
    client: &reqwest::Client,
    config: &LlmConfig,
    messages: &[Value],
    tools: &[ToolDef],
    timeout: Duration,
) -> Result<ChatTurn> {
    let tool_schemas: Vec<Value> = tools.iter().map(|t| t.schema()).collect();
    match config.provider.as_str() {
        "ollama" => chat_ollama(client, config, messages, &tool_schemas, timeout).await,
        "openai" => chat_openai(client, config, messages, &tool_schemas, timeout).await,
        other => anyhow::bail!("Unknown LLM provider: {other}"),
    }
}

/// Build the tool-result message for a completed call, in the shape the
/// configured provider expects.
pub fn tool_result_message(config: &LlmConfig, call: &ToolCall, result: &str) -> Value {
    match config.provider.as_str() {
        "openai" => json!({
            "role": "tool",
            "tool_call_id": call.id.clone().unwrap_or_default(),
            "content": result,
        }),
        // Ollama ties results to calls by order, not id
        _ => json!({
            "role": "tool",
            "content": result,
        }),
    }
}

// ─── Ollama ──────────────────────────────────────────────

async fn chat_ollama(
    client: &reqwest::Client,
    config: &LlmConfig,
    messages: &[Value],
    tool_schemas: &[Value],
    timeout: Duration,
) -> Result<ChatTurn> {
    let url = format!("{}/api/chat", config.base_url);

    let req = json!({
        "model": config.chat_model,
        "messages": messages,
        "tools": tool_schemas,
        "stream": false,
    });

    let resp = client
        .post(&url)
        .timeout(timeout)
        .json(&req)
        .send()
        .await
        .context("Failed to call Ollama chat API with tools")?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("Ollama chat API returned {status}: {body}");
    }

    let body: Value = resp
        .json()
        .await
        .context("Failed to parse Ollama tool-chat response")?;
    let message = body
        .get("message")
        .cloned()
        .context("Ollama response missing message")?;

    parse_turn(message, /* arguments_are_json_strings */ false)
}

// ─── OpenAI-compatible ───────────────────────────────────

async fn chat_openai(
    client: &reqwest::Client,
    config: &LlmConfig,
    messages: &[Value],
    tool_schemas: &[Value],
    timeout: Duration,
) -> Result<ChatTurn> {
    let url = format!("{}/v1/chat/completions", config.base_url);
    let api_key = config.api_key.as_deref().unwrap_or_default();

    let req = json!({
        "model": config.chat_model,
        "messages": messages,
        "tools": tool_schemas,
        "tool_choice": "auto",
    });

    let resp = client
        .post(&url)
        .timeout(timeout)
        .header("Authorization", format!("Bearer {api_key}"))
        .json(&req)
        .send()
        .await
        .context("Failed to call OpenAI chat API with tools")?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("OpenAI chat API returned {status}: {body}");
    }

    let body: Value = resp
        .json()
        .await
        .context("Failed to parse OpenAI tool-chat response")?;
    let message = body
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .cloned()
        .context("OpenAI response missing choices[0].message")?;

    parse_turn(message, /* arguments_are_json_strings */ true)
}

/// Interpret an assistant message as either final content or tool calls.
/// OpenAI encodes tool arguments as JSON strings; Ollama as JSON objects.
fn parse_turn(message: Value, arguments_are_json_strings: bool) -> Result<ChatTurn> {
    let tool_calls = message
        .get("tool_calls")
        .and_then(|t| t.as_array())
        .cloned()
        .unwrap_or_default();

    if tool_calls.is_empty() {
        let content = message
            .get("content")
            .and_then(|c| c.as_str())
            .unwrap_or_default()
            .to_string();
        return Ok(ChatTurn::Content(content));
    }

    let mut calls = Vec::with_capacity(tool_calls.len());
    for call in &tool_calls {
        let id = call
            .get("id")
            .and_then(|i| i.as_str())
            .map(|s| s.to_string());
        let function = call.get("function").context("Tool call missing function")?;
        let name = function
            .get("name")
            .and_then(|n| n.as_str())
            .context("Tool call missing function name")?
            .to_string();

        let arguments = match function.get("arguments") {
            Some(Value::String(s)) if arguments_are_json_strings => {
                serde_json::from_str(s).unwrap_or_else(|_| json!({}))
            }
            Some(v) => v.clone(),
            None => json!({}),
        };

        calls.push(ToolCall {
            id,
            name,
            arguments,
        });
    }

    Ok(ChatTurn::ToolCalls {
        assistant_message: message,
        calls,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_content_turn() {
        let message = json!({"role": "assistant", "content": "The answer is 42."});
        match parse_turn(message, true).unwrap() {
            ChatTurn::Content(text) => assert_eq!(text, "The answer is 42."),
            _ => panic!("expected content turn"),
        }
    }

    #[test]
    fn test_parse_openai_tool_call_with_string_arguments() {
        let message = json!({
            "role": "assistant",
            "content": null,
            "tool_calls": [{
                "id": "call_1",
                "function": {
                    "name": "search_code",
                    "arguments": "{\"query\": \"auth\", \"max_results\": 5}"
                }
            }]
        });
        match parse_turn(message, true).unwrap() {
            ChatTurn::ToolCalls { calls, .. } => {
                assert_eq!(calls.len(), 1);
                assert_eq!(calls[0].name, "search_code");
                assert_eq!(calls[0].id.as_deref(), Some("call_1"));
                assert_eq!(calls[0].arguments["query"], "auth");
            }
            _ => panic!("expected tool calls"),
        }
    }

    #[test]
    fn test_parse_ollama_tool_call_with_object_arguments() {
        let message = json!({
            "role": "assistant",
            "content": "",
            "tool_calls": [{
                "function": {
                    "name": "get_file_content",
                    "arguments": {"file_path": "src/main.rs"}
                }
            }]
        });
        match parse_turn(message, false).unwrap() {
            ChatTurn::ToolCalls { calls, .. } => {
                assert_eq!(calls[0].name, "get_file_content");
                assert!(calls[0].id.is_none());
                assert_eq!(calls[0].arguments["file_path"], "src/main.rs");
            }
            _ => panic!("expected tool calls"),
        }
    }

    #[test]
    fn test_parse_malformed_arguments_falls_back_to_empty_object() {
        let message = json!({
            "role": "assistant",
            "tool_calls": [{
                "id": "call_2",
                "function": {"name": "search_code", "arguments": "{broken"}
            }]
        });
        match parse_turn(message, true).unwrap() {
            ChatTurn::ToolCalls { calls, .. } => {
                assert_eq!(calls[0].arguments, json!({}));
            }
            _ => panic!("expected tool calls"),
        }
    }

    #[test]
    fn test_tool_result_message_shapes() {
        let call = ToolCall {
            id: Some("call_9".to_string()),
            name: "search_code".to_string(),
            arguments: json!({}),
        };
        let openai = LlmConfig {
            provider: "openai".to_string(),
            ..LlmConfig::default()
        };
        let msg = tool_result_message(&openai, &call, "found it");
        assert_eq!(msg["tool_call_id"], "call_9");

        let ollama = LlmConfig::default();
        let msg = tool_result_message(&ollama, &call, "found it");
        assert!(msg.get("tool_call_id").is_none());
        assert_eq!(msg["role"], "tool");
    }
}
