//! Chat completion client for the agent and its tools.
//!
//! - `ChatModel` is the seam for one chat completion call.
//! - `OpenAiChatModel` talks to an OpenAI-compatible `/chat/completions` endpoint.
//! - `ScriptedChatModel` replays queued completions for testing.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use docmind_core::error::{DocmindError, Result};

const SERVICE: &str = "language model";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A function call requested by the model. `arguments` is the raw JSON text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, content)
    }

    /// Assistant turn that requested tools.
    pub fn assistant_tool_calls(content: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content,
            tool_calls,
            tool_call_id: None,
        }
    }

    /// Output of one tool call, linked to the call by id.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }
}

/// Function exposed to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments object.
    pub parameters: Value,
}

/// Strict JSON-schema output constraint.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseFormat {
    pub name: String,
    pub schema: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolDefinition>,
    pub response_format: Option<ResponseFormat>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            tools: Vec::new(),
            response_format: None,
        }
    }
}

/// First choice of a chat completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatCompletion {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    /// Set when the model declined to follow a response format.
    pub refusal: Option<String>,
    pub finish_reason: Option<String>,
}

impl ChatCompletion {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            finish_reason: Some("stop".into()),
            ..Default::default()
        }
    }

    pub fn tool_call(id: impl Into<String>, name: impl Into<String>, arguments: &Value) -> Self {
        Self {
            tool_calls: vec![ToolCall {
                id: id.into(),
                name: name.into(),
                arguments: arguments.to_string(),
            }],
            finish_reason: Some("tool_calls".into()),
            ..Default::default()
        }
    }

    pub fn refusal(reason: impl Into<String>) -> Self {
        Self {
            refusal: Some(reason.into()),
            finish_reason: Some("stop".into()),
            ..Default::default()
        }
    }
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, request: ChatRequest) -> Result<ChatCompletion>;
}

// ---------------------------------------------------------------------------
// OpenAiChatModel
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct OpenAiChatModel {
    http: reqwest::Client,
    endpoint: String,
}

impl OpenAiChatModel {
    pub fn new(base_url: &str, api_key: Option<&str>, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(key) = api_key {
            let auth = format!("Bearer {}", key.trim());
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&auth)
                    .map_err(|e| DocmindError::Config(format!("invalid chat API key: {e}")))?,
            );
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| DocmindError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
        })
    }
}

fn message_to_wire(message: &ChatMessage) -> Value {
    let mut wire = json!({ "role": message.role, "content": message.content });
    if !message.tool_calls.is_empty() {
        wire["tool_calls"] = message
            .tool_calls
            .iter()
            .map(|call| {
                json!({
                    "id": call.id,
                    "type": "function",
                    "function": { "name": call.name, "arguments": call.arguments },
                })
            })
            .collect();
    }
    if let Some(id) = &message.tool_call_id {
        wire["tool_call_id"] = json!(id);
    }
    wire
}

/// Serialize a request in the OpenAI chat completions format.
pub(crate) fn request_body(request: &ChatRequest) -> Value {
    let mut body = json!({
        "model": request.model,
        "messages": request.messages.iter().map(message_to_wire).collect::<Vec<_>>(),
    });

    if !request.tools.is_empty() {
        body["tools"] = request
            .tools
            .iter()
            .map(|t| {
                json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters,
                    }
                })
            })
            .collect();
    }

    if let Some(format) = &request.response_format {
        body["response_format"] = json!({
            "type": "json_schema",
            "json_schema": {
                "name": format.name,
                "schema": format.schema,
                "strict": true,
            }
        });
    }
    body
}

/// Extract the first choice of a chat completions response.
pub(crate) fn parse_completion(body: &Value) -> Result<ChatCompletion> {
    let choice = body["choices"]
        .get(0)
        .ok_or_else(|| DocmindError::upstream(SERVICE, "no choices in response"))?;
    let message = &choice["message"];

    let tool_calls = match message["tool_calls"].as_array() {
        Some(calls) => calls
            .iter()
            .map(|t| -> Result<ToolCall> {
                let name = t["function"]["name"].as_str().ok_or_else(|| {
                    DocmindError::upstream(SERVICE, "tool call without function name")
                })?;
                Ok(ToolCall {
                    id: t["id"].as_str().unwrap_or_default().to_string(),
                    name: name.to_string(),
                    arguments: t["function"]["arguments"]
                        .as_str()
                        .unwrap_or_default()
                        .to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?,
        None => Vec::new(),
    };

    Ok(ChatCompletion {
        content: message["content"].as_str().map(String::from),
        tool_calls,
        refusal: message["refusal"].as_str().map(String::from),
        finish_reason: choice["finish_reason"].as_str().map(String::from),
    })
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    async fn complete(&self, request: ChatRequest) -> Result<ChatCompletion> {
        debug!(
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            structured = request.response_format.is_some(),
            "Requesting chat completion"
        );
        let response = self
            .http
            .post(&self.endpoint)
            .json(&request_body(&request))
            .send()
            .await
            .map_err(|e| DocmindError::upstream(SERVICE, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(DocmindError::upstream(
                SERVICE,
                format!("request failed ({status}): {text}"),
            ));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| DocmindError::upstream(SERVICE, format!("malformed response: {e}")))?;
        parse_completion(&body)
    }
}

// ---------------------------------------------------------------------------
// ScriptedChatModel - replays canned completions for testing
// ---------------------------------------------------------------------------

/// Chat model that answers from a queue and records every request.
///
/// An exhausted queue is reported as an upstream failure.
#[derive(Debug, Default)]
pub struct ScriptedChatModel {
    responses: Mutex<VecDeque<ChatCompletion>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedChatModel {
    pub fn new(responses: impl IntoIterator<Item = ChatCompletion>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ChatModel for ScriptedChatModel {
    async fn complete(&self, request: ChatRequest) -> Result<ChatCompletion> {
        self.requests
            .lock()
            .map_err(|e| DocmindError::upstream(SERVICE, format!("lock poisoned: {e}")))?
            .push(request);
        self.responses
            .lock()
            .map_err(|e| DocmindError::upstream(SERVICE, format!("lock poisoned: {e}")))?
            .pop_front()
            .ok_or_else(|| DocmindError::upstream(SERVICE, "scripted responses exhausted"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_includes_tools_and_tool_messages() {
        let mut request = ChatRequest::new(
            "o4-mini",
            vec![
                ChatMessage::system("be helpful"),
                ChatMessage::user("find my notes"),
                ChatMessage::assistant_tool_calls(
                    None,
                    vec![ToolCall {
                        id: "call_1".into(),
                        name: "documents_search".into(),
                        arguments: r#"{"query":"notes"}"#.into(),
                    }],
                ),
                ChatMessage::tool_result("call_1", r#"{"results":[]}"#),
            ],
        );
        request.tools.push(ToolDefinition {
            name: "documents_search".into(),
            description: "Search documents".into(),
            parameters: json!({"type": "object"}),
        });

        let body = request_body(&request);
        assert_eq!(body["model"], "o4-mini");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][2]["content"], Value::Null);
        assert_eq!(body["messages"][2]["tool_calls"][0]["type"], "function");
        assert_eq!(
            body["messages"][2]["tool_calls"][0]["function"]["name"],
            "documents_search"
        );
        assert_eq!(body["messages"][3]["role"], "tool");
        assert_eq!(body["messages"][3]["tool_call_id"], "call_1");
        assert_eq!(body["tools"][0]["function"]["name"], "documents_search");
        assert!(body.get("response_format").is_none());
    }

    #[test]
    fn test_request_body_with_response_format() {
        let mut request = ChatRequest::new("gpt-4o-mini", vec![ChatMessage::user("map this")]);
        request.response_format = Some(ResponseFormat {
            name: "mindmap".into(),
            schema: json!({"type": "object"}),
        });

        let body = request_body(&request);
        assert!(body.get("tools").is_none());
        assert_eq!(body["response_format"]["type"], "json_schema");
        assert_eq!(body["response_format"]["json_schema"]["name"], "mindmap");
        assert_eq!(body["response_format"]["json_schema"]["strict"], true);
    }

    #[test]
    fn test_parse_completion_with_tool_calls() {
        let body = json!({
            "choices": [{
                "finish_reason": "tool_calls",
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_abc",
                        "type": "function",
                        "function": {"name": "documents_search", "arguments": "{\"query\":\"x\"}"}
                    }]
                }
            }]
        });
        let completion = parse_completion(&body).unwrap();
        assert_eq!(completion.content, None);
        assert_eq!(completion.tool_calls.len(), 1);
        assert_eq!(completion.tool_calls[0].id, "call_abc");
        assert_eq!(completion.tool_calls[0].arguments, "{\"query\":\"x\"}");
        assert_eq!(completion.finish_reason.as_deref(), Some("tool_calls"));
    }

    #[test]
    fn test_parse_completion_refusal() {
        let body = json!({
            "choices": [{
                "finish_reason": "stop",
                "message": {"role": "assistant", "content": null, "refusal": "I can't help with that."}
            }]
        });
        let completion = parse_completion(&body).unwrap();
        assert_eq!(completion.refusal.as_deref(), Some("I can't help with that."));
        assert!(completion.tool_calls.is_empty());
    }

    #[test]
    fn test_parse_completion_without_choices_is_upstream_error() {
        let err = parse_completion(&json!({"choices": []})).unwrap_err();
        assert!(matches!(err, DocmindError::Upstream { .. }));
    }

    #[tokio::test]
    async fn test_scripted_model_replays_in_order() {
        let model = ScriptedChatModel::new([ChatCompletion::text("one"), ChatCompletion::text("two")]);
        let request = ChatRequest::new("m", vec![ChatMessage::user("hi")]);

        assert_eq!(
            model.complete(request.clone()).await.unwrap().content.as_deref(),
            Some("one")
        );
        assert_eq!(
            model.complete(request.clone()).await.unwrap().content.as_deref(),
            Some("two")
        );
        assert!(model.complete(request).await.is_err());
        assert_eq!(model.requests().len(), 3);
    }
}
