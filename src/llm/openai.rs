//! OpenAI-compatible chat-completions client.

use super::{ChatMessage, Completion, CompletionRequest, ReasoningService, Role, ServiceError, ToolCall};
use crate::config::AssistantConfig;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{Value, json};
use tracing::{debug, warn};

/// Error codes the API uses for quota and rate-limit failures.
const RATE_LIMIT_CODES: [&str; 2] = ["rate_limit_exceeded", "insufficient_quota"];

pub struct OpenAiClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(config: &AssistantConfig, api_key: String) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ServiceError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", config.api_base.trim_end_matches('/')),
            api_key,
            model: config.model.clone(),
        })
    }

    fn request_body(&self, request: &CompletionRequest) -> Value {
        let messages: Vec<Value> = request.messages.iter().map(message_to_wire).collect();
        let mut body = json!({
            "model": self.model,
            "messages": messages,
        });

        if !request.functions.is_empty() {
            let tools: Vec<Value> = request
                .functions
                .iter()
                .map(|f| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": f.name,
                            "description": f.description,
                            "parameters": f.parameters,
                        }
                    })
                })
                .collect();
            body["tools"] = json!(tools);
            body["tool_choice"] = json!(request.tool_choice.as_str());
        }

        body
    }
}

fn message_to_wire(message: &ChatMessage) -> Value {
    let role = match message.role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    };
    let mut wire = json!({
        "role": role,
        "content": message.content,
    });
    if !message.tool_calls.is_empty() {
        wire["tool_calls"] = json!(
            message
                .tool_calls
                .iter()
                .map(|c| json!({
                    "id": c.id,
                    "type": "function",
                    "function": { "name": c.name, "arguments": c.arguments }
                }))
                .collect::<Vec<_>>()
        );
    }
    if let Some(ref id) = message.tool_call_id {
        wire["tool_call_id"] = json!(id);
    }
    wire
}

/// Map a non-success HTTP response to a service error.
pub(crate) fn classify_failure(status: StatusCode, body: &str) -> ServiceError {
    let code = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["code"].as_str().map(String::from));

    if status == StatusCode::TOO_MANY_REQUESTS
        || code.as_deref().is_some_and(|c| RATE_LIMIT_CODES.contains(&c))
    {
        return ServiceError::RateLimited(code.unwrap_or_else(|| status.to_string()));
    }

    ServiceError::Http {
        status: status.as_u16(),
        body: body.chars().take(500).collect(),
    }
}

/// Extract text and function calls from a chat-completions response.
pub(crate) fn parse_completion(response: &Value) -> Result<Completion, ServiceError> {
    let message = response["choices"]
        .as_array()
        .and_then(|choices| choices.first())
        .map(|choice| &choice["message"])
        .ok_or_else(|| ServiceError::InvalidResponse("no choices in response".to_string()))?;

    let content = message["content"].as_str().map(String::from);

    let mut tool_calls = Vec::new();
    if let Some(calls) = message["tool_calls"].as_array() {
        for call in calls {
            let id = call["id"].as_str();
            let name = call["function"]["name"].as_str();
            let (Some(id), Some(name)) = (id, name) else {
                return Err(ServiceError::InvalidResponse(
                    "tool call without id or function name".to_string(),
                ));
            };
            tool_calls.push(ToolCall {
                id: id.to_string(),
                name: name.to_string(),
                arguments: call["function"]["arguments"]
                    .as_str()
                    .unwrap_or("{}")
                    .to_string(),
            });
        }
    }

    Ok(Completion {
        content,
        tool_calls,
    })
}

#[async_trait]
impl ReasoningService for OpenAiClient {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, ServiceError> {
        let body = self.request_body(&request);
        debug!(
            model = %self.model,
            messages = request.messages.len(),
            functions = request.functions.len(),
            tool_choice = request.tool_choice.as_str(),
            "Sending completion request"
        );

        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ServiceError::Timeout
                } else {
                    ServiceError::Transport(e.to_string())
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let err = classify_failure(status, &text);
            warn!(status = status.as_u16(), error = %err, "Completion request failed");
            return Err(err);
        }

        let value: Value = resp.json().await.map_err(|e| {
            if e.is_timeout() {
                ServiceError::Timeout
            } else {
                ServiceError::InvalidResponse(e.to_string())
            }
        })?;

        parse_completion(&value)
    }
}
