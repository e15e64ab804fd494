//! OpenAI-compatible chat completions client.
//!
//! Works with OpenRouter (the default), OpenAI, and any endpoint exposing
//! `/chat/completions` with function calling. One non-streaming request per
//! assistant turn.

use std::time::Duration;

use async_trait::async_trait;
use dbgagent_config::AppConfig;
use dbgagent_core::error::ProviderError;
use dbgagent_core::message::{Message, ToolCallRequest};
use dbgagent_core::provider::{AssistantReply, LlmClient, ToolDeclaration, Usage};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// An LLM client speaking the OpenAI chat completions protocol.
pub struct OpenAiCompatClient {
    name: String,
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAiCompatClient {
    /// Create a client for `base_url` that requests `model` on every call.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            client,
        })
    }

    /// Create an OpenRouter client (convenience constructor).
    pub fn openrouter(
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        Self::new("openrouter", "https://openrouter.ai/api/v1", api_key, model)
    }

    /// Build from the loaded configuration. Fails when no API key is set.
    pub fn from_config(config: &AppConfig) -> Result<Self, ProviderError> {
        let api_key = config
            .require_api_key()
            .map_err(|e| ProviderError::NotConfigured(e.to_string()))?;
        let name = if config.base_url.contains("openrouter.ai") {
            "openrouter"
        } else {
            "openai-compatible"
        };
        Self::new(name, config.base_url.clone(), api_key, config.model.clone())
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Convert conversation messages to the OpenAI wire format.
    fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage> {
        messages
            .iter()
            .map(|m| match m {
                Message::System { text, .. } => ApiMessage::plain("system", text),
                Message::User { text, .. } => ApiMessage::plain("user", text),
                Message::Assistant {
                    text,
                    tool_call_requests,
                    ..
                } => ApiMessage {
                    role: "assistant".into(),
                    content: if text.is_empty() && !tool_call_requests.is_empty() {
                        None
                    } else {
                        Some(text.clone())
                    },
                    tool_calls: if tool_call_requests.is_empty() {
                        None
                    } else {
                        Some(
                            tool_call_requests
                                .iter()
                                .map(|tc| ApiToolCall {
                                    id: tc.id().to_string(),
                                    r#type: "function".into(),
                                    function: ApiFunction {
                                        name: tc.name().to_string(),
                                        arguments: tc.arguments_json().to_string(),
                                    },
                                })
                                .collect(),
                        )
                    },
                    tool_call_id: None,
                },
                Message::ToolResult {
                    request, result, ..
                } => ApiMessage {
                    role: "tool".into(),
                    content: Some(result.clone()),
                    tool_calls: None,
                    tool_call_id: Some(request.id().to_string()),
                },
            })
            .collect()
    }

    /// Convert tool declarations to the OpenAI wire format.
    fn to_api_tools(tools: &[ToolDeclaration]) -> Vec<ApiToolDefinition> {
        tools
            .iter()
            .map(|t| ApiToolDefinition {
                r#type: "function".into(),
                function: ApiToolFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.parameters.clone(),
                },
            })
            .collect()
    }

    fn request_body(&self, messages: &[Message], tools: &[ToolDeclaration]) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": Self::to_api_messages(messages),
            "stream": false,
        });
        if !tools.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(tools));
        }
        body
    }
}

/// Map a non-success HTTP status to a provider error.
fn status_error(status: u16, body: String) -> ProviderError {
    if status == 401 || status == 403 {
        return ProviderError::AuthenticationFailed(
            "Invalid API key or insufficient permissions".into(),
        );
    }
    ProviderError::ApiError {
        status_code: status,
        message: body,
    }
}

/// Decode a chat completions body into one assistant reply.
fn parse_reply(body: &str) -> Result<AssistantReply, ProviderError> {
    let api_response: ApiResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::MalformedResponse(format!("Failed to parse response: {e}")))?;

    let choice = api_response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::MalformedResponse("No choices in response".into()))?;

    let tool_call_requests = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|tc| ToolCallRequest::new(tc.id, tc.function.name, tc.function.arguments))
        .collect();

    Ok(AssistantReply {
        text: choice.message.content.unwrap_or_default(),
        tool_call_requests,
        model: api_response.model.unwrap_or_default(),
        usage: api_response.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        }),
    })
}

fn transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(e.to_string())
    } else {
        ProviderError::Network(e.to_string())
    }
}

#[async_trait]
impl LlmClient for OpenAiCompatClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn call_model(
        &self,
        conversation: &[Message],
        tools: &[ToolDeclaration],
    ) -> std::result::Result<AssistantReply, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.request_body(conversation, tools);

        debug!(
            client = %self.name,
            model = %self.model,
            messages = conversation.len(),
            tools = tools.len(),
            "Sending completion request"
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let text = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            warn!(status = status.as_u16(), body = %text, "LLM endpoint returned error");
            return Err(status_error(status.as_u16(), text));
        }

        let reply = parse_reply(&text)?;
        debug!(
            tool_calls = reply.tool_call_requests.len(),
            text_len = reply.text.len(),
            "Received assistant reply"
        );
        Ok(reply)
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl ApiMessage {
    fn plain(role: &str, text: &str) -> Self {
        Self {
            role: role.into(),
            content: Some(text.to_string()),
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    id: String,
    #[serde(default = "function_type")]
    r#type: String,
    function: ApiFunction,
}

fn function_type() -> String {
    "function".into()
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Serialize)]
struct ApiToolDefinition {
    r#type: String,
    function: ApiToolFunction,
}

#[derive(Debug, Serialize)]
struct ApiToolFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}
