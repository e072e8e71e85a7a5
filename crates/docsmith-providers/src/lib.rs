pub mod mock;
pub mod openai;

pub use mock::{MockProvider, MockResponse};
pub use openai::OpenAIProvider;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Trait for completion endpoints
#[async_trait::async_trait]
pub trait LLMProvider: Send + Sync {
    /// Generate a completion for the given messages.
    ///
    /// The response carries either final text or one or more tool calls.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Get the provider name
    fn name(&self) -> &str;

    /// Get the model name
    fn model(&self) -> &str;

    /// Get the configured max_tokens for this provider
    fn max_tokens(&self) -> u32;

    /// Get the configured temperature for this provider
    fn temperature(&self) -> f32;

    /// Get the context window size for this provider
    /// Returns None if the provider doesn't have a fixed context window
    fn context_window_size(&self) -> Option<u32> {
        None
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub messages: Vec<Message>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub tools: Option<Vec<Tool>>,
    /// Strict output schema the final answer must follow
    pub response_format: Option<ResponseFormat>,
}

/// A named JSON schema the endpoint must use for its final text answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseFormat {
    pub name: String,
    pub description: String,
    pub schema: serde_json::Value,
    pub strict: bool,
}

impl ResponseFormat {
    pub fn strict_json_schema(name: &str, description: &str, schema: serde_json::Value) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            schema,
            strict: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    /// Set on tool-result messages; references a preceding assistant tool call
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tool_call_id: Option<String>,
    /// Set on assistant messages that requested tool invocations
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::Tool => "tool",
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub content: String,
    /// Tool invocations requested by the model, in the order it returned them
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
    pub usage: Usage,
    pub model: String,
}

impl CompletionResponse {
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A tool invocation requested by the completion endpoint.
///
/// `arguments` is kept as the raw serialized text the endpoint produced;
/// decoding happens at dispatch time so malformed payloads surface there.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub tool: String,
    pub arguments: String,
}

impl ToolCall {
    pub fn new(id: &str, tool: &str, arguments: &str) -> Self {
        Self {
            id: id.to_string(),
            tool: tool.to_string(),
            arguments: arguments.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tool {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

impl Message {
    pub fn new(role: MessageRole, content: String) -> Self {
        Self {
            role,
            content,
            tool_call_id: None,
            tool_calls: Vec::new(),
        }
    }

    pub fn system(content: &str) -> Self {
        Self::new(MessageRole::System, content.to_string())
    }

    pub fn user(content: &str) -> Self {
        Self::new(MessageRole::User, content.to_string())
    }

    pub fn assistant(content: &str) -> Self {
        Self::new(MessageRole::Assistant, content.to_string())
    }

    /// Assistant message echoing the tool calls the endpoint requested
    pub fn assistant_with_tool_calls(content: &str, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.to_string(),
            tool_call_id: None,
            tool_calls,
        }
    }

    /// Tool-result message answering the call with the given id
    pub fn tool_result(tool_call_id: &str, content: String) -> Self {
        Self {
            role: MessageRole::Tool,
            content,
            tool_call_id: Some(tool_call_id.to_string()),
            tool_calls: Vec::new(),
        }
    }
}
