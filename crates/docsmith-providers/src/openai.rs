use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashSet;
use std::time::Duration;
use tracing::debug;

use crate::{
    CompletionRequest, CompletionResponse, LLMProvider, Message, MessageRole, ResponseFormat,
    Tool, ToolCall, Usage,
};

#[derive(Debug, thiserror::Error)]
pub enum OpenAIError {
    #[error("OpenAI API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("OpenAI API returned no choices")]
    NoChoices,
}

#[derive(Clone)]
pub struct OpenAIProvider {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    name: String,
}

impl OpenAIProvider {
    pub fn new(
        api_key: String,
        model: Option<String>,
        base_url: Option<String>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<Self> {
        Self::new_with_name(
            "openai".to_string(),
            api_key,
            model,
            base_url,
            max_tokens,
            temperature,
        )
    }

    pub fn new_with_name(
        name: String,
        api_key: String,
        model: Option<String>,
        base_url: Option<String>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600))
            .build()?;

        Ok(Self {
            client,
            api_key,
            model: model.unwrap_or_else(|| "gpt-4o-mini".to_string()),
            base_url: base_url
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string())
                .trim_end_matches('/')
                .to_string(),
            max_tokens,
            temperature,
            name,
        })
    }

    fn create_request_body(&self, request: &CompletionRequest) -> serde_json::Value {
        let mut body = json!({
            "model": self.model,
            "messages": convert_messages(&request.messages),
        });

        if let Some(max_tokens) = request.max_tokens.or(self.max_tokens) {
            body["max_completion_tokens"] = json!(max_tokens);
        }

        if let Some(temperature) = request.temperature.or(self.temperature) {
            body["temperature"] = json!(temperature);
        }

        if let Some(tools) = &request.tools {
            if !tools.is_empty() {
                body["tools"] = json!(convert_tools(tools));
            }
        }

        if let Some(format) = &request.response_format {
            body["response_format"] = convert_response_format(format);
        }

        body
    }
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        debug!(
            "Processing OpenAI completion request with {} messages",
            request.messages.len()
        );

        let body = self.create_request_body(&request);

        debug!("Sending request to OpenAI API: model={}", self.model);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(OpenAIError::Api {
                status: status.as_u16(),
                body: error_text,
            }
            .into());
        }

        let openai_response: OpenAIResponse = response.json().await?;
        let completion = parse_response(openai_response, &self.model)?;

        debug!(
            "OpenAI completion successful: {} tokens generated, {} tool calls",
            completion.usage.completion_tokens,
            completion.tool_calls.len()
        );

        Ok(completion)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens.unwrap_or(16000)
    }

    fn temperature(&self) -> f32 {
        self.temperature.unwrap_or(0.0)
    }

    fn context_window_size(&self) -> Option<u32> {
        Some(128_000)
    }
}

/// Tool results whose call id no earlier assistant message issued are dropped;
/// the endpoint rejects them and truncation can leave them behind.
fn convert_messages(messages: &[Message]) -> Vec<serde_json::Value> {
    let mut issued_ids: HashSet<&str> = HashSet::new();
    let mut converted = Vec::with_capacity(messages.len());

    for msg in messages {
        match msg.role {
            MessageRole::Tool => {
                let call_id = msg.tool_call_id.as_deref().unwrap_or_default();
                if !issued_ids.contains(call_id) {
                    debug!("Skipping tool result for unknown call id {:?}", call_id);
                    continue;
                }
                converted.push(json!({
                    "role": "tool",
                    "content": msg.content,
                    "tool_call_id": call_id,
                }));
            }
            MessageRole::Assistant if !msg.tool_calls.is_empty() => {
                let tool_calls: Vec<serde_json::Value> = msg
                    .tool_calls
                    .iter()
                    .map(|call| {
                        issued_ids.insert(call.id.as_str());
                        json!({
                            "id": call.id,
                            "type": "function",
                            "function": {
                                "name": call.tool,
                                "arguments": call.arguments,
                            }
                        })
                    })
                    .collect();
                let content = if msg.content.is_empty() {
                    serde_json::Value::Null
                } else {
                    json!(msg.content)
                };
                converted.push(json!({
                    "role": "assistant",
                    "content": content,
                    "tool_calls": tool_calls,
                }));
            }
            role => converted.push(json!({
                "role": role.as_str(),
                "content": msg.content,
            })),
        }
    }

    converted
}

fn convert_tools(tools: &[Tool]) -> Vec<serde_json::Value> {
    tools
        .iter()
        .map(|tool| {
            json!({
                "type": "function",
                "function": {
                    "name": tool.name,
                    "description": tool.description,
                    "parameters": tool.input_schema,
                }
            })
        })
        .collect()
}

fn convert_response_format(format: &ResponseFormat) -> serde_json::Value {
    json!({
        "type": "json_schema",
        "json_schema": {
            "name": format.name,
            "description": format.description,
            "schema": format.schema,
            "strict": format.strict,
        }
    })
}

fn parse_response(response: OpenAIResponse, model: &str) -> Result<CompletionResponse> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or(OpenAIError::NoChoices)?;

    let tool_calls = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|call| ToolCall {
            id: call.id,
            tool: call.function.name,
            arguments: call.function.arguments,
        })
        .collect();

    let usage = response
        .usage
        .map(|usage| Usage {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
        })
        .unwrap_or_default();

    Ok(CompletionResponse {
        content: choice.message.content.unwrap_or_default(),
        tool_calls,
        usage,
        model: model.to_string(),
    })
}

// OpenAI API response structures
#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<OpenAIToolCall>>,
}

#[derive(Debug, Deserialize)]
struct OpenAIToolCall {
    id: String,
    function: OpenAIFunction,
}

#[derive(Debug, Deserialize)]
struct OpenAIFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> OpenAIProvider {
        OpenAIProvider::new(
            "test-key".to_string(),
            Some("gpt-4o-mini".to_string()),
            None,
            None,
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_convert_tool_messages() {
        let messages = vec![
            Message::system("sys"),
            Message::assistant_with_tool_calls(
                "",
                vec![ToolCall::new("call_1", "browser_click", r#"{"selector":"a"}"#)],
            ),
            Message::tool_result("call_1", "clicked a".to_string()),
        ];

        let converted = convert_messages(&messages);

        assert_eq!(converted[0]["role"], "system");
        assert_eq!(converted[1]["role"], "assistant");
        assert!(converted[1]["content"].is_null());
        assert_eq!(converted[1]["tool_calls"][0]["id"], "call_1");
        assert_eq!(
            converted[1]["tool_calls"][0]["function"]["arguments"],
            r#"{"selector":"a"}"#
        );
        assert_eq!(converted[2]["role"], "tool");
        assert_eq!(converted[2]["tool_call_id"], "call_1");
    }

    #[test]
    fn test_tool_result_without_its_call_is_dropped() {
        // Truncation kept T(a) but dropped the assistant message that issued "a"
        let messages = vec![
            Message::system("sys"),
            Message::user("task"),
            Message::tool_result("a", "page a".to_string()),
            Message::assistant_with_tool_calls(
                "",
                vec![ToolCall::new("b", "extract_page_content", "{}")],
            ),
            Message::tool_result("b", "page b".to_string()),
        ];

        let converted = convert_messages(&messages);

        let roles: Vec<&str> = converted
            .iter()
            .map(|m| m["role"].as_str().unwrap())
            .collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "tool"]);
        assert_eq!(converted[3]["tool_call_id"], "b");
        assert_eq!(converted[3]["content"], "page b");
    }

    #[test]
    fn test_tool_result_before_its_call_is_dropped() {
        let messages = vec![
            Message::user("task"),
            Message::tool_result("x", "early".to_string()),
            Message::assistant_with_tool_calls("", vec![ToolCall::new("x", "browser_click", "{}")]),
        ];

        let converted = convert_messages(&messages);

        assert_eq!(converted.len(), 2);
        assert_eq!(converted[1]["role"], "assistant");
    }

    #[test]
    fn test_request_body_carries_schema_and_temperature() {
        let request = CompletionRequest {
            messages: vec![Message::user("hi")],
            max_tokens: None,
            temperature: Some(0.0),
            tools: Some(vec![Tool {
                name: "http_request".to_string(),
                description: "Makes an HTTP request".to_string(),
                input_schema: json!({"type": "object"}),
            }]),
            response_format: Some(ResponseFormat::strict_json_schema(
                "api_config",
                "The API configuration",
                json!({"type": "object"}),
            )),
        };

        let body = provider().create_request_body(&request);

        assert_eq!(body["temperature"], 0.0);
        assert_eq!(body["tools"][0]["function"]["name"], "http_request");
        assert_eq!(body["response_format"]["type"], "json_schema");
        assert_eq!(body["response_format"]["json_schema"]["strict"], true);
        assert!(body.get("max_completion_tokens").is_none());
    }

    #[test]
    fn test_parse_response_keeps_tool_call_order() {
        let raw = json!({
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [
                        {"id": "a", "type": "function", "function": {"name": "browser_navigate", "arguments": "{\"url\":\"https://x.test\"}"}},
                        {"id": "b", "type": "function", "function": {"name": "extract_page_content", "arguments": "{}"}}
                    ]
                }
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        });
        let response: OpenAIResponse = serde_json::from_value(raw).unwrap();

        let completion = parse_response(response, "gpt-4o-mini").unwrap();

        assert_eq!(completion.content, "");
        let ids: Vec<&str> = completion.tool_calls.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(completion.usage.total_tokens, 15);
    }

    #[test]
    fn test_parse_response_without_choices_fails() {
        let response: OpenAIResponse = serde_json::from_value(json!({"choices": []})).unwrap();
        let err = parse_response(response, "m").unwrap_err();
        assert!(err.to_string().contains("no choices"));
    }
}
