//! Mock completion endpoint for testing
//!
//! Returns a scripted queue of responses and records every request so tests
//! can assert on what the orchestrator sent.
//!
//! # Example
//!
//! ```rust,ignore
//! use docsmith_providers::mock::{MockProvider, MockResponse};
//!
//! let provider = MockProvider::new()
//!     .with_response(MockResponse::tool_call("browser_navigate", json!({"url": "https://x.test"})))
//!     .with_response(MockResponse::text("{\"integration\": \"x\"}"));
//! ```

use crate::{CompletionRequest, CompletionResponse, LLMProvider, ToolCall, Usage};
use anyhow::Result;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Global counter for generating unique tool call IDs
static TOOL_CALL_COUNTER: AtomicU64 = AtomicU64::new(1);

/// A scripted response
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
    pub usage: Usage,
    /// When set, `complete` fails with this message instead of answering
    pub error: Option<String>,
}

impl MockResponse {
    /// Create a final text response
    pub fn text(content: &str) -> Self {
        Self {
            content: content.to_string(),
            tool_calls: Vec::new(),
            usage: Usage {
                prompt_tokens: 100,
                completion_tokens: content.len() as u32 / 4,
                total_tokens: 100 + content.len() as u32 / 4,
            },
            error: None,
        }
    }

    /// Create a response requesting a single tool call with a generated id
    pub fn tool_call(tool: &str, args: serde_json::Value) -> Self {
        let id = format!("tool_{}", TOOL_CALL_COUNTER.fetch_add(1, Ordering::SeqCst));
        Self::tool_calls(vec![ToolCall {
            id,
            tool: tool.to_string(),
            arguments: args.to_string(),
        }])
    }

    /// Create a response requesting several tool calls, in the given order
    pub fn tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            content: String::new(),
            tool_calls,
            usage: Usage {
                prompt_tokens: 100,
                completion_tokens: 50,
                total_tokens: 150,
            },
            error: None,
        }
    }

    /// Create a response that makes the endpoint fail
    pub fn error(message: &str) -> Self {
        Self {
            content: String::new(),
            tool_calls: Vec::new(),
            usage: Usage::default(),
            error: Some(message.to_string()),
        }
    }
}

/// A mock completion endpoint
///
/// The provider maintains a queue of responses that are returned in order.
/// It also tracks all requests made for verification in tests.
pub struct MockProvider {
    name: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    /// Queue of responses to return (FIFO)
    responses: Arc<Mutex<Vec<MockResponse>>>,
    /// All requests received (for verification)
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
    /// Default response when queue is empty
    default_response: Option<MockResponse>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            name: "mock".to_string(),
            model: "mock-model".to_string(),
            max_tokens: 4096,
            temperature: 0.0,
            responses: Arc::new(Mutex::new(Vec::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            default_response: None,
        }
    }

    /// Add a response to the queue
    pub fn with_response(self, response: MockResponse) -> Self {
        self.responses.lock().unwrap().push(response);
        self
    }

    /// Add multiple responses to the queue
    pub fn with_responses(self, responses: Vec<MockResponse>) -> Self {
        self.responses.lock().unwrap().extend(responses);
        self
    }

    /// Set a default response when queue is empty
    pub fn with_default_response(mut self, response: MockResponse) -> Self {
        self.default_response = Some(response);
        self
    }

    /// Shared handle to the recorded requests, usable after the provider is boxed
    pub fn request_log(&self) -> Arc<Mutex<Vec<CompletionRequest>>> {
        Arc::clone(&self.requests)
    }

    /// Get the number of requests made
    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn next_response(&self) -> MockResponse {
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            self.default_response
                .clone()
                .unwrap_or_else(|| MockResponse::text("Mock response (no responses configured)"))
        } else {
            responses.remove(0)
        }
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl LLMProvider for MockProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        self.requests.lock().unwrap().push(request);

        let response = self.next_response();
        if let Some(message) = response.error {
            anyhow::bail!("{}", message);
        }

        Ok(CompletionResponse {
            content: response.content,
            tool_calls: response.tool_calls,
            usage: response.usage,
            model: self.model.clone(),
        })
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    fn temperature(&self) -> f32 {
        self.temperature
    }
}
