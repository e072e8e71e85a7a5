//! The tool-calling loop.
//!
//! Each iteration truncates the conversation to the token budget, asks the
//! completion endpoint for the next step, and either returns its final text
//! or executes the requested tool calls one at a time, in the order they were
//! requested, appending one tool-result message per call.

use std::sync::Arc;

use docsmith_config::Config;
use docsmith_providers::{
    CompletionRequest, CompletionResponse, LLMProvider, Message, ResponseFormat, ToolCall, Usage,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::api_config::ApiConfig;
use crate::buffer::{
    token_budget, ConversationBuffer, HeuristicEstimator, TokenEstimator, DEFAULT_CONTEXT_LIMIT,
    DEFAULT_RESPONSE_RESERVE,
};
use crate::dispatch::{Dispatcher, ToolRegistry};
use crate::error::OrchestrationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    Ready,
    AwaitingCompletion,
    DispatchingTools,
    Finished,
    Exhausted,
    Failed,
}

/// What to do when a single tool call fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolFailurePolicy {
    /// End the run with the failure
    #[default]
    Abort,
    /// Send the failure text back as the tool result and keep going
    ReportToModel,
}

#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    pub context_limit: u32,
    pub response_reserve: u32,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub failure_policy: ToolFailurePolicy,
    pub response_format: Option<ResponseFormat>,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            context_limit: DEFAULT_CONTEXT_LIMIT,
            response_reserve: DEFAULT_RESPONSE_RESERVE,
            temperature: 0.0,
            max_tokens: None,
            failure_policy: ToolFailurePolicy::Abort,
            response_format: Some(ApiConfig::response_format()),
        }
    }
}

impl OrchestratorOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            context_limit: config.agent.context_limit,
            response_reserve: config.agent.response_reserve_tokens,
            temperature: config.provider.temperature,
            max_tokens: config.provider.max_tokens,
            failure_policy: if config.agent.soft_tool_failures {
                ToolFailurePolicy::ReportToModel
            } else {
                ToolFailurePolicy::Abort
            },
            response_format: Some(ApiConfig::response_format()),
        }
    }

    pub fn token_budget(&self) -> u32 {
        token_budget(self.context_limit, self.response_reserve)
    }
}

pub struct Orchestrator {
    provider: Arc<dyn LLMProvider>,
    dispatcher: Dispatcher,
    estimator: Box<dyn TokenEstimator>,
    options: OrchestratorOptions,
    state: OrchestratorState,
    iterations: u32,
    usage: Usage,
}

impl Orchestrator {
    pub fn new(provider: Arc<dyn LLMProvider>, registry: ToolRegistry) -> Self {
        Self {
            provider,
            dispatcher: Dispatcher::new(registry),
            estimator: Box::new(HeuristicEstimator),
            options: OrchestratorOptions::default(),
            state: OrchestratorState::Ready,
            iterations: 0,
            usage: Usage::default(),
        }
    }

    pub fn with_options(mut self, options: OrchestratorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_estimator(mut self, estimator: impl TokenEstimator + 'static) -> Self {
        self.estimator = Box::new(estimator);
        self
    }

    pub fn state(&self) -> OrchestratorState {
        self.state
    }

    /// Completed dispatch cycles in the last run
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Token usage reported by the endpoint, summed over the last run
    pub fn usage(&self) -> &Usage {
        &self.usage
    }

    pub fn options(&self) -> &OrchestratorOptions {
        &self.options
    }

    pub async fn run(
        &mut self,
        system_prompt: &str,
        user_prompt: &str,
        max_iterations: u32,
    ) -> Result<String, OrchestrationError> {
        self.run_with_cancellation(
            system_prompt,
            user_prompt,
            max_iterations,
            CancellationToken::new(),
        )
        .await
    }

    pub async fn run_with_cancellation(
        &mut self,
        system_prompt: &str,
        user_prompt: &str,
        max_iterations: u32,
        cancellation_token: CancellationToken,
    ) -> Result<String, OrchestrationError> {
        let mut buffer = ConversationBuffer::new(system_prompt, user_prompt);
        self.iterations = 0;
        self.usage = Usage::default();
        self.transition(OrchestratorState::Ready);

        info!(
            "Starting run with {} tools, max {} iterations",
            self.dispatcher.registry().len(),
            max_iterations
        );

        let result = self
            .drive(&mut buffer, max_iterations, &cancellation_token)
            .await;

        match &result {
            Ok(_) => self.transition(OrchestratorState::Finished),
            Err(OrchestrationError::IterationsExhausted { .. }) => {
                warn!("Iteration cap of {} reached without a final answer", max_iterations);
                self.transition(OrchestratorState::Exhausted)
            }
            Err(e) => {
                error!("Run failed: {}", e);
                self.transition(OrchestratorState::Failed)
            }
        }

        result
    }

    /// Run and parse the final answer as an [`ApiConfig`]
    pub async fn run_for_config(
        &mut self,
        system_prompt: &str,
        user_prompt: &str,
        max_iterations: u32,
        cancellation_token: CancellationToken,
    ) -> Result<ApiConfig, OrchestrationError> {
        let text = self
            .run_with_cancellation(system_prompt, user_prompt, max_iterations, cancellation_token)
            .await?;

        ApiConfig::from_final_answer(&text).map_err(|e| {
            self.transition(OrchestratorState::Failed);
            OrchestrationError::InvalidFinalAnswer {
                reason: e.to_string(),
            }
        })
    }

    async fn drive(
        &mut self,
        buffer: &mut ConversationBuffer,
        max_iterations: u32,
        cancellation_token: &CancellationToken,
    ) -> Result<String, OrchestrationError> {
        let budget = self.options.token_budget();
        let catalogue = self.dispatcher.catalogue();

        while self.iterations < max_iterations {
            self.transition(OrchestratorState::AwaitingCompletion);
            buffer.truncate_in_place(budget, self.estimator.as_ref());

            let request = CompletionRequest {
                messages: buffer.messages().to_vec(),
                max_tokens: self.options.max_tokens,
                temperature: Some(self.options.temperature),
                tools: if catalogue.is_empty() {
                    None
                } else {
                    Some(catalogue.clone())
                },
                response_format: self.options.response_format.clone(),
            };

            debug!(
                "Iteration {}/{}: sending {} messages",
                self.iterations + 1,
                max_iterations,
                request.messages.len()
            );

            let response = self.request_completion(request, cancellation_token).await?;
            self.record_usage(&response.usage);

            if !response.has_tool_calls() {
                info!("No tool calls requested, returning final answer");
                return Ok(response.content);
            }

            self.transition(OrchestratorState::DispatchingTools);
            buffer.append(Message::assistant_with_tool_calls(
                &response.content,
                response.tool_calls.clone(),
            ));

            for call in &response.tool_calls {
                let content = self.dispatch(call, cancellation_token).await?;
                buffer.append(Message::tool_result(&call.id, content));
            }

            self.iterations += 1;
        }

        Err(OrchestrationError::IterationsExhausted { max_iterations })
    }

    async fn request_completion(
        &self,
        request: CompletionRequest,
        cancellation_token: &CancellationToken,
    ) -> Result<CompletionResponse, OrchestrationError> {
        tokio::select! {
            biased;
            _ = cancellation_token.cancelled() => Err(OrchestrationError::Cancelled),
            result = self.provider.complete(request) => {
                result.map_err(|e| OrchestrationError::CompletionEndpointFailure(format!("{:#}", e)))
            }
        }
    }

    /// Resolve and execute one tool call, applying the failure policy
    async fn dispatch(
        &self,
        call: &ToolCall,
        cancellation_token: &CancellationToken,
    ) -> Result<String, OrchestrationError> {
        match self.execute_call(call, cancellation_token).await {
            Ok(output) => Ok(output),
            Err(e)
                if e.is_tool_failure()
                    && self.options.failure_policy == ToolFailurePolicy::ReportToModel =>
            {
                warn!("Reporting tool failure to the model: {}", e);
                Ok(format!("Error: {}", e))
            }
            Err(e) => Err(e),
        }
    }

    async fn execute_call(
        &self,
        call: &ToolCall,
        cancellation_token: &CancellationToken,
    ) -> Result<String, OrchestrationError> {
        let resolved = self.dispatcher.resolve(&call.tool, &call.arguments)?;
        info!("Running {} ({})", call.tool, call.id);

        let output = tokio::select! {
            biased;
            _ = cancellation_token.cancelled() => return Err(OrchestrationError::Cancelled),
            result = resolved.execute() => result,
        };

        match output {
            Ok(content) => {
                debug!("{} returned {} chars", call.tool, content.len());
                Ok(content)
            }
            Err(source) => Err(OrchestrationError::CapabilityExecutionFailure {
                tool: call.tool.clone(),
                source,
            }),
        }
    }

    fn record_usage(&mut self, usage: &Usage) {
        self.usage.prompt_tokens += usage.prompt_tokens;
        self.usage.completion_tokens += usage.completion_tokens;
        self.usage.total_tokens += usage.total_tokens;
    }

    fn transition(&mut self, next: OrchestratorState) {
        if self.state != next {
            debug!("Orchestrator state: {:?} -> {:?}", self.state, next);
        }
        self.state = next;
    }
}
