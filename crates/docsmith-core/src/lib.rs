//! docsmith core: the tool-calling loop that turns API documentation into an
//! [`ApiConfig`].
//!
//! - [`buffer`] - conversation buffer and token-budgeted truncation
//! - [`dispatch`] - tool registry and argument validation
//! - [`orchestrator`] - the completion / tool-dispatch state machine
//! - [`tools`] - browser and HTTP capabilities

pub mod api_config;
pub mod buffer;
pub mod capability;
pub mod dispatch;
pub mod error;
pub mod orchestrator;
pub mod prompts;
pub mod tools;

pub use api_config::ApiConfig;
pub use buffer::{ConversationBuffer, HeuristicEstimator, TokenEstimator};
pub use capability::{Capability, ToolArguments};
pub use dispatch::{Dispatcher, RegistryError, ResolvedCall, ToolRegistry};
pub use error::{CapabilityError, FailureKind, OrchestrationError};
pub use orchestrator::{Orchestrator, OrchestratorOptions, OrchestratorState, ToolFailurePolicy};
pub use tools::{browser_session, default_registry, BrowserSession};

// Re-export the completion types callers need to drive a run
pub use docsmith_providers::{LLMProvider, Message, MessageRole, ToolCall};
