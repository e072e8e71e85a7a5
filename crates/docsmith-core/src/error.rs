//! Failure taxonomy for a docsmith run.
//!
//! Every way a run can end other than with a final answer is a variant of
//! [`OrchestrationError`]. Tool implementations report their own failures as
//! [`CapabilityError`], which the orchestrator wraps with the tool name.

use thiserror::Error;

/// Failure reported by a single tool capability
#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("browser error: {0}")]
    Browser(String),

    #[error("http error: {0}")]
    Http(String),

    #[error("invalid argument `{argument}`: {reason}")]
    InvalidArgument { argument: String, reason: String },

    #[error("{0}")]
    Other(String),
}

impl CapabilityError {
    pub fn browser(err: impl std::fmt::Display) -> Self {
        Self::Browser(err.to_string())
    }

    pub fn http(err: impl std::fmt::Display) -> Self {
        Self::Http(err.to_string())
    }

    pub fn invalid_argument(argument: &str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            argument: argument.to_string(),
            reason: reason.into(),
        }
    }
}

/// Tag identifying the kind of an [`OrchestrationError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    ArgumentDecode,
    MissingArgument,
    UnknownTool,
    CapabilityExecution,
    CompletionEndpoint,
    IterationsExhausted,
    Cancelled,
    InvalidFinalAnswer,
}

#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error("could not decode arguments for tool {tool}: {reason}")]
    ArgumentDecodeFailure { tool: String, reason: String },

    #[error("tool {tool} is missing required argument `{argument}`")]
    MissingArgument { tool: String, argument: String },

    #[error("unknown tool: {tool}")]
    UnknownTool { tool: String },

    #[error("tool {tool} failed: {source}")]
    CapabilityExecutionFailure {
        tool: String,
        source: CapabilityError,
    },

    #[error("completion endpoint failed: {0}")]
    CompletionEndpointFailure(String),

    #[error("reached the maximum of {max_iterations} iterations without a final answer")]
    IterationsExhausted { max_iterations: u32 },

    #[error("run cancelled")]
    Cancelled,

    #[error("final answer is not a valid API configuration: {reason}")]
    InvalidFinalAnswer { reason: String },
}

impl OrchestrationError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::ArgumentDecodeFailure { .. } => FailureKind::ArgumentDecode,
            Self::MissingArgument { .. } => FailureKind::MissingArgument,
            Self::UnknownTool { .. } => FailureKind::UnknownTool,
            Self::CapabilityExecutionFailure { .. } => FailureKind::CapabilityExecution,
            Self::CompletionEndpointFailure(_) => FailureKind::CompletionEndpoint,
            Self::IterationsExhausted { .. } => FailureKind::IterationsExhausted,
            Self::Cancelled => FailureKind::Cancelled,
            Self::InvalidFinalAnswer { .. } => FailureKind::InvalidFinalAnswer,
        }
    }

    /// Only an exhausted iteration cap can be fixed by running again with a larger cap
    pub fn is_retryable_with_larger_cap(&self) -> bool {
        matches!(self, Self::IterationsExhausted { .. })
    }

    /// Failures caused by a single tool call, as opposed to the run as a whole
    pub fn is_tool_failure(&self) -> bool {
        matches!(
            self,
            Self::ArgumentDecodeFailure { .. }
                | Self::MissingArgument { .. }
                | Self::UnknownTool { .. }
                | Self::CapabilityExecutionFailure { .. }
        )
    }

    /// Name of the tool involved, if the failure concerns one
    pub fn tool(&self) -> Option<&str> {
        match self {
            Self::ArgumentDecodeFailure { tool, .. }
            | Self::MissingArgument { tool, .. }
            | Self::UnknownTool { tool }
            | Self::CapabilityExecutionFailure { tool, .. } => Some(tool),
            _ => None,
        }
    }
}
