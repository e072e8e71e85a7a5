//! The contract every tool implements.

use async_trait::async_trait;
use docsmith_providers::Tool;
use serde_json::Value;

use crate::error::CapabilityError;

/// Decoded, validated arguments of a tool call
pub type ToolArguments = serde_json::Map<String, Value>;

/// A pluggable tool the model can call
///
/// The dispatcher only talks to tools through this trait. Required keys are
/// checked and `defaults` applied before `execute` runs, so implementations
/// can rely on both.
#[async_trait]
pub trait Capability: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema describing the arguments object
    fn schema(&self) -> Value;

    /// Keys that must be present and non-null, in the order they are checked
    fn required_arguments(&self) -> &[&'static str];

    /// Values substituted for absent optional arguments
    fn defaults(&self) -> Vec<(&'static str, Value)> {
        Vec::new()
    }

    async fn execute(&self, args: ToolArguments) -> Result<String, CapabilityError>;

    /// Catalogue entry sent to the completion endpoint
    fn to_tool(&self) -> Tool {
        Tool {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.schema(),
        }
    }
}

/// Fetch a string argument, failing if it is absent or not a string
pub fn string_arg<'a>(args: &'a ToolArguments, key: &str) -> Result<&'a str, CapabilityError> {
    match args.get(key) {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(CapabilityError::invalid_argument(
            key,
            format!("expected a string, got {}", other),
        )),
        None => Err(CapabilityError::invalid_argument(key, "argument is missing")),
    }
}

/// Fetch an optional string argument; null counts as absent
pub fn optional_string_arg<'a>(
    args: &'a ToolArguments,
    key: &str,
) -> Result<Option<&'a str>, CapabilityError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(_) => string_arg(args, key).map(Some),
    }
}
