//! Tool dispatch - maps a requested tool call onto a registered capability.
//!
//! The registry is built once before a run and never changes during it.
//! Resolution decodes and validates the raw arguments and fills in declared
//! defaults; it never performs I/O.

use std::collections::HashMap;
use std::sync::Arc;

use docsmith_providers::Tool;
use serde_json::Value;
use tracing::{debug, warn};

use crate::capability::{Capability, ToolArguments};
use crate::error::{CapabilityError, OrchestrationError};

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("a tool named {0} is already registered")]
    DuplicateName(String),
}

/// Name → capability table, in registration order
#[derive(Clone, Default)]
pub struct ToolRegistry {
    capabilities: Vec<Arc<dyn Capability>>,
    by_name: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, capability: Arc<dyn Capability>) -> Result<(), RegistryError> {
        let name = capability.name().to_string();
        if self.by_name.contains_key(&name) {
            return Err(RegistryError::DuplicateName(name));
        }

        debug!("Registered tool: {}", name);
        self.by_name.insert(name, self.capabilities.len());
        self.capabilities.push(capability);
        Ok(())
    }

    /// Builder form of [`register`](Self::register)
    pub fn with(mut self, capability: Arc<dyn Capability>) -> Result<Self, RegistryError> {
        self.register(capability)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Capability>> {
        self.by_name.get(name).map(|&i| &self.capabilities[i])
    }

    pub fn names(&self) -> Vec<&str> {
        self.capabilities.iter().map(|c| c.name()).collect()
    }

    /// Tool descriptions for every registered capability
    pub fn catalogue(&self) -> Vec<Tool> {
        self.capabilities.iter().map(|c| c.to_tool()).collect()
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

/// A validated call, ready to execute
#[derive(Clone)]
pub struct ResolvedCall {
    pub capability: Arc<dyn Capability>,
    pub arguments: ToolArguments,
}

impl ResolvedCall {
    pub fn tool_name(&self) -> &str {
        self.capability.name()
    }

    pub async fn execute(&self) -> Result<String, CapabilityError> {
        self.capability.execute(self.arguments.clone()).await
    }
}

impl std::fmt::Debug for ResolvedCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedCall")
            .field("tool", &self.tool_name())
            .field("arguments", &self.arguments)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: ToolRegistry,
}

impl Dispatcher {
    pub fn new(registry: ToolRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn catalogue(&self) -> Vec<Tool> {
        self.registry.catalogue()
    }

    /// Resolve a tool call: look up the tool, decode its arguments, check
    /// required keys and apply defaults, in that order.
    pub fn resolve(
        &self,
        tool_name: &str,
        raw_arguments: &str,
    ) -> Result<ResolvedCall, OrchestrationError> {
        let capability = self.registry.get(tool_name).ok_or_else(|| {
            warn!("Unknown tool: {}", tool_name);
            OrchestrationError::UnknownTool {
                tool: tool_name.to_string(),
            }
        })?;

        let mut arguments = decode_arguments(tool_name, raw_arguments)?;

        for &key in capability.required_arguments() {
            if matches!(arguments.get(key), None | Some(Value::Null)) {
                return Err(OrchestrationError::MissingArgument {
                    tool: tool_name.to_string(),
                    argument: key.to_string(),
                });
            }
        }

        for (key, value) in capability.defaults() {
            let entry = arguments.entry(key).or_insert(Value::Null);
            if entry.is_null() {
                debug!("Defaulting {}.{} to {}", tool_name, key, value);
                *entry = value;
            }
        }

        Ok(ResolvedCall {
            capability: Arc::clone(capability),
            arguments,
        })
    }
}

/// Parse raw tool-call arguments; an empty payload means no arguments
pub fn decode_arguments(
    tool_name: &str,
    raw_arguments: &str,
) -> Result<ToolArguments, OrchestrationError> {
    if raw_arguments.trim().is_empty() {
        return Ok(ToolArguments::new());
    }

    let decode_failure = |reason: String| OrchestrationError::ArgumentDecodeFailure {
        tool: tool_name.to_string(),
        reason,
    };

    match serde_json::from_str::<Value>(raw_arguments) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(decode_failure(format!(
            "expected a JSON object, got {}",
            json_type_name(&other)
        ))),
        Err(e) => Err(decode_failure(e.to_string())),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use async_trait::async_trait;
    use serde_json::json;

    struct Fetch;

    #[async_trait]
    impl Capability for Fetch {
        fn name(&self) -> &str {
            "fetch"
        }

        fn description(&self) -> &str {
            "Fetches a URL"
        }

        fn schema(&self) -> Value {
            json!({"type": "object", "properties": {"url": {"type": "string"}, "method": {"type": "string"}}})
        }

        fn required_arguments(&self) -> &[&'static str] {
            &["url", "token"]
        }

        fn defaults(&self) -> Vec<(&'static str, Value)> {
            vec![("method", json!("GET"))]
        }

        async fn execute(&self, args: ToolArguments) -> Result<String, CapabilityError> {
            Ok(format!("{} {}", args["method"], args["url"]))
        }
    }

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(ToolRegistry::new().with(Arc::new(Fetch)).unwrap())
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Fetch)).unwrap();
        let err = registry.register(Arc::new(Fetch)).unwrap_err();

        assert!(matches!(err, RegistryError::DuplicateName(ref name) if name == "fetch"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_catalogue_lists_registered_tools() {
        let catalogue = dispatcher().catalogue();
        assert_eq!(catalogue.len(), 1);
        assert_eq!(catalogue[0].name, "fetch");
        assert_eq!(catalogue[0].description, "Fetches a URL");
    }

    #[test]
    fn test_unknown_tool() {
        let err = dispatcher().resolve("teleport", "{}").unwrap_err();
        assert_eq!(err.kind(), FailureKind::UnknownTool);
    }

    #[test]
    fn test_unknown_tool_checked_before_arguments() {
        let err = dispatcher().resolve("teleport", "not json").unwrap_err();
        assert_eq!(err.kind(), FailureKind::UnknownTool);
    }

    #[test]
    fn test_malformed_arguments() {
        let err = dispatcher().resolve("fetch", "{\"url\": ").unwrap_err();
        assert_eq!(err.kind(), FailureKind::ArgumentDecode);

        let err = dispatcher().resolve("fetch", "[1, 2]").unwrap_err();
        match err {
            OrchestrationError::ArgumentDecodeFailure { tool, reason } => {
                assert_eq!(tool, "fetch");
                assert!(reason.contains("an array"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_first_missing_key_reported() {
        let err = dispatcher().resolve("fetch", "").unwrap_err();
        match err {
            OrchestrationError::MissingArgument { tool, argument } => {
                assert_eq!(tool, "fetch");
                assert_eq!(argument, "url");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_null_counts_as_missing() {
        let err = dispatcher()
            .resolve("fetch", r#"{"url": "https://x.test", "token": null}"#)
            .unwrap_err();
        assert!(
            matches!(err, OrchestrationError::MissingArgument { ref argument, .. } if argument == "token")
        );
    }

    #[test]
    fn test_defaults_applied_and_explicit_values_kept() {
        let d = dispatcher();
        let resolved = d
            .resolve("fetch", r#"{"url": "https://x.test", "token": "t"}"#)
            .unwrap();
        assert_eq!(resolved.arguments["method"], "GET");

        let resolved = d
            .resolve("fetch", r#"{"url": "https://x.test", "token": "t", "method": "POST"}"#)
            .unwrap();
        assert_eq!(resolved.arguments["method"], "POST");
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let d = dispatcher();
        let raw = r#"{"url": "https://x.test", "token": "t"}"#;
        let first = d.resolve("fetch", raw).unwrap();
        let second = d.resolve("fetch", raw).unwrap();
        assert_eq!(first.arguments, second.arguments);
    }

    #[tokio::test]
    async fn test_resolved_call_executes_with_validated_arguments() {
        let resolved = dispatcher()
            .resolve("fetch", r#"{"url": "https://x.test", "token": "t"}"#)
            .unwrap();
        assert_eq!(resolved.tool_name(), "fetch");
        assert_eq!(resolved.execute().await.unwrap(), r#""GET" "https://x.test""#);
    }
}
