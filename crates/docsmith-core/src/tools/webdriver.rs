//! Browser tools backed by a shared WebDriver session.

use std::sync::Arc;

use async_trait::async_trait;
use docsmith_browser::WebDriverController;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::debug;

use crate::capability::{string_arg, Capability, ToolArguments};
use crate::error::CapabilityError;

/// Handle to the one live browser session, shared by every browser tool
pub type BrowserSession = Arc<Mutex<Box<dyn WebDriverController>>>;

pub fn browser_session(controller: impl WebDriverController + 'static) -> BrowserSession {
    let controller: Box<dyn WebDriverController> = Box::new(controller);
    Arc::new(Mutex::new(controller))
}

/// Extracts content from the current page
pub struct PageExtractor {
    session: BrowserSession,
}

impl PageExtractor {
    pub fn new(session: BrowserSession) -> Self {
        Self { session }
    }
}

#[async_trait]
impl Capability for PageExtractor {
    fn name(&self) -> &str {
        "extract_page_content"
    }

    fn description(&self) -> &str {
        "Extracts content from the current page"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "selector": {
                    "type": "string",
                    "description": "CSS selector to extract content from (defaults to body)"
                },
                "format": {
                    "type": "string",
                    "enum": ["text", "html"],
                    "description": "Return the visible text (default) or the element's HTML"
                }
            }
        })
    }

    fn required_arguments(&self) -> &[&'static str] {
        &[]
    }

    fn defaults(&self) -> Vec<(&'static str, Value)> {
        vec![("selector", json!("body")), ("format", json!("text"))]
    }

    async fn execute(&self, args: ToolArguments) -> Result<String, CapabilityError> {
        let selector = string_arg(&args, "selector")?;
        let format = string_arg(&args, "format")?;
        debug!("Extracting {} from {}", format, selector);

        let mut driver = self.session.lock().await;
        let content = match format {
            "text" => driver.element_text(selector).await,
            "html" => driver.element_html(selector).await,
            other => {
                return Err(CapabilityError::invalid_argument(
                    "format",
                    format!("expected \"text\" or \"html\", got \"{}\"", other),
                ))
            }
        };

        content.map_err(|e| CapabilityError::browser(format!("{:#}", e)))
    }
}

/// Navigates to a URL
pub struct Navigator {
    session: BrowserSession,
}

impl Navigator {
    pub fn new(session: BrowserSession) -> Self {
        Self { session }
    }
}

#[async_trait]
impl Capability for Navigator {
    fn name(&self) -> &str {
        "browser_navigate"
    }

    fn description(&self) -> &str {
        "Navigates to a URL"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": {"type": "string", "description": "The URL to navigate to"}
            },
            "required": ["url"]
        })
    }

    fn required_arguments(&self) -> &[&'static str] {
        &["url"]
    }

    async fn execute(&self, args: ToolArguments) -> Result<String, CapabilityError> {
        let url = string_arg(&args, "url")?;

        let mut driver = self.session.lock().await;
        driver
            .navigate(url)
            .await
            .map_err(|e| CapabilityError::browser(format!("{:#}", e)))?;

        Ok(format!("Navigated to {}", url))
    }
}

/// Clicks an element on the current page
pub struct Clicker {
    session: BrowserSession,
}

impl Clicker {
    pub fn new(session: BrowserSession) -> Self {
        Self { session }
    }
}

#[async_trait]
impl Capability for Clicker {
    fn name(&self) -> &str {
        "browser_click"
    }

    fn description(&self) -> &str {
        "Clicks an element on the current page"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "selector": {"type": "string", "description": "The selector of the element to click"}
            },
            "required": ["selector"]
        })
    }

    fn required_arguments(&self) -> &[&'static str] {
        &["selector"]
    }

    async fn execute(&self, args: ToolArguments) -> Result<String, CapabilityError> {
        let selector = string_arg(&args, "selector")?;

        let mut driver = self.session.lock().await;
        driver
            .click(selector)
            .await
            .map_err(|e| CapabilityError::browser(format!("{:#}", e)))?;

        Ok(format!("clicked {}", selector))
    }
}

/// Executes JavaScript in the browser
pub struct ScriptExecutor {
    session: BrowserSession,
}

impl ScriptExecutor {
    pub fn new(session: BrowserSession) -> Self {
        Self { session }
    }
}

#[async_trait]
impl Capability for ScriptExecutor {
    fn name(&self) -> &str {
        "browser_execute_js"
    }

    fn description(&self) -> &str {
        "Executes JavaScript in the browser. Use a return statement to get a value back."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "script": {"type": "string", "description": "The JavaScript code to execute"}
            },
            "required": ["script"]
        })
    }

    fn required_arguments(&self) -> &[&'static str] {
        &["script"]
    }

    async fn execute(&self, args: ToolArguments) -> Result<String, CapabilityError> {
        let script = string_arg(&args, "script")?;
        debug!("Executing script ({} chars)", script.len());

        let mut driver = self.session.lock().await;
        let result = driver
            .execute_script(script, Vec::new())
            .await
            .map_err(|e| CapabilityError::browser(format!("{:#}", e)))?;

        Ok(match result {
            Value::String(s) => s,
            other => other.to_string(),
        })
    }
}

