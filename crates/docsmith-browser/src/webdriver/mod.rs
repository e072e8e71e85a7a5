pub mod chrome;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

/// WebDriver controller for browser automation
///
/// Element operations are addressed by CSS selector so that callers never
/// hold element handles across calls.
#[async_trait]
pub trait WebDriverController: Send + Sync {
    /// Navigate to a URL
    async fn navigate(&mut self, url: &str) -> Result<()>;

    /// Visible text of the first element matching `selector`
    async fn element_text(&mut self, selector: &str) -> Result<String>;

    /// Outer HTML of the first element matching `selector`
    async fn element_html(&mut self, selector: &str) -> Result<String>;

    /// Click the first element matching `selector`
    async fn click(&mut self, selector: &str) -> Result<()>;

    /// Execute JavaScript in the browser
    async fn execute_script(&mut self, script: &str, args: Vec<Value>) -> Result<Value>;

    /// End the browser session
    async fn quit(&mut self) -> Result<()>;
}

/// Represents a web element in the DOM
pub struct WebElement {
    pub(crate) inner: fantoccini::elements::Element,
}

impl WebElement {
    pub async fn click(&mut self) -> Result<()> {
        self.inner.click().await?;
        Ok(())
    }

    pub async fn text(&self) -> Result<String> {
        Ok(self.inner.text().await?)
    }

    /// Get the element's HTML, inner or outer
    pub async fn html(&self, inner: bool) -> Result<String> {
        Ok(self.inner.html(inner).await?)
    }
}
