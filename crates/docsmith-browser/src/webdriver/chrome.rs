use super::{WebDriverController, WebElement};
use anyhow::{Context, Result};
use async_trait::async_trait;
use fantoccini::{Client, ClientBuilder};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Options used to open a Chrome session through chromedriver
#[derive(Debug, Clone)]
pub struct ChromeOptions {
    pub port: u16,
    pub headless: bool,
    /// Chrome binary to launch instead of the default installation
    pub chrome_binary: Option<String>,
}

impl Default for ChromeOptions {
    fn default() -> Self {
        Self {
            port: 9515,
            headless: true,
            chrome_binary: None,
        }
    }
}

impl ChromeOptions {
    fn browser_args(&self) -> Vec<Value> {
        let mut args = vec![
            format!("--user-data-dir=/tmp/docsmith-chrome-{}", std::process::id()),
            "--disable-gpu".to_string(),
            "--no-sandbox".to_string(),
            "--disable-dev-shm-usage".to_string(),
            "--window-size=1920,1080".to_string(),
            "--lang=en-US,en".to_string(),
        ];
        if self.headless {
            args.insert(1, "--headless=new".to_string());
        }
        args.into_iter().map(Value::String).collect()
    }

    fn capabilities(&self) -> serde_json::Map<String, Value> {
        let mut chrome_options = serde_json::Map::new();
        chrome_options.insert("args".to_string(), Value::Array(self.browser_args()));

        if let Some(binary) = &self.chrome_binary {
            chrome_options.insert("binary".to_string(), Value::String(binary.clone()));
        }

        let mut caps = serde_json::Map::new();
        caps.insert(
            "browserName".to_string(),
            Value::String("chrome".to_string()),
        );
        caps.insert(
            "goog:chromeOptions".to_string(),
            Value::Object(chrome_options),
        );
        caps
    }
}

/// ChromeDriver WebDriver controller
pub struct ChromeDriver {
    client: Client,
}

impl ChromeDriver {
    /// Connect to a chromedriver already listening on `options.port`
    pub async fn connect(options: &ChromeOptions) -> Result<Self> {
        let url = format!("http://localhost:{}", options.port);
        debug!("Connecting to chromedriver at {}", url);

        let mut builder = ClientBuilder::native();
        let connect_future = builder.capabilities(options.capabilities()).connect(&url);

        let client = tokio::time::timeout(Duration::from_secs(30), connect_future)
            .await
            .context("Connection to ChromeDriver timed out after 30 seconds")?
            .context("Failed to connect to ChromeDriver")?;

        Ok(Self { client })
    }

    /// Find an element by CSS selector
    pub async fn find_element(&mut self, selector: &str) -> Result<WebElement> {
        let elem = self
            .client
            .find(fantoccini::Locator::Css(selector))
            .await
            .with_context(|| format!("Failed to find element with selector: {}", selector))?;
        Ok(WebElement { inner: elem })
    }

    /// Wait until the document reports `complete`, polling every 100ms
    pub async fn wait_for_ready_state(&mut self, timeout: Duration) -> Result<()> {
        let start = std::time::Instant::now();
        let poll_interval = Duration::from_millis(100);

        loop {
            let state = self
                .client
                .execute("return document.readyState;", vec![])
                .await?;
            if state.as_str() == Some("complete") {
                return Ok(());
            }

            if start.elapsed() >= timeout {
                anyhow::bail!("Timeout waiting for page to finish loading");
            }

            tokio::time::sleep(poll_interval).await;
        }
    }
}

#[async_trait]
impl WebDriverController for ChromeDriver {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        self.client.goto(url).await?;
        self.wait_for_ready_state(Duration::from_secs(30)).await
    }

    async fn element_text(&mut self, selector: &str) -> Result<String> {
        let elem = self.find_element(selector).await?;
        elem.text().await
    }

    async fn element_html(&mut self, selector: &str) -> Result<String> {
        let elem = self.find_element(selector).await?;
        elem.html(false).await
    }

    async fn click(&mut self, selector: &str) -> Result<()> {
        let mut elem = self.find_element(selector).await?;
        elem.click().await
    }

    async fn execute_script(&mut self, script: &str, args: Vec<Value>) -> Result<Value> {
        Ok(self.client.execute(script, args).await?)
    }

    async fn quit(&mut self) -> Result<()> {
        self.client.clone().close().await?;
        Ok(())
    }
}
