use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Environment variable consulted when the config file carries no API key
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

const DEFAULT_CONFIG_PATHS: [&str; 3] = [
    "./docsmith.toml",
    "~/.config/docsmith/config.toml",
    "~/.docsmith.toml",
];

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub webdriver: WebDriverConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

/// OpenAI-compatible completion endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Falls back to `OPENAI_API_KEY` when unset
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Completion requests allowed before the run is declared exhausted
    pub max_iterations: u32,
    /// Hard context limit of the model, in tokens
    pub context_limit: u32,
    /// Tokens kept free below `context_limit` for the response itself
    pub response_reserve_tokens: u32,
    /// Report tool failures back to the model instead of aborting the run
    pub soft_tool_failures: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebDriverConfig {
    pub chrome_port: u16,
    /// Optional path to Chrome binary (e.g., Chrome for Testing)
    /// If not set, ChromeDriver will use the default Chrome installation
    pub chrome_binary: Option<String>,
    /// Optional path to the chromedriver executable, defaults to `chromedriver` in PATH
    pub chromedriver_binary: Option<String>,
    pub headless: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_seconds: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            base_url: None,
            max_tokens: None,
            temperature: 0.0,
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: 20,
            context_limit: 128_000,
            response_reserve_tokens: 500,
            soft_tool_failures: false,
        }
    }
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self {
            chrome_port: 9515,
            chrome_binary: None,
            chromedriver_binary: None,
            headless: true,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_seconds: 30 }
    }
}

impl AgentConfig {
    /// Token budget available to the conversation before each completion request
    pub fn token_budget(&self) -> u32 {
        self.context_limit.saturating_sub(self.response_reserve_tokens)
    }
}

impl Config {
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let config_path_to_load = match config_path {
            Some(path) => {
                if !Path::new(path).exists() {
                    anyhow::bail!("Configuration file not found: {}", path);
                }
                Some(path.to_string())
            }
            None => DEFAULT_CONFIG_PATHS.iter().find_map(|path| {
                let expanded_path = shellexpand::tilde(path);
                if Path::new(expanded_path.as_ref()).exists() {
                    Some(expanded_path.to_string())
                } else {
                    None
                }
            }),
        };

        let Some(path) = config_path_to_load else {
            debug!("No configuration file found, using defaults");
            return Ok(Self::default());
        };

        debug!("Loading configuration from {}", path);
        let config_content = std::fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&config_content)?;
        config.validate()?;

        Ok(config)
    }

    pub fn load_with_overrides(
        config_path: Option<&str>,
        model_override: Option<String>,
        max_iterations_override: Option<u32>,
    ) -> Result<Self> {
        let mut config = Self::load(config_path)?;

        if let Some(model) = model_override {
            config.provider.model = model;
        }

        if let Some(max_iterations) = max_iterations_override {
            config.agent.max_iterations = max_iterations;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.agent.max_iterations == 0 {
            anyhow::bail!("agent.max_iterations must be at least 1");
        }

        if self.agent.response_reserve_tokens >= self.agent.context_limit {
            anyhow::bail!(
                "agent.response_reserve_tokens ({}) must be below agent.context_limit ({})",
                self.agent.response_reserve_tokens,
                self.agent.context_limit
            );
        }

        if self.http.timeout_seconds == 0 {
            anyhow::bail!("http.timeout_seconds must be at least 1");
        }

        Ok(())
    }

    /// API key from the config file, or from `OPENAI_API_KEY`
    pub fn resolve_api_key(&self) -> Result<String> {
        if let Some(key) = self.provider.api_key.as_ref().filter(|k| !k.is_empty()) {
            return Ok(key.clone());
        }

        std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "{} environment variable is not set and provider.api_key is missing",
                    API_KEY_ENV
                )
            })
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;
        Ok(())
    }
}
