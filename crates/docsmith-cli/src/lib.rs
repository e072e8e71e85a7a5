//! docsmith CLI - reads API documentation in a headless browser and prints the
//! integration configuration the model assembles from it.

mod cli_args;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use docsmith_browser::{start_chrome, ChromeOptions, ChromeSession};
use docsmith_config::Config;
use docsmith_core::prompts::{user_prompt, SYSTEM_PROMPT};
use docsmith_core::{
    browser_session, default_registry, ApiConfig, LLMProvider, Orchestrator, OrchestratorOptions,
};
use docsmith_providers::openai::OpenAIProvider;

pub use cli_args::Cli;

pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    initialize_logging(cli.verbose);

    let config = load_config_with_cli_overrides(&cli)?;
    let api_key = config.resolve_api_key()?;

    let provider: Arc<dyn LLMProvider> = Arc::new(OpenAIProvider::new(
        api_key,
        Some(config.provider.model.clone()),
        config.provider.base_url.clone(),
        config.provider.max_tokens,
        Some(config.provider.temperature),
    )?);

    let ChromeSession {
        driver,
        process: mut chromedriver,
    } = start_chrome(
        &chrome_options(&config),
        config.webdriver.chromedriver_binary.as_deref(),
    )
    .await?;
    let session = browser_session(driver);

    let registry = default_registry(
        session.clone(),
        Duration::from_secs(config.http.timeout_seconds),
    )?;
    let mut orchestrator =
        Orchestrator::new(provider, registry).with_options(OrchestratorOptions::from_config(&config));

    let cancellation_token = CancellationToken::new();
    let ctrl_c_token = cancellation_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after the current step");
            ctrl_c_token.cancel();
        }
    });

    info!("Reading documentation at {}", cli.url);
    let result = orchestrator
        .run_for_config(
            SYSTEM_PROMPT,
            &user_prompt(&cli.url),
            config.agent.max_iterations,
            cancellation_token,
        )
        .await;

    if let Err(e) = session.lock().await.quit().await {
        warn!("Failed to close the browser: {}", e);
    }
    chromedriver.shutdown().await;

    let usage = orchestrator.usage();
    info!(
        "{} tool rounds, {} tokens",
        orchestrator.iterations(),
        usage.total_tokens
    );

    match result {
        Ok(api_config) => write_output(&api_config, cli.output.as_deref()),
        Err(e) => {
            if e.is_retryable_with_larger_cap() {
                error!("{}; try again with a larger --max-iterations", e);
            } else if e.is_tool_failure() {
                error!("{}; --soft-tool-failures lets the model recover from this", e);
            }
            Err(e.into())
        }
    }
}

/// Load the config file and fold the command-line flags into it
pub fn load_config_with_cli_overrides(cli: &Cli) -> Result<Config> {
    let mut config = Config::load_with_overrides(
        cli.config.as_deref(),
        cli.model.clone(),
        cli.max_iterations,
    )?;

    if cli.soft_tool_failures {
        config.agent.soft_tool_failures = true;
    }
    if cli.no_headless {
        config.webdriver.headless = false;
    }

    Ok(config)
}

pub fn chrome_options(config: &Config) -> ChromeOptions {
    ChromeOptions {
        port: config.webdriver.chrome_port,
        headless: config.webdriver.headless,
        chrome_binary: config.webdriver.chrome_binary.clone(),
    }
}

/// Pretty-printed JSON to `output`, or stdout when no file is given
pub fn write_output(api_config: &ApiConfig, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(api_config)?;

    match output {
        Some(path) => {
            std::fs::write(path, format!("{}\n", json))
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Configuration written to {}", path.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}

fn initialize_logging(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let level = if verbose { "debug" } else { "info" };
    let mut filter = EnvFilter::from_default_env();
    for target in [
        "docsmith",
        "docsmith_cli",
        "docsmith_core",
        "docsmith_browser",
        "docsmith_providers",
    ] {
        if let Ok(directive) = format!("{}={}", target, level).parse() {
            filter = filter.add_directive(directive);
        }
    }

    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}
