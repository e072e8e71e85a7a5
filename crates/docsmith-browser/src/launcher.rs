//! Starting (or reusing) a chromedriver process and opening a session on it.

use crate::webdriver::chrome::{ChromeDriver, ChromeOptions};
use anyhow::{Context, Result};
use std::time::Duration;
use tokio::process::Child;
use tracing::{debug, info, warn};

const CONNECT_ATTEMPTS: u32 = 10;

/// The chromedriver process backing a session, if we spawned one
#[derive(Debug, Default)]
pub struct DriverProcess(Option<Child>);

impl DriverProcess {
    pub fn is_owned(&self) -> bool {
        self.0.is_some()
    }

    /// Kill the chromedriver process we started; a reused driver is left alone
    pub async fn shutdown(&mut self) {
        if let Some(mut process) = self.0.take() {
            if let Err(e) = process.kill().await {
                warn!("Failed to stop chromedriver: {}", e);
            }
        }
    }
}

/// A live Chrome session plus the process serving it
pub struct ChromeSession {
    pub driver: ChromeDriver,
    pub process: DriverProcess,
}

/// Check if chromedriver is already running on the given port.
pub async fn chromedriver_running(port: u16) -> bool {
    let url = format!("http://localhost:{}/status", port);
    match reqwest::Client::new()
        .get(&url)
        .timeout(Duration::from_millis(500))
        .send()
        .await
    {
        Ok(response) => response.status().is_success(),
        Err(_) => false,
    }
}

/// Open a Chrome session, spawning `chromedriver_binary` unless one already listens on the port
pub async fn start_chrome(
    options: &ChromeOptions,
    chromedriver_binary: Option<&str>,
) -> Result<ChromeSession> {
    if chromedriver_running(options.port).await {
        match ChromeDriver::connect(options).await {
            Ok(driver) => {
                info!("Reusing chromedriver on port {}", options.port);
                return Ok(ChromeSession {
                    driver,
                    process: DriverProcess::default(),
                });
            }
            Err(e) => debug!("Existing chromedriver rejected the session: {}", e),
        }
    }

    let chromedriver_cmd = chromedriver_binary.unwrap_or("chromedriver");
    debug!("Spawning {} on port {}", chromedriver_cmd, options.port);

    let mut process = tokio::process::Command::new(chromedriver_cmd)
        .arg(format!("--port={}", options.port))
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| {
            format!(
                "Failed to start {}; make sure chromedriver is installed and in your PATH",
                chromedriver_cmd
            )
        })?;

    let mut last_error = None;
    for attempt in 1..=CONNECT_ATTEMPTS {
        tokio::time::sleep(Duration::from_millis(200)).await;

        match ChromeDriver::connect(options).await {
            Ok(driver) => {
                info!(
                    "Chrome session started on port {} (headless: {})",
                    options.port, options.headless
                );
                return Ok(ChromeSession {
                    driver,
                    process: DriverProcess(Some(process)),
                });
            }
            Err(e) => {
                debug!("Connect attempt {}/{} failed: {}", attempt, CONNECT_ATTEMPTS, e);
                last_error = Some(e);
            }
        }
    }

    let _ = process.kill().await;
    let reason = last_error
        .map(|e| e.to_string())
        .unwrap_or_else(|| "Unknown error".to_string());
    anyhow::bail!(
        "Failed to connect to ChromeDriver after {} attempts: {}",
        CONNECT_ATTEMPTS,
        reason
    )
}
