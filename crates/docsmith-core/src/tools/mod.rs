//! Concrete tools offered to the model.
//!
//! - `webdriver` - browser navigation, extraction, clicks and scripts
//! - `http` - raw HTTP requests

pub mod http;
pub mod webdriver;

use std::sync::Arc;
use std::time::Duration;

pub use http::HttpRequester;
pub use webdriver::{
    browser_session, BrowserSession, Clicker, Navigator, PageExtractor, ScriptExecutor,
};

use crate::dispatch::ToolRegistry;

/// Registry with every docsmith tool, the browser ones sharing `session`
pub fn default_registry(
    session: BrowserSession,
    http_timeout: Duration,
) -> anyhow::Result<ToolRegistry> {
    let registry = ToolRegistry::new()
        .with(Arc::new(PageExtractor::new(session.clone())))?
        .with(Arc::new(Navigator::new(session.clone())))?
        .with(Arc::new(ScriptExecutor::new(session.clone())))?
        .with(Arc::new(Clicker::new(session)))?
        .with(Arc::new(HttpRequester::new(http_timeout)?))?;
    Ok(registry)
}
