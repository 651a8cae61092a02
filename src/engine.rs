//! The browser-automation capability consumed by the scraper.
//!
//! [`Scraper`](crate::Scraper) never talks to Chrome directly; it drives these
//! traits. [`ChromiumLauncher`](crate::ChromiumLauncher) is the production
//! implementation, tests plug in an in-memory one.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// Starts an automation engine. Called once per session.
#[async_trait]
pub trait Launcher: Send + Sync + 'static {
    async fn launch(&self) -> Result<Arc<dyn Engine>>;
}

/// A running browser instance shared by every scrape on a session.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Open a fresh, isolated page.
    async fn new_page(&self) -> Result<Box<dyn EnginePage>>;

    /// Shut the engine down. Pages opened from it become unusable.
    async fn close(&self) -> Result<()>;
}

/// A single page owned by exactly one task attempt.
#[async_trait]
pub trait EnginePage: Send + Sync {
    /// Set the timeout applied to navigation and element waits on this page.
    fn set_timeout(&mut self, timeout: Duration);

    /// Navigate and wait until the document has been parsed
    /// (`DOMContentLoaded`), not until every subresource has loaded.
    async fn goto(&self, url: &str) -> Result<()>;

    /// Wait for at least one element matching `selector`.
    async fn wait_for_selector(&self, selector: &str) -> Result<()>;

    /// Run the JS function `function` over all elements matching `selector`
    /// and return the array it produces.
    async fn evaluate_on_all(&self, selector: &str, function: &str) -> Result<Vec<Value>>;

    /// Close the page. Called exactly once, by the attempt that opened it.
    async fn close(&self) -> Result<()>;
}
