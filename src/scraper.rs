use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::warn;

use crate::browser::ChromiumLauncher;
use crate::config::{LaunchConfig, ScraperBuilder, ScraperConfig};
use crate::engine::Launcher;
use crate::error::{Error, Result};
use crate::handler::TaskHandler;
use crate::result::ScrapeResult;
use crate::retry::{RetryAll, RetryPolicy};
use crate::session::Session;
use crate::task::ScrapeTask;

/// Runs [`ScrapeTask`]s against one shared browser session.
///
/// `scrape` takes `&self` and may be called concurrently; every call gets its
/// own page and its own retry counter.
pub struct Scraper {
    session: Session,
    config: ScraperConfig,
    policy: Arc<dyn RetryPolicy>,
    next_id: AtomicU64,
}

impl Scraper {
    /// Create a new ScraperBuilder for configuring the scraper and its browser.
    pub fn builder() -> ScraperBuilder {
        ScraperBuilder::new()
    }

    /// Start a scraper on a default headless Chrome.
    /// Must be called from within a Tokio runtime.
    pub fn new(config: ScraperConfig) -> Self {
        Self::with_launcher(config, ChromiumLauncher::new(LaunchConfig::default()))
    }

    pub fn with_launcher(config: ScraperConfig, launcher: impl Launcher) -> Self {
        Self::with_parts(config, Arc::new(RetryAll), Arc::new(launcher))
    }

    pub(crate) fn with_parts(
        config: ScraperConfig,
        policy: Arc<dyn RetryPolicy>,
        launcher: Arc<dyn Launcher>,
    ) -> Self {
        let session = Session::launch(launcher, config.max_open_pages, config.verbose);
        Self {
            session,
            config,
            policy,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Wait until the browser has launched.
    pub async fn ready(&self) -> Result<()> {
        self.session.engine().await.map(|_| ())
    }

    /// Run `task`, retrying failed attempts up to `max_retries` times.
    ///
    /// On terminal failure, returns `Err(Error::Scrape(..))` when
    /// `throw_on_error` is set and `Ok(None)` otherwise.
    pub async fn scrape(&self, task: &ScrapeTask) -> Result<Option<ScrapeResult>> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let outcome = match self.session.engine().await {
            Ok(_) => {
                TaskHandler::new(&self.session, &self.config, self.policy.as_ref(), task, id)
                    .run()
                    .await
            }
            Err(err) => Err(err),
        };

        match outcome {
            Ok(result) => Ok(Some(result)),
            Err(err) if self.config.throw_on_error => Err(Error::Scrape(Box::new(err))),
            Err(err) => {
                if self.config.verbose {
                    warn!(id, url = task.url(), "Scraper: {err}");
                }
                Ok(None)
            }
        }
    }

    /// Close the browser. Later scrapes fail with [`Error::SessionClosed`].
    pub async fn close(&self) -> Result<()> {
        self.session.close().await
    }
}
