//! Per-invocation retry state machine.
//!
//! ```text
//! Attempting(0) -> Attempting(1) -> ... -> Attempting(max_retries)
//!       |               |                         |
//!       +---------------+-------------------------+--> Succeeded
//!                                                 +--> Failed
//! ```
//!
//! The attempt counter lives in the handler, and a handler is built fresh
//! for every `scrape()` call, so concurrent scrapes never share it.

use tracing::{info, warn};

use crate::config::ScraperConfig;
use crate::error::{Error, ErrorKind, Result};
use crate::pipeline;
use crate::result::ScrapeResult;
use crate::retry::{self, RetryPolicy};
use crate::session::{PageGuard, Session};
use crate::task::ScrapeTask;

enum State {
    Attempting(u32),
    Succeeded(ScrapeResult),
    Failed(Error),
}

pub(crate) struct TaskHandler<'a> {
    session: &'a Session,
    config: &'a ScraperConfig,
    policy: &'a dyn RetryPolicy,
    task: &'a ScrapeTask,
    id: u64,
}

impl<'a> TaskHandler<'a> {
    pub(crate) fn new(
        session: &'a Session,
        config: &'a ScraperConfig,
        policy: &'a dyn RetryPolicy,
        task: &'a ScrapeTask,
        id: u64,
    ) -> Self {
        Self {
            session,
            config,
            policy,
            task,
            id,
        }
    }

    /// Drive the task to a terminal state.
    pub(crate) async fn run(self) -> Result<ScrapeResult> {
        let mut state = State::Attempting(0);
        loop {
            state = match state {
                State::Attempting(n) => match self.attempt(n).await {
                    Ok(result) => State::Succeeded(result),
                    Err(err) => self.on_failure(n, err),
                },
                State::Succeeded(result) => return Ok(result),
                State::Failed(err) => return Err(err),
            };
        }
    }

    fn on_failure(&self, n: u32, err: Error) -> State {
        let max_retries = self.config.max_retries;
        if !retry::is_retryable(self.policy, &err) {
            return match err.kind() {
                ErrorKind::Fatal | ErrorKind::Terminal => State::Failed(err),
                ErrorKind::Transient | ErrorKind::Deterministic => {
                    if self.config.verbose {
                        warn!(id = self.id, error = %err, "not retrying");
                    }
                    State::Failed(Error::RetryLimitExceeded {
                        max_retries,
                        attempts: u64::from(n) + 1,
                        source: Box::new(err),
                    })
                }
            };
        }

        if n >= max_retries {
            if self.config.verbose {
                warn!(id = self.id, error = %err, "Exceeded retry limit of {max_retries}");
            }
            return State::Failed(Error::RetryLimitExceeded {
                max_retries,
                attempts: u64::from(n) + 1,
                source: Box::new(err),
            });
        }
        if self.config.verbose {
            warn!(id = self.id, attempt = n, "{err}. Retrying...");
        }
        // n < max_retries, so this cannot overflow
        State::Attempting(n + 1)
    }

    /// One full attempt on a fresh page. The page is closed on every path out.
    async fn attempt(&self, n: u32) -> Result<ScrapeResult> {
        let verbose = self.config.verbose;
        let url = self.task.url();
        if n > 0 && verbose {
            info!(id = self.id, attempt = n, "Scraper retry attempt {n}");
        }

        let page = self.session.open_page(self.config.timeout).await?;
        if verbose {
            info!(id = self.id, url, "---> Page open for {url}");
        }

        let outcome = self.navigate_and_extract(&page).await;
        page.close().await;
        outcome
    }

    async fn navigate_and_extract(&self, page: &PageGuard) -> Result<ScrapeResult> {
        let url = self.task.url();
        let page = page.page()?;
        page.goto(url).await?;
        if self.config.verbose {
            info!(id = self.id, url, "Page went to {url}...");
        }
        pipeline::run_steps(page, self.task.steps(), self.id, self.config.verbose).await
    }
}
