use std::sync::Arc;
use std::time::Duration;

use crate::browser::ChromiumLauncher;
use crate::engine::Launcher;
use crate::retry::{RetryAll, RetryPolicy};
use crate::scraper::Scraper;

/// Behaviour shared by every task run on one [`Scraper`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScraperConfig {
    /// Return terminal failures as `Err` (true) or log them and yield `None` (false).
    pub throw_on_error: bool,
    /// Emit progress diagnostics through `tracing`.
    pub verbose: bool,
    /// Page operation timeout (navigation and element waits).
    pub timeout: Duration,
    /// Extra attempts after the first one fails.
    pub max_retries: u32,
    /// Upper bound on pages open at the same time across concurrent scrapes.
    pub max_open_pages: usize,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            throw_on_error: true,
            verbose: false,
            timeout: Duration::from_millis(30_000),
            max_retries: 2,
            max_open_pages: 8,
        }
    }
}

/// Options for launching Chrome.
#[derive(Debug, Clone)]
pub struct LaunchConfig {
    pub headless: bool,
    pub chrome_path: Option<String>,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_path: None,
            viewport_width: 1920,
            viewport_height: 1080,
        }
    }
}

pub struct ScraperBuilder {
    config: ScraperConfig,
    launch: LaunchConfig,
    policy: Arc<dyn RetryPolicy>,
}

impl ScraperBuilder {
    pub fn new() -> Self {
        Self {
            config: ScraperConfig::default(),
            launch: LaunchConfig::default(),
            policy: Arc::new(RetryAll),
        }
    }

    pub fn throw_on_error(mut self, throw_on_error: bool) -> Self {
        self.config.throw_on_error = throw_on_error;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.config.verbose = verbose;
        self
    }

    /// Alias for [`verbose`](Self::verbose).
    pub fn noisy(self, noisy: bool) -> Self {
        self.verbose(noisy)
    }

    /// Set the timeout for navigation and for each element wait.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.config.max_retries = max_retries;
        self
    }

    /// Cap the number of pages open at once. Zero is treated as one.
    pub fn max_open_pages(mut self, max_open_pages: usize) -> Self {
        self.config.max_open_pages = max_open_pages.max(1);
        self
    }

    pub fn headless(mut self, headless: bool) -> Self {
        self.launch.headless = headless;
        self
    }

    pub fn chrome_path(mut self, path: impl Into<String>) -> Self {
        self.launch.chrome_path = Some(path.into());
        self
    }

    pub fn viewport(mut self, width: u32, height: u32) -> Self {
        self.launch.viewport_width = width;
        self.launch.viewport_height = height;
        self
    }

    /// Replace the default retry-everything policy, e.g. with
    /// [`TransientOnly`](crate::retry::TransientOnly).
    pub fn retry_policy(mut self, policy: impl RetryPolicy + 'static) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    pub fn build_config(self) -> ScraperConfig {
        self.config
    }

    /// Start a scraper backed by Chrome. The browser launches in the
    /// background; must be called from within a Tokio runtime.
    pub fn build(self) -> Scraper {
        let launcher = ChromiumLauncher::new(self.launch.clone());
        self.build_with(launcher)
    }

    /// Start a scraper backed by any [`Launcher`].
    pub fn build_with(self, launcher: impl Launcher) -> Scraper {
        Scraper::with_parts(self.config, self.policy, Arc::new(launcher))
    }
}

impl Default for ScraperBuilder {
    fn default() -> Self {
        Self::new()
    }
}
