use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser as CrBrowser, BrowserConfig as CrBrowserConfig};
use chromiumoxide::handler::viewport::Viewport;
use futures::StreamExt;
use tokio::sync::RwLock;
use tracing::warn;

use crate::config::LaunchConfig;
use crate::engine::{Engine, EnginePage, Launcher};
use crate::error::{Error, Result};
use crate::page::Page;

/// Chrome flags that improve performance without affecting functionality.
const PERF_ARGS: &[&str] = &[
    "disable-gpu",
    "disable-extensions",
    "metrics-recording-only",
    "mute-audio",
    "no-default-browser-check",
    "disable-client-side-phishing-detection",
    "disable-popup-blocking",
    "disable-prompt-on-repost",
];

/// Timeout applied to pages before the handler sets the configured one.
const DEFAULT_PAGE_TIMEOUT: Duration = Duration::from_secs(30);

/// Launches Chrome through chromiumoxide.
#[derive(Debug, Clone, Default)]
pub struct ChromiumLauncher {
    config: LaunchConfig,
}

impl ChromiumLauncher {
    pub fn new(config: LaunchConfig) -> Self {
        Self { config }
    }

    fn browser_config(&self) -> Result<CrBrowserConfig> {
        let config = &self.config;
        let mut builder = CrBrowserConfig::builder();

        if config.headless {
            builder = builder.new_headless_mode().no_sandbox();
        } else {
            builder = builder.with_head().no_sandbox();
        }

        // chromiumoxide adds the `--` prefix itself
        for arg in PERF_ARGS {
            builder = builder.arg(*arg);
        }

        if let Some(ref path) = config.chrome_path {
            builder = builder.chrome_executable(path);
        }

        builder = builder.viewport(Viewport {
            width: config.viewport_width,
            height: config.viewport_height,
            device_scale_factor: None,
            emulating_mobile: false,
            is_landscape: false,
            has_touch: false,
        });

        builder.build().map_err(Error::SessionInit)
    }
}

#[async_trait]
impl Launcher for ChromiumLauncher {
    async fn launch(&self) -> Result<Arc<dyn Engine>> {
        let cr_config = self.browser_config()?;

        let (browser, mut handler) = CrBrowser::launch(cr_config)
            .await
            .map_err(|e| Error::SessionInit(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                // page-level errors are reported, never fatal to a scrape
                if let Err(err) = event {
                    warn!(error = %err, "Page: browser event error");
                }
            }
        });

        Ok(Arc::new(ChromiumEngine {
            browser: RwLock::new(browser),
            _handler_task: handler_task,
        }))
    }
}

/// A running Chrome instance.
pub struct ChromiumEngine {
    browser: RwLock<CrBrowser>,
    _handler_task: tokio::task::JoinHandle<()>,
}

#[async_trait]
impl Engine for ChromiumEngine {
    async fn new_page(&self) -> Result<Box<dyn EnginePage>> {
        let cr_page = self
            .browser
            .read()
            .await
            .new_page("about:blank")
            .await
            .map_err(|e| Error::Navigation(e.to_string()))?;
        Ok(Box::new(Page::new(cr_page, DEFAULT_PAGE_TIMEOUT)))
    }

    async fn close(&self) -> Result<()> {
        let mut browser = self.browser.write().await;
        browser.close().await?;
        browser.wait().await?;
        Ok(())
    }
}
