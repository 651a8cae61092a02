use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::page::{
    EventDomContentEventFired, NavigateParams, NavigateReturns,
};
use chromiumoxide::page::Page as CrPage;
use futures::StreamExt;
use serde_json::Value;

use crate::engine::EnginePage;
use crate::error::{Error, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Wrapper around a chromiumoxide Page driven by the scraper.
pub struct Page {
    inner: CrPage,
    timeout: Duration,
}

impl Page {
    pub(crate) fn new(inner: CrPage, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    /// Returns a reference to the underlying chromiumoxide Page.
    pub fn inner(&self) -> &CrPage {
        &self.inner
    }
}

#[derive(Debug, PartialEq, Eq)]
enum NavigationKind {
    /// A new document is loading; wait for its `DOMContentLoaded`.
    NewDocument,
    /// Fragment or history change; no new document will be parsed.
    SameDocument,
}

fn navigation_kind(url: &str, returns: &NavigateReturns) -> Result<NavigationKind> {
    if let Some(error_text) = &returns.error_text {
        return Err(Error::Navigation(format!("{url}: {error_text}")));
    }
    Ok(match returns.loader_id {
        Some(_) => NavigationKind::NewDocument,
        None => NavigationKind::SameDocument,
    })
}

/// Build the expression that applies `function` to every element matching
/// `selector`. Async evaluators are awaited.
fn evaluate_on_all_js(selector: &str, function: &str) -> Result<String> {
    let selector_js = serde_json::to_string(selector).map_err(|e| Error::Evaluation {
        key: selector.to_string(),
        message: e.to_string(),
    })?;
    Ok(format!(
        r#"
        (async () => {{
            const elements = Array.from(document.querySelectorAll({selector_js}));
            return await ({function})(elements);
        }})()
        "#,
    ))
}

#[async_trait]
impl EnginePage for Page {
    fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Navigate and return once `DOMContentLoaded` has fired for the new
    /// document, so that modal dialogs or slow subresources do not hold up
    /// extraction.
    async fn goto(&self, url: &str) -> Result<()> {
        // subscribe before navigating so the event cannot be missed
        let mut content_parsed = self
            .inner
            .event_listener::<EventDomContentEventFired>()
            .await
            .map_err(|e| Error::Navigation(e.to_string()))?;

        let navigate = async {
            let response = self
                .inner
                .execute(NavigateParams::new(url))
                .await
                .map_err(|e| Error::Navigation(e.to_string()))?;
            match navigation_kind(url, &response.result)? {
                NavigationKind::SameDocument => Ok(()),
                NavigationKind::NewDocument => match content_parsed.next().await {
                    Some(_) => Ok(()),
                    None => Err(Error::Navigation(format!(
                        "{url}: page closed before content was parsed"
                    ))),
                },
            }
        };

        tokio::time::timeout(self.timeout, navigate)
            .await
            .map_err(|_| Error::NavigationTimeout {
                url: url.to_string(),
                timeout: self.timeout,
            })?
    }

    /// Wait for an element matching the given CSS selector to appear in the DOM.
    /// Polls every 100ms up to the page timeout.
    async fn wait_for_selector(&self, selector: &str) -> Result<()> {
        let start = Instant::now();

        loop {
            match self.inner.find_element(selector).await {
                Ok(_) => return Ok(()),
                Err(_) if start.elapsed() < self.timeout => {
                    tokio::time::sleep(POLL_INTERVAL).await;
                }
                Err(_) => {
                    return Err(Error::ElementWaitTimeout {
                        selector: selector.to_string(),
                        timeout: self.timeout,
                    });
                }
            }
        }
    }

    async fn evaluate_on_all(&self, selector: &str, function: &str) -> Result<Vec<Value>> {
        let evaluation_error = |message: String| Error::Evaluation {
            key: selector.to_string(),
            message,
        };

        let js = evaluate_on_all_js(selector, function)?;
        let result = self
            .inner
            .evaluate(js)
            .await
            .map_err(|e| evaluation_error(e.to_string()))?;
        match result.into_value::<Value>() {
            Ok(Value::Array(values)) => Ok(values),
            Ok(other) => Err(evaluation_error(format!(
                "evaluator returned {other}, expected an array"
            ))),
            Err(e) => Err(evaluation_error(e.to_string())),
        }
    }

    async fn close(&self) -> Result<()> {
        self.inner.clone().close().await?;
        Ok(())
    }
}
