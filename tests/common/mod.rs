//! In-memory stand-in for Chrome. Serves fixture pages keyed by URL and
//! records what the scraper did with them.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use agentic_scraper::engine::{Engine, EnginePage, Launcher};
use agentic_scraper::{Error, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

pub const FIXTURE_URL: &str = "http://127.0.0.1:8080";
pub const SLOW_URL: &str = "http://127.0.0.1:8080/slow";
pub const FLAKY_URL: &str = "http://127.0.0.1:8080/flaky";

#[derive(Clone, Default)]
pub struct FakeSite {
    elements: HashMap<String, Vec<Value>>,
    /// Number of navigations that time out before the site starts answering.
    flaky: u32,
    /// Delay before navigation completes.
    latency: Duration,
}

impl FakeSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, selector: &str, values: Vec<Value>) -> Self {
        self.elements.insert(selector.to_string(), values);
        self
    }

    pub fn flaky(mut self, failures: u32) -> Self {
        self.flaky = failures;
        self
    }

    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

/// The test page: two paragraphs and a heading.
pub fn fixture_site() -> FakeSite {
    FakeSite::new()
        .with("p", vec![json!("target"), json!("target")])
        .with("h1", vec![json!("Fixture")])
}

#[derive(Default)]
pub struct Stats {
    navigations: Mutex<HashMap<String, u32>>,
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    open_now: AtomicUsize,
    pub max_open: AtomicUsize,
}

impl Stats {
    pub fn navigations(&self, url: &str) -> u32 {
        self.navigations
            .lock()
            .unwrap()
            .get(url)
            .copied()
            .unwrap_or(0)
    }

    fn record_navigation(&self, url: &str) -> u32 {
        let mut navigations = self.navigations.lock().unwrap();
        let count = navigations.entry(url.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn max_open(&self) -> usize {
        self.max_open.load(Ordering::SeqCst)
    }
}

pub struct FakeEngine {
    sites: HashMap<String, FakeSite>,
    pub stats: Arc<Stats>,
    pub shut_down: AtomicBool,
    page_close_fails: AtomicBool,
}

impl FakeEngine {
    pub fn new() -> Arc<Self> {
        Self::with_sites([(FIXTURE_URL, fixture_site())])
    }

    pub fn with_sites<'a>(sites: impl IntoIterator<Item = (&'a str, FakeSite)>) -> Arc<Self> {
        Arc::new(Self {
            sites: sites
                .into_iter()
                .map(|(url, site)| (url.to_string(), site))
                .collect(),
            stats: Arc::new(Stats::default()),
            shut_down: AtomicBool::new(false),
            page_close_fails: AtomicBool::new(false),
        })
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    /// Make every page opened from now on report an error when closed.
    pub fn fail_page_close(&self) {
        self.page_close_fails.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Engine for FakeEngine {
    async fn new_page(&self) -> Result<Box<dyn EnginePage>> {
        if self.is_shut_down() {
            return Err(Error::Navigation("browser has disconnected".into()));
        }
        self.stats.opened.fetch_add(1, Ordering::SeqCst);
        let now = self.stats.open_now.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.max_open.fetch_max(now, Ordering::SeqCst);
        Ok(Box::new(FakePage {
            sites: self.sites.clone(),
            stats: Arc::clone(&self.stats),
            timeout: Duration::from_secs(30),
            current: Mutex::new(None),
            close_fails: self.page_close_fails.load(Ordering::SeqCst),
        }))
    }

    async fn close(&self) -> Result<()> {
        self.shut_down.store(true, Ordering::SeqCst);
        Ok(())
    }
}

struct FakePage {
    sites: HashMap<String, FakeSite>,
    stats: Arc<Stats>,
    timeout: Duration,
    current: Mutex<Option<FakeSite>>,
    close_fails: bool,
}

impl FakePage {
    fn site(&self) -> Option<FakeSite> {
        self.current.lock().unwrap().clone()
    }
}

#[async_trait]
impl EnginePage for FakePage {
    fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    async fn goto(&self, url: &str) -> Result<()> {
        let count = self.stats.record_navigation(url);
        let Some(site) = self.sites.get(url).cloned() else {
            return Err(Error::Navigation(format!("{url}: net::ERR_CONNECTION_REFUSED")));
        };
        if count <= site.flaky {
            return Err(Error::NavigationTimeout {
                url: url.to_string(),
                timeout: self.timeout,
            });
        }
        tokio::time::sleep(site.latency).await;
        *self.current.lock().unwrap() = Some(site);
        Ok(())
    }

    async fn wait_for_selector(&self, selector: &str) -> Result<()> {
        let found = self
            .site()
            .map(|site| site.elements.contains_key(selector))
            .unwrap_or(false);
        if found {
            return Ok(());
        }
        tokio::time::sleep(self.timeout).await;
        Err(Error::ElementWaitTimeout {
            selector: selector.to_string(),
            timeout: self.timeout,
        })
    }

    async fn evaluate_on_all(&self, selector: &str, function: &str) -> Result<Vec<Value>> {
        if function.contains("throw") {
            return Err(Error::Evaluation {
                key: selector.to_string(),
                message: "Uncaught Error: boom".into(),
            });
        }
        Ok(self
            .site()
            .and_then(|site| site.elements.get(selector).cloned())
            .unwrap_or_default())
    }

    async fn close(&self) -> Result<()> {
        self.stats.closed.fetch_add(1, Ordering::SeqCst);
        self.stats.open_now.fetch_sub(1, Ordering::SeqCst);
        if self.close_fails {
            return Err(Error::Navigation("target already detached".into()));
        }
        Ok(())
    }
}

pub struct FakeLauncher {
    engine: Arc<FakeEngine>,
    delay: Duration,
    failure: Option<String>,
}

impl FakeLauncher {
    pub fn new(engine: Arc<FakeEngine>) -> Self {
        Self {
            engine,
            delay: Duration::ZERO,
            failure: None,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing(mut self, reason: &str) -> Self {
        self.failure = Some(reason.to_string());
        self
    }
}

#[async_trait]
impl Launcher for FakeLauncher {
    async fn launch(&self) -> Result<Arc<dyn Engine>> {
        tokio::time::sleep(self.delay).await;
        match &self.failure {
            Some(reason) => Err(Error::SessionInit(reason.clone())),
            None => Ok(Arc::clone(&self.engine) as Arc<dyn Engine>),
        }
    }
}
