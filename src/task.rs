use std::fmt;
use std::sync::Arc;

use serde_json::Value;

type Postprocess = Arc<dyn Fn(Vec<Value>) -> Value + Send + Sync>;

/// One named extraction: a selector, an in-page evaluator and an optional
/// host-side post-processor.
///
/// `evaluate` is the source of a JS function that receives an array of every
/// element matching `selector` and returns an array. It runs inside the page,
/// so it can only see what it is given.
#[derive(Clone)]
pub struct ExtractionStep {
    pub key: String,
    pub selector: String,
    pub evaluate: String,
    postprocess: Option<Postprocess>,
}

impl ExtractionStep {
    pub fn new(
        key: impl Into<String>,
        selector: impl Into<String>,
        evaluate: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            selector: selector.into(),
            evaluate: evaluate.into(),
            postprocess: None,
        }
    }

    /// Collect the `textContent` of every matching element.
    pub fn text(key: impl Into<String>, selector: impl Into<String>) -> Self {
        Self::new(key, selector, "els => els.map(el => el.textContent)")
    }

    /// Collect an attribute from every matching element (`null` when absent).
    pub fn attribute(
        key: impl Into<String>,
        selector: impl Into<String>,
        name: &str,
    ) -> Self {
        let name_js = Value::String(name.to_string()).to_string();
        Self::new(
            key,
            selector,
            format!("els => els.map(el => el.getAttribute({name_js}))"),
        )
    }

    /// Transform the extracted array before it is stored under `key`.
    pub fn postprocess<F>(mut self, f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Value + Send + Sync + 'static,
    {
        self.postprocess = Some(Arc::new(f));
        self
    }

    pub fn has_postprocess(&self) -> bool {
        self.postprocess.is_some()
    }

    /// Apply the post-processor, or wrap the raw values as a JSON array.
    pub(crate) fn finish(&self, values: Vec<Value>) -> Value {
        match &self.postprocess {
            Some(f) => f(values),
            None => Value::Array(values),
        }
    }
}

impl fmt::Debug for ExtractionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionStep")
            .field("key", &self.key)
            .field("selector", &self.selector)
            .field("evaluate", &self.evaluate)
            .field("postprocess", &self.postprocess.is_some())
            .finish()
    }
}

/// A URL and the ordered steps to run against it.
///
/// A task with no steps is valid and scrapes to an empty result.
#[derive(Debug, Clone)]
pub struct ScrapeTask {
    url: String,
    steps: Vec<ExtractionStep>,
}

impl ScrapeTask {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            steps: Vec::new(),
        }
    }

    pub fn with_steps(
        url: impl Into<String>,
        steps: impl IntoIterator<Item = ExtractionStep>,
    ) -> Self {
        Self {
            url: url.into(),
            steps: steps.into_iter().collect(),
        }
    }

    pub fn step(mut self, step: ExtractionStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn steps(&self) -> &[ExtractionStep] {
        &self.steps
    }
}
