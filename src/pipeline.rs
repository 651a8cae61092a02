use tracing::info;

use crate::engine::EnginePage;
use crate::error::{Error, Result};
use crate::result::ScrapeResult;
use crate::task::ExtractionStep;

/// Run `steps` in order against an already-navigated page.
///
/// Steps never overlap: a later evaluator may depend on DOM changes made by
/// an earlier one. The first failing step aborts the rest and no partial
/// result is returned.
pub(crate) async fn run_steps(
    page: &dyn EnginePage,
    steps: &[ExtractionStep],
    id: u64,
    verbose: bool,
) -> Result<ScrapeResult> {
    let mut result = ScrapeResult::new(id);
    for step in steps {
        page.wait_for_selector(&step.selector).await?;
        let values = page
            .evaluate_on_all(&step.selector, &step.evaluate)
            .await
            .map_err(|err| match err {
                Error::Evaluation { message, .. } => Error::Evaluation {
                    key: step.key.clone(),
                    message,
                },
                other => other,
            })?;
        if verbose {
            info!(id, key = %step.key, count = values.len(), "Scraper got {}", step.key);
        }
        result.insert(&step.key, step.finish(values));
    }
    Ok(result)
}
