pub mod browser;
pub mod config;
pub mod engine;
pub mod error;
mod handler;
pub mod page;
mod pipeline;
pub mod result;
pub mod retry;
pub mod scraper;
pub mod session;
pub mod task;

pub use browser::ChromiumLauncher;
pub use config::{LaunchConfig, ScraperBuilder, ScraperConfig};
pub use error::{Error, ErrorKind, Result};
pub use result::ScrapeResult;
pub use retry::{RetryAll, RetryPolicy, TransientOnly};
pub use scraper::Scraper;
pub use session::{Session, SessionHandle};
pub use task::{ExtractionStep, ScrapeTask};
