//! Pipeline entry points.
//!
//! - `run_sources`: Invoke every adapter and merge records and errors
//! - `run_pipeline`: Scrape, filter, score, store, notify and purge

mod run;
mod scrape;
#[cfg(test)]
mod testing;

pub use run::{PipelineSummary, run_pipeline};
pub use scrape::{ScrapeOutcome, run_sources};
