// src/pipeline/scrape.rs

//! Scrape phase: run every adapter in isolation and merge the results.

use crate::models::JobRecord;
use crate::sources::{JobSource, SourceStatus};

/// Merged output of all adapters.
#[derive(Debug, Default)]
pub struct ScrapeOutcome {
    /// Concatenated in adapter order
    pub jobs: Vec<JobRecord>,
    /// Platform-prefixed error strings
    pub errors: Vec<String>,
    pub statuses: Vec<(String, SourceStatus)>,
}

impl ScrapeOutcome {
    /// Nothing came back and nothing went wrong.
    pub fn is_silent(&self) -> bool {
        self.jobs.is_empty() && self.errors.is_empty()
    }

    /// Some records arrived, but at least one call failed.
    pub fn is_degraded(&self) -> bool {
        !self.jobs.is_empty() && !self.errors.is_empty()
    }
}

/// Run each adapter in turn. One adapter failing never affects another.
pub async fn run_sources(sources: &mut [Box<dyn JobSource>]) -> ScrapeOutcome {
    let mut outcome = ScrapeOutcome::default();

    for source in sources.iter_mut() {
        let report = source.safe_fetch().await;
        match report.status {
            SourceStatus::Disabled => {}
            SourceStatus::Completed => {
                log::info!("{}: {} jobs", report.platform, report.jobs.len())
            }
            SourceStatus::Degraded | SourceStatus::Failed => log::warn!(
                "{}: {} jobs, {} errors",
                report.platform,
                report.jobs.len(),
                report.errors.len()
            ),
        }
        outcome.statuses.push((report.platform, report.status));
        outcome.jobs.extend(report.jobs);
        outcome.errors.extend(report.errors);
    }

    log::info!("Total scraped: {} jobs from all sources", outcome.jobs.len());
    outcome
}
