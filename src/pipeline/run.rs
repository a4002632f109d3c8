// src/pipeline/run.rs

//! End-to-end run: scrape, filter, score, store, notify, purge.

use crate::error::Result;
use crate::filters::{ExperienceFilter, RelevanceFilter};
use crate::models::Config;
use crate::notify::{Digest, Notifier};
use crate::scoring::JobScorer;
use crate::sources::JobSource;
use crate::storage::{JobStore, StoreStats};
use crate::utils::report;

use super::scrape::run_sources;

const TOTAL_STEPS: usize = 6;

/// What a run did.
#[derive(Debug, Clone, Default)]
pub struct PipelineSummary {
    pub scraped: usize,
    /// Excluded by either filter
    pub excluded: usize,
    /// Rows written to the store
    pub inserted: usize,
    /// Backlog size before notification
    pub unsent: usize,
    /// Jobs included in the digest
    pub notified: usize,
    /// Whether the notifier accepted the digest
    pub delivered: bool,
    pub marked_sent: usize,
    pub purged: usize,
    pub errors: Vec<String>,
    pub stats: StoreStats,
}

impl PipelineSummary {
    fn items(&self) -> Vec<(&'static str, String)> {
        let platforms = self
            .stats
            .by_platform
            .iter()
            .map(|(p, c)| format!("{}={}", p, c))
            .collect::<Vec<_>>()
            .join(", ");
        vec![
            ("Scraped", self.scraped.to_string()),
            ("Excluded", self.excluded.to_string()),
            ("Inserted", self.inserted.to_string()),
            ("Notified", format!("{} of {}", self.notified, self.unsent)),
            ("Errors", self.errors.len().to_string()),
            ("Total jobs in store", self.stats.total.to_string()),
            ("Unsent jobs", self.stats.unsent.to_string()),
            ("Filtered jobs", self.stats.filtered.to_string()),
            ("By platform", platforms),
        ]
    }
}

/// Run every enabled source through the whole pipeline.
///
/// Adapter failures only show up in `errors`; store failures abort the run.
/// A failed notification leaves the backlog unsent for the next run.
pub async fn run_pipeline(
    config: &Config,
    sources: &mut [Box<dyn JobSource>],
    store: &mut JobStore,
    notifier: &dyn Notifier,
    test_mode: bool,
) -> Result<PipelineSummary> {
    report::header(if test_mode {
        "Job pipeline (test mode)"
    } else {
        "Job pipeline"
    });

    report::step(1, TOTAL_STEPS, "Scraping");
    let scraped = run_sources(sources).await;
    let mut summary = PipelineSummary {
        scraped: scraped.jobs.len(),
        errors: scraped.errors,
        ..PipelineSummary::default()
    };

    if scraped.jobs.is_empty() {
        log::warn!("No jobs scraped, sending error notification");
        deliver(notifier, &Digest::errors_only(summary.errors.clone())).await;
        summary.stats = store.stats()?;
        return Ok(summary);
    }

    report::step(2, TOTAL_STEPS, "Filtering");
    let mut jobs = scraped.jobs;
    summary.excluded = RelevanceFilter::new(&config.filtering).apply(&mut jobs);
    summary.excluded += ExperienceFilter::new(&config.filtering)?.apply(&mut jobs);

    report::step(3, TOTAL_STEPS, "Scoring");
    JobScorer::new(&config.scoring, &config.filtering).score(&mut jobs);

    report::step(4, TOTAL_STEPS, "Storing");
    report::sub_item(&format!(
        "Valid jobs after filtering: {}",
        jobs.iter().filter(|j| !j.filtered_out).count()
    ));
    summary.inserted = store.insert(&jobs)?;

    report::step(5, TOTAL_STEPS, "Notifying");
    let unsent = store.unsent()?;
    summary.unsent = unsent.len();

    if unsent.is_empty() && summary.errors.is_empty() {
        log::info!("No new jobs to send");
    } else {
        let limit = digest_limit(config, test_mode);
        let top = unsent.iter().take(limit).map(|j| j.record.clone()).collect();
        let digest = Digest::new(top, summary.errors.clone(), unsent.len());
        summary.notified = digest.jobs.len();
        report::sub_item(&format!(
            "Digest: top {} of {} unsent jobs",
            summary.notified, summary.unsent
        ));

        summary.delivered = deliver(notifier, &digest).await;
        if summary.delivered {
            // The whole backlog counts as considered, not only the digest.
            let hashes: Vec<String> = unsent.into_iter().map(|j| j.identity_hash).collect();
            summary.marked_sent = store.mark_sent(&hashes)?;
        }
    }

    report::step(6, TOTAL_STEPS, "Cleanup");
    summary.purged = store.purge_older_than(config.database.retention_days)?;
    summary.stats = store.stats()?;

    report::summary("Final stats", &summary.items());
    Ok(summary)
}

fn digest_limit(config: &Config, test_mode: bool) -> usize {
    let notification = &config.notification;
    if test_mode {
        notification.daily_top_n.min(notification.test_top_n)
    } else {
        notification.daily_top_n
    }
}

async fn deliver(notifier: &dyn Notifier, digest: &Digest) -> bool {
    match notifier.send(digest).await {
        Ok(()) => true,
        Err(e) => {
            log::error!("Notification failed: {}", e);
            false
        }
    }
}
