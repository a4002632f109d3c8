// src/filters/relevance.rs

//! Keyword-based relevance filter.

use crate::models::{FilteringConfig, JobRecord};

/// Excludes unrelated jobs and roles that are too senior.
///
/// Matching is a plain case-insensitive substring test.
pub struct RelevanceFilter {
    irrelevant: Vec<(String, String)>,
    too_senior: Vec<(String, String)>,
}

impl RelevanceFilter {
    pub fn new(config: &FilteringConfig) -> Self {
        Self {
            irrelevant: lowered(&config.irrelevant_keywords),
            too_senior: lowered(&config.hard_filter_keywords),
        }
    }

    /// Mark matching records; returns how many were newly excluded.
    pub fn apply(&self, jobs: &mut [JobRecord]) -> usize {
        log::info!("Running relevance filter on {} jobs", jobs.len());
        let mut excluded = 0;

        for job in jobs.iter_mut().filter(|job| !job.filtered_out) {
            if let Some(reason) = self.reason(job) {
                job.exclude(reason);
                excluded += 1;
            }
        }

        let remaining = jobs.iter().filter(|job| !job.filtered_out).count();
        log::info!(
            "Relevance filter excluded {} jobs, {} remaining",
            excluded,
            remaining
        );
        excluded
    }

    fn reason(&self, job: &JobRecord) -> Option<String> {
        let text = job.searchable_text();
        let irrelevant = self
            .irrelevant
            .iter()
            .find(|(_, kw)| text.contains(kw.as_str()));
        if let Some((keyword, _)) = irrelevant {
            return Some(format!("Irrelevant keyword: {}", keyword));
        }

        let title = job.title.to_lowercase();
        self.too_senior
            .iter()
            .find(|(_, kw)| title.contains(kw.as_str()))
            .map(|(keyword, _)| format!("Too senior role: {}", keyword))
    }
}

/// Keep the configured spelling for reasons next to the lowercased needle.
fn lowered(keywords: &[String]) -> Vec<(String, String)> {
    keywords
        .iter()
        .filter(|kw| !kw.is_empty())
        .map(|kw| (kw.clone(), kw.to_lowercase()))
        .collect()
}
