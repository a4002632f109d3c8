// src/filters/experience.rs

//! Required-experience extraction and filtering.

use regex::Regex;

use crate::error::Result;
use crate::models::{FilteringConfig, JobRecord};

/// Tried in order; the first match wins. Capture group 1 holds the years.
const EXPERIENCE_PATTERNS: [&str; 6] = [
    r"(\d+)\+?\s*(?:years?|jahre?)\s*(?:of\s*)?(?:experience|erfahrung|berufserfahrung)",
    r"(?:experience|erfahrung|berufserfahrung)\s*(?:of\s*)?(\d+)\+?\s*(?:years?|jahre?)",
    r"(\d+)\s*-\s*\d+\s*(?:years?|jahre?)",
    r"(?:minimum|mindestens|min\.?)\s*(\d+)\s*(?:years?|jahre?)",
    r"(\d+)\+\s*(?:years?|jahre?)",
    r"(?:at least|wenigstens)\s*(\d+)\s*(?:years?|jahre?)",
];

/// Parses required years and excludes roles above the hard limit.
pub struct ExperienceFilter {
    patterns: Vec<Regex>,
    hard_limit: i64,
    penalty_threshold: i64,
}

impl ExperienceFilter {
    pub fn new(config: &FilteringConfig) -> Result<Self> {
        let patterns = EXPERIENCE_PATTERNS
            .iter()
            .map(|p| Regex::new(&format!("(?i){}", p)))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self {
            patterns,
            hard_limit: config.hard_filter_experience_years,
            penalty_threshold: config.experience_penalty_threshold,
        })
    }

    /// Years of experience a text asks for, if any phrasing is recognized.
    pub fn parse_years(&self, text: &str) -> Option<i64> {
        let text = text.to_lowercase();
        self.patterns.iter().find_map(|re| {
            re.captures(&text)
                .and_then(|caps| caps.get(1))
                .and_then(|m| m.as_str().parse().ok())
        })
    }

    /// Record required years on unfiltered jobs and exclude those at or above
    /// the hard limit. Returns how many were newly excluded.
    pub fn apply(&self, jobs: &mut [JobRecord]) -> usize {
        log::info!("Running experience filter on {} jobs", jobs.len());
        let mut excluded = 0;
        let mut penalized = 0;

        for job in jobs.iter_mut().filter(|job| !job.filtered_out) {
            let years = self.parse_years(&job.searchable_text());
            job.years_experience_required = years;

            match years {
                Some(y) if y >= self.hard_limit => {
                    job.exclude(format!("Requires {}+ years experience", y));
                    excluded += 1;
                }
                Some(y) if y > self.penalty_threshold => penalized += 1,
                _ => {}
            }
        }

        log::info!(
            "Experience filter excluded {} jobs ({}+ years), {} will be penalized",
            excluded,
            self.hard_limit,
            penalized
        );
        excluded
    }
}

/// Points taken off the money score for a demanding but allowed requirement.
pub fn experience_penalty(job: &JobRecord, config: &FilteringConfig) -> f64 {
    match job.years_experience_required {
        Some(years) if years > config.experience_penalty_threshold => {
            config.experience_penalty_points
        }
        _ => 0.0,
    }
}
