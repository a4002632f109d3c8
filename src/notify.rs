// src/notify.rs

//! Digest delivery.
//!
//! A [`Notifier`] receives the ranked slice of the unsent backlog plus any
//! adapter errors. Message formatting and chunking belong to the channel;
//! [`LogNotifier`] writes the digest through the `log` facade.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::JobRecord;
use crate::utils::report;

/// One notification's worth of content.
#[derive(Debug, Clone, Default)]
pub struct Digest {
    /// Best unsent jobs, highest score first
    pub jobs: Vec<JobRecord>,
    /// Adapter errors from this run
    pub errors: Vec<String>,
    /// Size of the backlog the jobs were taken from
    pub total_unsent: usize,
}

impl Digest {
    pub fn new(jobs: Vec<JobRecord>, errors: Vec<String>, total_unsent: usize) -> Self {
        Self {
            jobs,
            errors,
            total_unsent,
        }
    }

    /// Only errors, e.g. when nothing was scraped.
    pub fn errors_only(errors: Vec<String>) -> Self {
        Self {
            errors,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty() && self.errors.is_empty()
    }

    /// Headline counts over the jobs in the digest.
    pub fn summary_items(&self) -> Vec<(&'static str, String)> {
        let count_where = |pred: fn(&JobRecord) -> bool| self.jobs.iter().filter(|j| pred(j)).count();

        let mut items = vec![
            ("Jobs", format!("{} of {} unsent", self.jobs.len(), self.total_unsent)),
            ("ML/AI focused", count_where(|j| j.passion_score >= 5.0).to_string()),
            ("Preferred location", count_where(|j| j.location_score >= 10.0).to_string()),
            ("In Germany", count_where(|j| j.location_score >= 6.0).to_string()),
            ("With salary", count_where(|j| j.salary_min.is_some()).to_string()),
        ];

        if !self.jobs.is_empty() {
            let top = self
                .jobs
                .iter()
                .map(|j| j.total_score)
                .fold(f64::MIN, f64::max);
            let average =
                self.jobs.iter().map(|j| j.total_score).sum::<f64>() / self.jobs.len() as f64;
            items.push(("Top score", format!("{:.1}/10", top)));
            items.push(("Average score", format!("{:.1}/10", average)));
        }

        let mut platforms: BTreeMap<&str, usize> = BTreeMap::new();
        for job in &self.jobs {
            *platforms.entry(job.platform.as_str()).or_default() += 1;
        }
        if !platforms.is_empty() {
            let sources = platforms
                .iter()
                .map(|(p, c)| format!("{} ({})", p, c))
                .collect::<Vec<_>>()
                .join(", ");
            items.push(("Sources", sources));
        }

        items
    }
}

/// A delivery channel for digests.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver the digest.
    ///
    /// `Ok` means the channel accepted it; the pipeline only marks the
    /// backlog as sent after a successful delivery.
    async fn send(&self, digest: &Digest) -> Result<()>;
}

/// Writes digests to the log.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, digest: &Digest) -> Result<()> {
        if digest.is_empty() {
            log::info!("No jobs to send");
            return Ok(());
        }

        if !digest.jobs.is_empty() {
            report::header(&format!("Job digest: {} new jobs", digest.jobs.len()));
            for (rank, job) in digest.jobs.iter().enumerate() {
                for line in job_card(rank + 1, job) {
                    log::info!("{}", line);
                }
            }
            report::summary("Digest", &digest.summary_items());
        }

        if !digest.errors.is_empty() {
            log::warn!("Scraping completed with {} errors:", digest.errors.len());
            for error in &digest.errors {
                log::warn!("    {}", error);
            }
        }

        Ok(())
    }
}

fn stars(score: f64) -> &'static str {
    if score >= 8.0 {
        "***"
    } else if score >= 6.0 {
        "**"
    } else if score >= 4.0 {
        "*"
    } else {
        ""
    }
}

/// Plain-text card for one job.
fn job_card(rank: usize, job: &JobRecord) -> Vec<String> {
    let mut lines = vec![
        format!("#{} [{:.1}/10] {} {}", rank, job.total_score, job.title, stars(job.total_score)),
        format!("    {} | {}", job.company, job.location),
    ];
    if let Some(salary) = &job.salary_text {
        lines.push(format!("    Salary: {}", salary));
    }
    if let Some(posted) = &job.posted_date {
        lines.push(format!("    Posted: {}", posted));
    }
    lines.push(format!("    {}", job.url));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(platform: &str, total: f64) -> JobRecord {
        let mut job = JobRecord::new("Data Scientist", "Acme", "Munich", "https://x/1", platform);
        job.total_score = total;
        job
    }

    #[test]
    fn test_empty_digest() {
        assert!(Digest::default().is_empty());
        assert!(!Digest::errors_only(vec!["remoteok: boom".to_string()]).is_empty());
    }

    #[test]
    fn test_summary_items() {
        let mut salaried = job("remoteok", 8.0);
        salaried.salary_min = Some(90_000);
        salaried.location_score = 10.0;
        let digest = Digest::new(vec![salaried, job("arbeitnow", 4.0)], Vec::new(), 12);

        let items: BTreeMap<_, _> = digest.summary_items().into_iter().collect();
        assert_eq!(items["Jobs"], "2 of 12 unsent");
        assert_eq!(items["With salary"], "1");
        assert_eq!(items["Preferred location"], "1");
        assert_eq!(items["Top score"], "8.0/10");
        assert_eq!(items["Average score"], "6.0/10");
        assert_eq!(items["Sources"], "arbeitnow (1), remoteok (1)");
    }

    #[test]
    fn test_job_card() {
        let record = job("remoteok", 8.5)
            .with_salary(Some(90_000), Some(120_000), Some("USD".to_string()));
        let card = job_card(1, &record);
        assert!(card[0].starts_with("#1 [8.5/10] Data Scientist ***"));
        assert!(card.iter().any(|l| l.contains("USD 90,000 - 120,000")));
        assert_eq!(card.last().map(String::as_str), Some("    https://x/1"));
    }

    #[tokio::test]
    async fn test_log_notifier_accepts_everything() {
        let notifier = LogNotifier::new();
        assert!(notifier.send(&Digest::default()).await.is_ok());
        let digest = Digest::new(vec![job("jobicy", 5.0)], vec!["jobicy: slow".to_string()], 1);
        assert!(notifier.send(&digest).await.is_ok());
    }
}
