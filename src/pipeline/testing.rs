//! In-memory sources and notifiers for pipeline tests.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::JobRecord;
use crate::notify::{Digest, Notifier};
use crate::sources::JobSource;

/// Returns a fixed batch of records, or fails.
pub struct StaticSource {
    platform: &'static str,
    enabled: bool,
    fail: bool,
    jobs: Vec<JobRecord>,
    errors: Vec<String>,
}

impl StaticSource {
    /// Records built from `(title, location)` pairs.
    pub fn new(platform: &'static str, postings: Vec<(&str, &str)>) -> Self {
        let jobs = postings
            .into_iter()
            .enumerate()
            .map(|(i, (title, location))| {
                let url = format!("https://{}.example/jobs/{}", platform, i);
                JobRecord::new(title, "Acme", location, url, platform)
            })
            .collect();
        Self::with_jobs(platform, jobs)
    }

    pub fn with_jobs(platform: &'static str, jobs: Vec<JobRecord>) -> Self {
        Self {
            platform,
            enabled: true,
            fail: false,
            jobs,
            errors: Vec::new(),
        }
    }

    pub fn failing(platform: &'static str) -> Self {
        Self {
            fail: true,
            ..Self::with_jobs(platform, Vec::new())
        }
    }

    pub fn disabled(platform: &'static str) -> Self {
        Self {
            enabled: false,
            ..Self::with_jobs(platform, Vec::new())
        }
    }
}

#[async_trait]
impl JobSource for StaticSource {
    fn platform(&self) -> &'static str {
        self.platform
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    async fn fetch(&mut self) -> Result<Vec<JobRecord>> {
        if self.fail {
            return Err(AppError::source(self.platform, "upstream down"));
        }
        Ok(self.jobs.clone())
    }

    fn errors(&self) -> &[String] {
        &self.errors
    }
}

/// Keeps every digest it is handed.
#[derive(Default)]
pub struct RecordingNotifier {
    fail: bool,
    digests: Mutex<Vec<Digest>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects every delivery.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn digests(&self) -> Vec<Digest> {
        self.digests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, digest: &Digest) -> Result<()> {
        self.digests.lock().unwrap().push(digest.clone());
        if self.fail {
            return Err(AppError::notify("channel unavailable"));
        }
        Ok(())
    }
}
