// src/sources/mod.rs

//! Job source adapters.
//!
//! Each adapter turns one upstream API or feed into [`JobRecord`]s. Adapters
//! run sequentially and throttle themselves; failures are collected as error
//! strings and never abort the run.

mod adzuna;
mod arbeitnow;
mod bundesagentur;
mod jobicy;
mod remoteok;
mod themuse;
mod weworkremotely;

use std::any::Any;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::Result;
use crate::http::{HttpRequest, ResilientClient};
use crate::models::{Config, IdentityStrategy, JobRecord};

pub use adzuna::{Adzuna, AdzunaCredentials};
pub use arbeitnow::Arbeitnow;
pub use bundesagentur::Bundesagentur;
pub use jobicy::Jobicy;
pub use remoteok::RemoteOk;
pub use themuse::TheMuse;
pub use weworkremotely::WeWorkRemotely;

/// Platform identifiers in run order.
pub const SOURCE_NAMES: [&str; 7] = [
    Bundesagentur::PLATFORM,
    Arbeitnow::PLATFORM,
    RemoteOk::PLATFORM,
    Jobicy::PLATFORM,
    TheMuse::PLATFORM,
    WeWorkRemotely::PLATFORM,
    Adzuna::PLATFORM,
];

pub(crate) const UNKNOWN_TITLE: &str = "Unknown Title";
pub(crate) const UNKNOWN_COMPANY: &str = "Unknown Company";

/// Shared handles every adapter needs.
#[derive(Clone)]
pub struct SourceContext {
    pub client: ResilientClient,
    pub identity: IdentityStrategy,
}

impl SourceContext {
    pub fn new(client: ResilientClient, identity: IdentityStrategy) -> Self {
        Self { client, identity }
    }
}

/// How an adapter invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceStatus {
    /// Skipped: disabled or missing credentials
    Disabled,
    Completed,
    /// Returned records but some upstream calls failed
    Degraded,
    /// `fetch` returned an error or panicked; no records
    Failed,
}

/// Outcome of [`JobSource::safe_fetch`].
#[derive(Debug, Clone)]
pub struct SourceReport {
    pub platform: String,
    pub jobs: Vec<JobRecord>,
    /// Each entry is prefixed with the platform name
    pub errors: Vec<String>,
    pub status: SourceStatus,
}

impl SourceReport {
    fn disabled(platform: &str) -> Self {
        Self {
            platform: platform.to_string(),
            jobs: Vec::new(),
            errors: Vec::new(),
            status: SourceStatus::Disabled,
        }
    }
}

/// Common contract of all job sources.
#[async_trait]
pub trait JobSource: Send {
    /// Stable identifier stored on every record.
    fn platform(&self) -> &'static str;

    /// Whether the adapter should run at all.
    fn is_enabled(&self) -> bool;

    /// Fetch, parse and deduplicate postings.
    ///
    /// Individual call failures are pushed to [`errors`](Self::errors) rather
    /// than returned.
    async fn fetch(&mut self) -> Result<Vec<JobRecord>>;

    /// Errors accumulated by the last `fetch`.
    fn errors(&self) -> &[String];

    /// Run `fetch`, turning every failure mode into a report.
    async fn safe_fetch(&mut self) -> SourceReport {
        let platform = self.platform();
        if !self.is_enabled() {
            log::info!("{} is disabled, skipping", platform);
            return SourceReport::disabled(platform);
        }

        let result = AssertUnwindSafe(self.fetch()).catch_unwind().await;

        let mut errors: Vec<String> = self
            .errors()
            .iter()
            .map(|e| format!("{}: {}", platform, e))
            .collect();

        let (jobs, crashed) = match result {
            Ok(Ok(jobs)) => (jobs, false),
            Ok(Err(e)) => {
                log::error!("{} failed: {}", platform, e);
                errors.push(format!("{}: {}", platform, e));
                (Vec::new(), true)
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                log::error!("{} crashed: {}", platform, message);
                errors.push(format!("{}: crashed: {}", platform, message));
                (Vec::new(), true)
            }
        };

        let status = if crashed {
            SourceStatus::Failed
        } else if errors.is_empty() {
            SourceStatus::Completed
        } else {
            SourceStatus::Degraded
        };

        log::info!(
            "{}: {} unique jobs, {} errors",
            platform,
            jobs.len(),
            errors.len()
        );

        SourceReport {
            platform: platform.to_string(),
            jobs,
            errors,
            status,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Instantiate every adapter from configuration.
pub fn build_sources(config: &Config, ctx: &SourceContext) -> Vec<Box<dyn JobSource>> {
    SOURCE_NAMES
        .iter()
        .filter_map(|name| source_by_name(name, config, ctx))
        .collect()
}

/// Instantiate a single adapter by platform identifier.
pub fn source_by_name(
    name: &str,
    config: &Config,
    ctx: &SourceContext,
) -> Option<Box<dyn JobSource>> {
    let sources = &config.sources;
    let source: Box<dyn JobSource> = match name {
        Bundesagentur::PLATFORM => Box::new(Bundesagentur::new(
            sources.bundesagentur.clone(),
            ctx.clone(),
        )),
        Arbeitnow::PLATFORM => Box::new(Arbeitnow::new(sources.arbeitnow.clone(), ctx.clone())),
        RemoteOk::PLATFORM => Box::new(RemoteOk::new(sources.remoteok.clone(), ctx.clone())),
        Jobicy::PLATFORM => Box::new(Jobicy::new(sources.jobicy.clone(), ctx.clone())),
        TheMuse::PLATFORM => Box::new(TheMuse::new(sources.themuse.clone(), ctx.clone())),
        WeWorkRemotely::PLATFORM => Box::new(WeWorkRemotely::new(
            sources.weworkremotely.clone(),
            ctx.clone(),
        )),
        Adzuna::PLATFORM => Box::new(Adzuna::new(
            sources.adzuna.clone(),
            ctx.clone(),
            AdzunaCredentials::from_env(),
        )),
        _ => return None,
    };
    Some(source)
}

// --- Helpers shared by adapters ---

/// Within-call deduplication by identity hash.
pub(crate) struct Collector {
    identity: IdentityStrategy,
    seen: HashSet<String>,
    jobs: Vec<JobRecord>,
}

impl Collector {
    pub fn new(identity: IdentityStrategy) -> Self {
        Self {
            identity,
            seen: HashSet::new(),
            jobs: Vec::new(),
        }
    }

    /// Add records not seen before; returns how many were new.
    pub fn extend(&mut self, batch: Vec<JobRecord>) -> usize {
        let before = self.jobs.len();
        for job in batch {
            if self.seen.insert(self.identity.hash(&job)) {
                self.jobs.push(job);
            }
        }
        self.jobs.len() - before
    }

    pub fn jobs_mut(&mut self) -> &mut [JobRecord] {
        &mut self.jobs
    }

    pub fn into_jobs(self) -> Vec<JobRecord> {
        self.jobs
    }
}

/// Send a request and decode its JSON body.
///
/// Failures are recorded in `errors` under `label` and yield `None`.
pub(crate) async fn request_json<T: DeserializeOwned>(
    client: &ResilientClient,
    request: &HttpRequest,
    label: &str,
    errors: &mut Vec<String>,
) -> Option<T> {
    let outcome = client.execute(request).await;
    if let Some(failure) = outcome.failure() {
        errors.push(format!("{}: {}", label, failure));
        return None;
    }
    let response = outcome.into_response()?;
    match response.json::<T>() {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!("Undecodable response for {}: {}", label, e);
            errors.push(format!("{}: {}", label, e));
            None
        }
    }
}

/// Decode raw items one at a time, skipping the ones that do not fit.
pub(crate) fn parse_items<T, F>(platform: &str, items: Vec<Value>, parse: F) -> Vec<JobRecord>
where
    T: DeserializeOwned,
    F: Fn(T) -> Option<JobRecord>,
{
    let mut jobs = Vec::with_capacity(items.len());
    for raw in items {
        match serde_json::from_value::<T>(raw) {
            Ok(item) => match parse(item) {
                Some(job) => jobs.push(job),
                None => log::debug!("{}: skipped unusable item", platform),
            },
            Err(e) => log::debug!("{}: failed to parse item: {}", platform, e),
        }
    }
    jobs
}

/// Field deserializer treating an explicit JSON `null` like a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Inter-call throttle.
pub(crate) async fn pause(delay_ms: u64) {
    if delay_ms > 0 {
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }
}

/// Integer from a JSON number or numeric string; zero and negatives count as absent.
pub(crate) fn positive_amount(value: Option<&Value>) -> Option<i64> {
    let amount = match value? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
        }
        _ => None,
    }?;
    (amount > 0).then_some(amount)
}

/// A string or array of strings as a list.
pub(crate) fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// A string or number identifier as text.
pub(crate) fn identifier(value: Option<&Value>) -> Option<String> {
    let id = match value? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!id.is_empty()).then_some(id)
}
