// src/sources/adzuna.rs

//! Adzuna search API. Needs an application id and key.

use std::env;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::{
    Collector, JobSource, SourceContext, UNKNOWN_COMPANY, UNKNOWN_TITLE, parse_items, pause,
    positive_amount, request_json,
};
use crate::error::Result;
use crate::http::HttpRequest;
use crate::models::{AdzunaConfig, JobRecord};
use crate::utils::date::normalize_date;
use crate::utils::text::{clean_description, non_empty};
use crate::utils::valid_url;

const APP_ID_VAR: &str = "ADZUNA_APP_ID";
const APP_KEY_VAR: &str = "ADZUNA_APP_KEY";

/// Application credentials.
#[derive(Debug, Clone)]
pub struct AdzunaCredentials {
    pub app_id: String,
    pub app_key: String,
}

impl AdzunaCredentials {
    /// Read both values from the environment; `None` if either is missing or blank.
    pub fn from_env() -> Option<Self> {
        let app_id = env::var(APP_ID_VAR).ok().filter(|v| !v.trim().is_empty())?;
        let app_key = env::var(APP_KEY_VAR).ok().filter(|v| !v.trim().is_empty())?;
        Some(Self { app_id, app_key })
    }
}

#[derive(Deserialize)]
struct Page {
    #[serde(default, deserialize_with = "super::null_as_default")]
    results: Vec<Value>,
}

#[derive(Deserialize, Default)]
struct DisplayName {
    display_name: Option<String>,
}

#[derive(Deserialize, Default)]
struct Category {
    label: Option<String>,
}

#[derive(Deserialize)]
struct Item {
    title: Option<String>,
    #[serde(default, deserialize_with = "super::null_as_default")]
    company: DisplayName,
    #[serde(default, deserialize_with = "super::null_as_default")]
    location: DisplayName,
    redirect_url: Option<String>,
    description: Option<String>,
    salary_min: Option<Value>,
    salary_max: Option<Value>,
    created: Option<String>,
    #[serde(default, deserialize_with = "super::null_as_default")]
    category: Category,
}

/// Salary currency implied by the country endpoint.
fn country_currency(country: &str) -> &'static str {
    match country.to_ascii_lowercase().as_str() {
        "de" | "at" | "fr" | "nl" | "it" | "es" => "EUR",
        "gb" => "GBP",
        "ch" => "CHF",
        "ca" => "CAD",
        _ => "USD",
    }
}

/// Country × term × page grid.
pub struct Adzuna {
    config: AdzunaConfig,
    ctx: SourceContext,
    credentials: Option<AdzunaCredentials>,
    errors: Vec<String>,
}

impl Adzuna {
    pub const PLATFORM: &'static str = "adzuna";

    pub fn new(
        config: AdzunaConfig,
        ctx: SourceContext,
        credentials: Option<AdzunaCredentials>,
    ) -> Self {
        Self {
            config,
            ctx,
            credentials,
            errors: Vec::new(),
        }
    }

    fn search_url(country: &str, page: u32) -> String {
        format!(
            "https://api.adzuna.com/v1/api/jobs/{}/search/{}",
            country.to_ascii_lowercase(),
            page
        )
    }
}

fn parse_item(item: Item, country: &str) -> Option<JobRecord> {
    let url = valid_url(item.redirect_url.as_deref()?)?;
    let salary_min = positive_amount(item.salary_min.as_ref());
    let salary_max = positive_amount(item.salary_max.as_ref());

    let mut job = JobRecord::new(
        non_empty(item.title.as_deref()).unwrap_or(UNKNOWN_TITLE),
        non_empty(item.company.display_name.as_deref()).unwrap_or(UNKNOWN_COMPANY),
        non_empty(item.location.display_name.as_deref())
            .map(str::to_string)
            .unwrap_or_else(|| country.to_ascii_uppercase()),
        url,
        Adzuna::PLATFORM,
    )
    .with_salary(
        salary_min,
        salary_max,
        Some(country_currency(country).to_string()),
    );
    job.description = item.description.as_deref().and_then(clean_description);
    job.posted_date = item.created.as_deref().and_then(normalize_date);
    if let Some(label) = non_empty(item.category.label.as_deref()) {
        job.tags.push(label.to_string());
    }
    Some(job)
}

#[async_trait]
impl JobSource for Adzuna {
    fn platform(&self) -> &'static str {
        Self::PLATFORM
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled && self.credentials.is_some()
    }

    async fn fetch(&mut self) -> Result<Vec<JobRecord>> {
        self.errors.clear();
        let Some(credentials) = self.credentials.clone() else {
            log::info!(
                "{}: no API credentials ({} / {}), skipping",
                Self::PLATFORM,
                APP_ID_VAR,
                APP_KEY_VAR
            );
            return Ok(Vec::new());
        };
        let mut collector = Collector::new(self.ctx.identity);

        for country in &self.config.countries {
            for term in &self.config.search_terms {
                for page in 1..=self.config.max_pages {
                    let request = HttpRequest::get(Self::search_url(country, page))
                        .query("app_id", &credentials.app_id)
                        .query("app_key", &credentials.app_key)
                        .query("what", term)
                        .query("results_per_page", self.config.results_per_page)
                        .query("content-type", "application/json");
                    let label = format!("{}/{} p{}", country, term, page);
                    let Some(body) =
                        request_json::<Page>(&self.ctx.client, &request, &label, &mut self.errors)
                            .await
                    else {
                        break;
                    };

                    let jobs = parse_items(Self::PLATFORM, body.results, |item: Item| {
                        parse_item(item, country)
                    });
                    if jobs.is_empty() {
                        break;
                    }
                    collector.extend(jobs);
                    pause(self.config.delay_ms).await;
                }
            }
        }

        Ok(collector.into_jobs())
    }

    fn errors(&self) -> &[String] {
        &self.errors
    }
}
