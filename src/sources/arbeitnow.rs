// src/sources/arbeitnow.rs

//! Arbeitnow job board API.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::{
    Collector, JobSource, SourceContext, UNKNOWN_COMPANY, UNKNOWN_TITLE, parse_items, pause,
    request_json, string_list,
};
use crate::error::Result;
use crate::http::HttpRequest;
use crate::models::{ArbeitnowConfig, JobRecord};
use crate::utils::date::date_from_timestamp;
use crate::utils::text::{clean_description, non_empty};
use crate::utils::valid_url;

const BASE_URL: &str = "https://www.arbeitnow.com/api/job-board-api";

#[derive(Deserialize)]
struct Page {
    #[serde(default, deserialize_with = "super::null_as_default")]
    data: Vec<Value>,
}

#[derive(Deserialize)]
struct Item {
    title: Option<String>,
    company_name: Option<String>,
    location: Option<String>,
    url: Option<String>,
    description: Option<String>,
    remote: Option<bool>,
    tags: Option<Value>,
    created_at: Option<i64>,
}

/// Single paginated listing, stopped early by an empty page.
pub struct Arbeitnow {
    config: ArbeitnowConfig,
    ctx: SourceContext,
    errors: Vec<String>,
}

impl Arbeitnow {
    pub const PLATFORM: &'static str = "arbeitnow";

    pub fn new(config: ArbeitnowConfig, ctx: SourceContext) -> Self {
        Self {
            config,
            ctx,
            errors: Vec::new(),
        }
    }
}

fn parse_item(item: Item) -> Option<JobRecord> {
    let url = valid_url(item.url.as_deref()?)?;

    let mut location = non_empty(item.location.as_deref())
        .unwrap_or("Germany")
        .to_string();
    if item.remote.unwrap_or(false) {
        location = format!("{} (Remote)", location);
    }

    let mut job = JobRecord::new(
        non_empty(item.title.as_deref()).unwrap_or(UNKNOWN_TITLE),
        non_empty(item.company_name.as_deref()).unwrap_or(UNKNOWN_COMPANY),
        location,
        url,
        Arbeitnow::PLATFORM,
    );
    job.description = item.description.as_deref().and_then(clean_description);
    job.tags = string_list(item.tags.as_ref());
    job.posted_date = item.created_at.and_then(date_from_timestamp);
    Some(job)
}

#[async_trait]
impl JobSource for Arbeitnow {
    fn platform(&self) -> &'static str {
        Self::PLATFORM
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    async fn fetch(&mut self) -> Result<Vec<JobRecord>> {
        self.errors.clear();
        let mut collector = Collector::new(self.ctx.identity);

        for page in 1..=self.config.max_pages {
            let request = HttpRequest::get(BASE_URL).query("page", page);
            let label = format!("page {}", page);
            let Some(body) =
                request_json::<Page>(&self.ctx.client, &request, &label, &mut self.errors).await
            else {
                break;
            };

            let jobs = parse_items(Self::PLATFORM, body.data, parse_item);
            if jobs.is_empty() {
                break;
            }
            collector.extend(jobs);
            pause(self.config.delay_ms).await;
        }

        Ok(collector.into_jobs())
    }

    fn errors(&self) -> &[String] {
        &self.errors
    }
}
