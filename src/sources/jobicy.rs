// src/sources/jobicy.rs

//! Jobicy remote jobs API.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::{
    Collector, JobSource, SourceContext, UNKNOWN_COMPANY, UNKNOWN_TITLE, parse_items, pause,
    positive_amount, request_json, string_list,
};
use crate::error::Result;
use crate::http::HttpRequest;
use crate::models::{JobRecord, JobicyConfig};
use crate::utils::date::normalize_date;
use crate::utils::text::{clean_description, non_empty};
use crate::utils::valid_url;

const BASE_URL: &str = "https://jobicy.com/api/v2/remote-jobs";

#[derive(Deserialize)]
struct Page {
    #[serde(default, deserialize_with = "super::null_as_default")]
    jobs: Vec<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Item {
    job_title: Option<String>,
    company_name: Option<String>,
    job_geo: Option<String>,
    url: Option<String>,
    job_description: Option<String>,
    annual_salary_min: Option<Value>,
    annual_salary_max: Option<Value>,
    salary_currency: Option<String>,
    pub_date: Option<String>,
    job_industry: Option<Value>,
}

pub struct Jobicy {
    config: JobicyConfig,
    ctx: SourceContext,
    errors: Vec<String>,
}

impl Jobicy {
    pub const PLATFORM: &'static str = "jobicy";

    pub fn new(config: JobicyConfig, ctx: SourceContext) -> Self {
        Self {
            config,
            ctx,
            errors: Vec::new(),
        }
    }
}

fn parse_item(item: Item) -> Option<JobRecord> {
    let url = valid_url(item.url.as_deref()?)?;

    let salary_min = positive_amount(item.annual_salary_min.as_ref());
    let salary_max = positive_amount(item.annual_salary_max.as_ref());
    let currency = salary_min.map(|_| {
        non_empty(item.salary_currency.as_deref())
            .unwrap_or("USD")
            .to_string()
    });

    let mut job = JobRecord::new(
        non_empty(item.job_title.as_deref()).unwrap_or(UNKNOWN_TITLE),
        non_empty(item.company_name.as_deref()).unwrap_or(UNKNOWN_COMPANY),
        non_empty(item.job_geo.as_deref()).unwrap_or("Remote"),
        url,
        Jobicy::PLATFORM,
    )
    .with_salary(salary_min, salary_max, currency);
    job.description = item.job_description.as_deref().and_then(clean_description);
    job.tags = string_list(item.job_industry.as_ref());
    job.posted_date = item.pub_date.as_deref().and_then(normalize_date);
    Some(job)
}

#[async_trait]
impl JobSource for Jobicy {
    fn platform(&self) -> &'static str {
        Self::PLATFORM
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    async fn fetch(&mut self) -> Result<Vec<JobRecord>> {
        self.errors.clear();
        let mut collector = Collector::new(self.ctx.identity);

        for tag in &self.config.tags {
            let request = HttpRequest::get(BASE_URL)
                .query("count", self.config.results_per_tag)
                .query("tag", tag);
            let label = format!("tag '{}'", tag);

            if let Some(page) =
                request_json::<Page>(&self.ctx.client, &request, &label, &mut self.errors).await
            {
                collector.extend(parse_items(Self::PLATFORM, page.jobs, parse_item));
            }

            pause(self.config.delay_ms).await;
        }

        Ok(collector.into_jobs())
    }

    fn errors(&self) -> &[String] {
        &self.errors
    }
}
