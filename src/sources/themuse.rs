// src/sources/themuse.rs

//! The Muse public jobs API.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::{
    Collector, JobSource, SourceContext, UNKNOWN_COMPANY, UNKNOWN_TITLE, identifier,
    parse_items, pause, request_json,
};
use crate::error::Result;
use crate::http::HttpRequest;
use crate::models::{JobRecord, TheMuseConfig};
use crate::utils::date::normalize_date;
use crate::utils::text::{clean_description, non_empty};
use crate::utils::{join_id, valid_url};

const BASE_URL: &str = "https://www.themuse.com/api/public/jobs";
const POSTING_URL: &str = "https://www.themuse.com/jobs/";
const MAX_LOCATIONS: usize = 3;

#[derive(Deserialize)]
struct Page {
    #[serde(default, deserialize_with = "super::null_as_default")]
    results: Vec<Value>,
}

#[derive(Deserialize, Default)]
struct Named {
    name: Option<String>,
}

#[derive(Deserialize, Default)]
struct Refs {
    landing_page: Option<String>,
}

#[derive(Deserialize)]
struct Item {
    id: Option<Value>,
    name: Option<String>,
    #[serde(default, deserialize_with = "super::null_as_default")]
    company: Named,
    #[serde(default, deserialize_with = "super::null_as_default")]
    locations: Vec<Named>,
    contents: Option<String>,
    publication_date: Option<String>,
    #[serde(default, deserialize_with = "super::null_as_default")]
    categories: Vec<Named>,
    #[serde(default, deserialize_with = "super::null_as_default")]
    levels: Vec<Named>,
    #[serde(default, deserialize_with = "super::null_as_default")]
    refs: Refs,
}

fn names(items: &[Named]) -> impl Iterator<Item = &str> {
    items.iter().filter_map(|n| non_empty(n.name.as_deref()))
}

/// Category × page grid; pages are 0-based.
pub struct TheMuse {
    config: TheMuseConfig,
    ctx: SourceContext,
    errors: Vec<String>,
}

impl TheMuse {
    pub const PLATFORM: &'static str = "themuse";

    pub fn new(config: TheMuseConfig, ctx: SourceContext) -> Self {
        Self {
            config,
            ctx,
            errors: Vec::new(),
        }
    }
}

fn parse_item(item: Item) -> Option<JobRecord> {
    // Landing page first, then the id-based page; neither means no usable link
    let url = item
        .refs
        .landing_page
        .as_deref()
        .and_then(valid_url)
        .or_else(|| identifier(item.id.as_ref()).and_then(|id| join_id(POSTING_URL, &id)))?;

    let location_names: Vec<&str> = names(&item.locations).take(MAX_LOCATIONS).collect();
    let location = if location_names.is_empty() {
        "Remote".to_string()
    } else {
        location_names.join(", ")
    };

    let mut job = JobRecord::new(
        non_empty(item.name.as_deref()).unwrap_or(UNKNOWN_TITLE),
        non_empty(item.company.name.as_deref()).unwrap_or(UNKNOWN_COMPANY),
        location,
        url,
        TheMuse::PLATFORM,
    );
    job.description = item.contents.as_deref().and_then(clean_description);
    job.posted_date = item.publication_date.as_deref().and_then(normalize_date);
    job.tags = names(&item.categories)
        .chain(names(&item.levels))
        .map(str::to_string)
        .collect();
    Some(job)
}

#[async_trait]
impl JobSource for TheMuse {
    fn platform(&self) -> &'static str {
        Self::PLATFORM
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    async fn fetch(&mut self) -> Result<Vec<JobRecord>> {
        self.errors.clear();
        let mut collector = Collector::new(self.ctx.identity);

        for category in &self.config.categories {
            for page in 0..self.config.max_pages {
                let request = HttpRequest::get(BASE_URL)
                    .query("category", category)
                    .query("page", page);
                let label = format!("'{}' page {}", category, page);
                let Some(body) =
                    request_json::<Page>(&self.ctx.client, &request, &label, &mut self.errors)
                        .await
                else {
                    break;
                };

                let jobs = parse_items(Self::PLATFORM, body.results, parse_item);
                if jobs.is_empty() {
                    break;
                }
                collector.extend(jobs);
                pause(self.config.delay_ms).await;
            }
        }

        Ok(collector.into_jobs())
    }

    fn errors(&self) -> &[String] {
        &self.errors
    }
}
