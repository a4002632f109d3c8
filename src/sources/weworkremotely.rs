// src/sources/weworkremotely.rs

//! We Work Remotely RSS feeds.

use async_trait::async_trait;
use quick_xml::Reader;
use quick_xml::events::Event;
use serde::Deserialize;

use super::{Collector, JobSource, SourceContext, UNKNOWN_COMPANY, UNKNOWN_TITLE, pause};
use crate::error::{AppError, Result};
use crate::http::HttpRequest;
use crate::models::{JobRecord, WeWorkRemotelyConfig};
use crate::utils::date::normalize_date;
use crate::utils::text::{clean_description, non_empty};
use crate::utils::valid_url;

const FEED_ACCEPT: &str = "application/rss+xml, application/xml, text/xml";

/// Region words looked for in title and description, in priority order.
const REGION_HINTS: &[&str] = &[
    "Europe",
    "EU",
    "EMEA",
    "US",
    "USA",
    "Americas",
    "APAC",
    "Germany",
    "UK",
    "Worldwide",
    "Global",
];

#[derive(Deserialize)]
struct FeedItem {
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    #[serde(rename = "category", default)]
    categories: Vec<String>,
}

/// Every posting on the board is remote; feeds are fetched one by one.
pub struct WeWorkRemotely {
    config: WeWorkRemotelyConfig,
    ctx: SourceContext,
    errors: Vec<String>,
}

impl WeWorkRemotely {
    pub const PLATFORM: &'static str = "weworkremotely";

    pub fn new(config: WeWorkRemotelyConfig, ctx: SourceContext) -> Self {
        Self {
            config,
            ctx,
            errors: Vec::new(),
        }
    }

    /// Fetch and parse one feed; the error is a human-readable reason.
    async fn fetch_feed(&self, feed_url: &str) -> std::result::Result<Vec<JobRecord>, String> {
        let request = HttpRequest::get(feed_url).header("Accept", FEED_ACCEPT);
        let outcome = self.ctx.client.execute(&request).await;
        if let Some(failure) = outcome.failure() {
            return Err(failure);
        }
        let Some(response) = outcome.into_response() else {
            return Ok(Vec::new());
        };
        parse_feed(&response.body).map_err(|e| e.to_string())
    }
}

/// Parse every `<item>` of a feed on its own.
///
/// A malformed item is skipped; only a broken document or a missing
/// `<channel>` fails the whole feed.
fn parse_feed(xml: &str) -> Result<Vec<JobRecord>> {
    let mut reader = Reader::from_str(xml);
    let mut has_channel = false;
    let mut jobs = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.local_name().as_ref() == b"channel" => has_channel = true,
            Event::Start(e) if e.local_name().as_ref() == b"item" => {
                let span = reader.read_to_end(e.name())?;
                let inner = &xml[span.start as usize..span.end as usize];
                let fragment = format!("<item>{}</item>", inner);
                match quick_xml::de::from_str::<FeedItem>(&fragment) {
                    Ok(item) => match parse_item(item) {
                        Some(job) => jobs.push(job),
                        None => log::debug!("{}: skipped unusable item", WeWorkRemotely::PLATFORM),
                    },
                    Err(e) => {
                        log::debug!("{}: failed to parse item: {}", WeWorkRemotely::PLATFORM, e)
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !has_channel {
        return Err(AppError::validation("response is not an RSS feed"));
    }
    Ok(jobs)
}

fn parse_item(item: FeedItem) -> Option<JobRecord> {
    let url = valid_url(item.link.as_deref()?)?;

    // Titles read "Company: Job Title"
    let raw_title = non_empty(item.title.as_deref()).unwrap_or(UNKNOWN_TITLE);
    let (company, title) = match raw_title.split_once(':') {
        Some((company, title)) if !company.trim().is_empty() && !title.trim().is_empty() => {
            (company.trim(), title.trim())
        }
        _ => (UNKNOWN_COMPANY, raw_title),
    };

    let description = item.description.as_deref().and_then(clean_description);
    let location = match region_hint(title, description.as_deref()) {
        Some(region) => format!("Remote ({})", region),
        None => "Remote".to_string(),
    };

    let mut job = JobRecord::new(title, company, location, url, WeWorkRemotely::PLATFORM);
    job.description = description;
    job.posted_date = item.pub_date.as_deref().and_then(normalize_date);
    job.tags = item
        .categories
        .iter()
        .filter_map(|c| non_empty(Some(c.as_str())))
        .map(str::to_string)
        .collect();
    Some(job)
}

/// First region hint appearing as a whole word in title or description.
fn region_hint(title: &str, description: Option<&str>) -> Option<&'static str> {
    let text = format!("{} {}", title, description.unwrap_or("")).to_lowercase();
    let words: Vec<&str> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    REGION_HINTS
        .iter()
        .copied()
        .find(|hint| words.contains(&hint.to_lowercase().as_str()))
}

#[async_trait]
impl JobSource for WeWorkRemotely {
    fn platform(&self) -> &'static str {
        Self::PLATFORM
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    async fn fetch(&mut self) -> Result<Vec<JobRecord>> {
        self.errors.clear();
        let mut collector = Collector::new(self.ctx.identity);

        for feed_url in &self.config.feeds {
            match self.fetch_feed(feed_url).await {
                Ok(jobs) => {
                    collector.extend(jobs);
                }
                Err(e) => {
                    log::warn!("Feed {} failed: {}", feed_url, e);
                    self.errors.push(format!("feed {}: {}", feed_url, e));
                }
            }
            pause(self.config.delay_ms).await;
        }

        Ok(collector.into_jobs())
    }

    fn errors(&self) -> &[String] {
        &self.errors
    }
}
