// src/sources/remoteok.rs

//! RemoteOK public API.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::{
    Collector, JobSource, SourceContext, UNKNOWN_COMPANY, UNKNOWN_TITLE, identifier,
    parse_items, pause, positive_amount, request_json, string_list,
};
use crate::error::Result;
use crate::http::HttpRequest;
use crate::models::{JobRecord, RemoteOkConfig};
use crate::utils::date::normalize_date;
use crate::utils::text::{clean_description, non_empty};
use crate::utils::{join_id, valid_url};

const BASE_URL: &str = "https://remoteok.com/api";
const POSTING_URL: &str = "https://remoteok.com/remote-jobs/";
/// The API refuses obvious bots.
const BROWSER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

#[derive(Deserialize)]
struct Item {
    id: Option<Value>,
    position: Option<String>,
    company: Option<String>,
    location: Option<String>,
    url: Option<String>,
    description: Option<String>,
    tags: Option<Value>,
    salary_min: Option<Value>,
    salary_max: Option<Value>,
    salary_currency: Option<String>,
    date: Option<String>,
}

/// One call per configured tag.
pub struct RemoteOk {
    config: RemoteOkConfig,
    ctx: SourceContext,
    errors: Vec<String>,
}

impl RemoteOk {
    pub const PLATFORM: &'static str = "remoteok";

    pub fn new(config: RemoteOkConfig, ctx: SourceContext) -> Self {
        Self {
            config,
            ctx,
            errors: Vec::new(),
        }
    }
}

fn parse_item(item: Item) -> Option<JobRecord> {
    let url = item
        .url
        .as_deref()
        .and_then(valid_url)
        .or_else(|| identifier(item.id.as_ref()).and_then(|id| join_id(POSTING_URL, &id)))?;

    let location = match item.location.as_deref() {
        None => "Remote".to_string(),
        Some(loc) if loc.trim().is_empty() => "Worldwide Remote".to_string(),
        Some(loc) => loc.trim().to_string(),
    };

    let salary_min = positive_amount(item.salary_min.as_ref());
    let salary_max = positive_amount(item.salary_max.as_ref());
    let currency = salary_min.map(|_| {
        non_empty(item.salary_currency.as_deref())
            .unwrap_or("USD")
            .to_string()
    });

    let mut job = JobRecord::new(
        non_empty(item.position.as_deref()).unwrap_or(UNKNOWN_TITLE),
        non_empty(item.company.as_deref()).unwrap_or(UNKNOWN_COMPANY),
        location,
        url,
        RemoteOk::PLATFORM,
    )
    .with_salary(salary_min, salary_max, currency);
    job.description = item.description.as_deref().and_then(clean_description);
    job.tags = string_list(item.tags.as_ref());
    job.posted_date = item.date.as_deref().and_then(normalize_date);
    Some(job)
}

#[async_trait]
impl JobSource for RemoteOk {
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
                .header("User-Agent", BROWSER_AGENT)
                .query("tag", tag);
            let label = format!("tag '{}'", tag);

            if let Some(items) =
                request_json::<Vec<Value>>(&self.ctx.client, &request, &label, &mut self.errors)
                    .await
            {
                // First element is the API's legal notice
                let items = items.into_iter().skip(1).collect();
                collector.extend(parse_items(Self::PLATFORM, items, parse_item));
            }

            pause(self.config.delay_ms).await;
        }

        Ok(collector.into_jobs())
    }

    fn errors(&self) -> &[String] {
        &self.errors
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::http::HttpResponse;
    use crate::http::testing::ScriptedTransport;
    use crate::models::IdentityStrategy;

    fn item(value: Value) -> Item {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_parse_item_salary_defaults_to_usd() {
        let job = parse_item(item(json!({
            "id": "123456",
            "position": "Senior Data Engineer",
            "company": "Remote Co",
            "location": "",
            "url": "https://remoteok.com/remote-jobs/123456",
            "salary_min": 90000,
            "salary_max": 120000,
            "tags": ["python", "data"],
            "date": "2026-02-20T12:00:00+00:00"
        })))
        .unwrap();

        assert_eq!(job.location, "Worldwide Remote");
        assert_eq!(job.salary_currency.as_deref(), Some("USD"));
        assert_eq!(job.salary_text.as_deref(), Some("USD 90,000 - 120,000"));
        assert_eq!(job.posted_date.as_deref(), Some("2026-02-20"));
    }

    #[test]
    fn test_parse_item_without_salary() {
        let job = parse_item(item(json!({
            "position": "Data Analyst",
            "company": "X",
            "url": "https://remoteok.com/remote-jobs/9",
            "salary_min": 0
        })))
        .unwrap();
        assert_eq!(job.location, "Remote");
        assert_eq!(job.salary_min, None);
        assert_eq!(job.salary_currency, None);
        assert_eq!(job.salary_text, None);
    }

    #[test]
    fn test_parse_item_url_from_id() {
        let job = parse_item(item(json!({"id": 77, "position": "ML Engineer", "company": "Y"})))
            .unwrap();
        assert_eq!(job.url, "https://remoteok.com/remote-jobs/77");
        assert!(parse_item(item(json!({"position": "ML Engineer"}))).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_skips_legal_notice() {
        let body = json!([
            {"legal": "API terms of service"},
            {"id": "1", "position": "Data Scientist", "company": "A", "location": "Europe", "url": "https://remoteok.com/remote-jobs/1"}
        ]);
        let (transport, client) =
            ScriptedTransport::with_fallback(HttpResponse::new(200, body.to_string()))
                .into_client();
        let config = RemoteOkConfig {
            tags: vec!["data".to_string(), "python".to_string()],
            ..RemoteOkConfig::default()
        };
        let mut source =
            RemoteOk::new(config, SourceContext::new(client, IdentityStrategy::default()));

        let jobs = source.fetch().await.unwrap();

        // Same posting under both tags
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].title, "Data Scientist");
        assert_eq!(transport.request_count(), 2);
        assert!(
            transport.requests()[0]
                .headers
                .iter()
                .any(|(k, _)| k == "User-Agent")
        );
    }
}
