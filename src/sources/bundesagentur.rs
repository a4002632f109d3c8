// src/sources/bundesagentur.rs

//! Federal employment agency (Bundesagentur für Arbeit) job search.

use std::collections::HashMap;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use serde_json::Value;

use super::{Collector, JobSource, SourceContext, pause, request_json};
use crate::error::Result;
use crate::http::HttpRequest;
use crate::models::{BundesagenturConfig, JobRecord};
use crate::utils::join_id;
use crate::utils::text::{clean_description, non_empty};

const SEARCH_URL: &str = "https://rest.arbeitsagentur.de/jobboerse/jobsuche-service/pc/v4/jobs";
const DETAIL_URL: &str =
    "https://rest.arbeitsagentur.de/jobboerse/jobsuche-service/pc/v4/jobdetails/";
const POSTING_URL: &str = "https://www.arbeitsagentur.de/jobsuche/jobdetail/";
const API_KEY: &str = "jobboerse-jobsuche";

/// Full-time positions only.
const OFFER_TYPE_FULL_TIME: u8 = 1;

#[derive(Deserialize)]
struct SearchPage {
    #[serde(default, deserialize_with = "super::null_as_default")]
    stellenangebote: Vec<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Listing {
    titel: Option<String>,
    arbeitgeber: Option<String>,
    arbeitsort: Option<Workplace>,
    hash_id: Option<String>,
    refnr: Option<String>,
    modifikations_timestamp: Option<String>,
    beruf: Option<String>,
}

#[derive(Deserialize)]
struct Workplace {
    ort: Option<String>,
    plz: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Detail {
    stellenangebots_beschreibung: Option<String>,
}

/// Location × search-term grid over the agency's REST API.
pub struct Bundesagentur {
    config: BundesagenturConfig,
    ctx: SourceContext,
    errors: Vec<String>,
}

impl Bundesagentur {
    pub const PLATFORM: &'static str = "bundesagentur";

    pub fn new(config: BundesagenturConfig, ctx: SourceContext) -> Self {
        Self {
            config,
            ctx,
            errors: Vec::new(),
        }
    }

    fn search_request(&self, term: &str, location: &str) -> HttpRequest {
        HttpRequest::get(SEARCH_URL)
            .header("Accept", "application/json")
            .header("X-API-Key", API_KEY)
            .query("was", term)
            .query("wo", location)
            .query("umkreis", self.config.radius_km)
            .query("page", 1)
            .query("size", self.config.results_per_page)
            .query("angebotsart", OFFER_TYPE_FULL_TIME)
    }

    /// Fill in descriptions for up to `max_details` records.
    async fn enrich(&self, jobs: &mut [JobRecord], refnrs: &HashMap<String, String>) {
        if self.config.max_details == 0 {
            return;
        }

        let mut enriched = 0;
        let mut failures = Vec::new();
        let candidates = jobs
            .iter_mut()
            .filter(|job| job.description.is_none())
            .filter_map(|job| refnrs.get(&job.url).cloned().map(|refnr| (job, refnr)))
            .take(self.config.max_details);

        for (job, refnr) in candidates {
            let request = HttpRequest::get(format!("{}{}", DETAIL_URL, STANDARD.encode(&refnr)))
                .header("Accept", "application/json")
                .header("X-API-Key", API_KEY);
            let label = format!("detail {}", refnr);
            if let Some(detail) =
                request_json::<Detail>(&self.ctx.client, &request, &label, &mut failures).await
            {
                job.description = detail
                    .stellenangebots_beschreibung
                    .as_deref()
                    .and_then(clean_description);
                enriched += 1;
            }
            pause(self.config.delay_ms).await;
        }

        log::debug!(
            "{}: enriched {} descriptions ({} detail failures)",
            Self::PLATFORM,
            enriched,
            failures.len()
        );
    }
}

/// Parse one listing; returns the record and its reference number.
fn parse_listing(item: Listing) -> Option<(JobRecord, Option<String>)> {
    let hash_id = non_empty(item.hash_id.as_deref()).map(str::to_string);
    let refnr = non_empty(item.refnr.as_deref()).map(str::to_string);
    // No identifier means no resolvable posting page
    let url = hash_id
        .as_deref()
        .or(refnr.as_deref())
        .and_then(|id| join_id(POSTING_URL, id))?;

    let mut location = item
        .arbeitsort
        .as_ref()
        .and_then(|w| non_empty(w.ort.as_deref()))
        .unwrap_or("Germany")
        .to_string();
    if let Some(plz) = item.arbeitsort.as_ref().and_then(|w| non_empty(w.plz.as_deref())) {
        location = format!("{} {}", plz, location);
    }

    let mut job = JobRecord::new(
        non_empty(item.titel.as_deref()).unwrap_or(super::UNKNOWN_TITLE),
        non_empty(item.arbeitgeber.as_deref()).unwrap_or(super::UNKNOWN_COMPANY),
        location,
        url,
        Bundesagentur::PLATFORM,
    );
    job.posted_date = item
        .modifikations_timestamp
        .as_deref()
        .and_then(crate::utils::date::normalize_date);
    if let Some(beruf) = non_empty(item.beruf.as_deref()) {
        job.tags.push(beruf.to_string());
    }
    Some((job, refnr))
}

#[async_trait]
impl JobSource for Bundesagentur {
    fn platform(&self) -> &'static str {
        Self::PLATFORM
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    async fn fetch(&mut self) -> Result<Vec<JobRecord>> {
        self.errors.clear();
        let mut collector = Collector::new(self.ctx.identity);
        let mut refnrs = HashMap::new();

        for location in &self.config.locations {
            for term in &self.config.search_terms {
                let request = self.search_request(term, location);
                let label = format!("'{}' in {}", term, location);
                let page = request_json::<SearchPage>(
                    &self.ctx.client,
                    &request,
                    &label,
                    &mut self.errors,
                )
                .await;

                if let Some(page) = page {
                    let mut batch = Vec::new();
                    for raw in page.stellenangebote {
                        let parsed = serde_json::from_value::<Listing>(raw)
                            .map_err(|e| log::debug!("{}: bad listing: {}", Self::PLATFORM, e))
                            .ok()
                            .and_then(parse_listing);
                        if let Some((job, refnr)) = parsed {
                            if let Some(refnr) = refnr {
                                refnrs.insert(job.url.clone(), refnr);
                            }
                            batch.push(job);
                        }
                    }
                    let added = collector.extend(batch);
                    log::debug!("{}: {} new jobs for {}", Self::PLATFORM, added, label);
                }

                pause(self.config.delay_ms).await;
            }
        }

        self.enrich(collector.jobs_mut(), &refnrs).await;
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

    fn listing(value: Value) -> Option<(JobRecord, Option<String>)> {
        parse_listing(serde_json::from_value(value).unwrap())
    }

    fn config() -> BundesagenturConfig {
        BundesagenturConfig {
            locations: vec!["Berlin".to_string()],
            search_terms: vec!["Data Scientist".to_string()],
            max_details: 1,
            ..BundesagenturConfig::default()
        }
    }

    #[test]
    fn test_parse_listing_fields() {
        let (job, refnr) = listing(json!({
            "titel": "Data Scientist (m/w/d)",
            "arbeitgeber": "Stadtwerke München",
            "arbeitsort": {"ort": "München", "plz": "80331"},
            "hashId": "abc123XYZ",
            "refnr": "10000-1199-S",
            "modifikationsTimestamp": "2026-02-11T09:14:10.482",
            "beruf": "Data Scientist"
        }))
        .unwrap();

        assert_eq!(job.location, "80331 München");
        assert_eq!(
            job.url,
            "https://www.arbeitsagentur.de/jobsuche/jobdetail/abc123XYZ"
        );
        assert_eq!(job.posted_date.as_deref(), Some("2026-02-11"));
        assert_eq!(job.company, "Stadtwerke München");
        assert_eq!(refnr.as_deref(), Some("10000-1199-S"));
    }

    #[test]
    fn test_parse_listing_refnr_fallback() {
        let (job, _) = listing(json!({
            "titel": "ML Engineer",
            "arbeitgeber": "Acme",
            "hashId": "  ",
            "refnr": "10000-42-S"
        }))
        .unwrap();
        assert_eq!(
            job.url,
            "https://www.arbeitsagentur.de/jobsuche/jobdetail/10000-42-S"
        );
        assert_eq!(job.location, "Germany");
    }

    #[test]
    fn test_parse_listing_rejects_missing_ids() {
        assert!(listing(json!({"titel": "Data Scientist", "arbeitgeber": "Acme"})).is_none());
        assert!(listing(json!({"titel": "X", "hashId": "", "refnr": ""})).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_dedups_and_enriches() {
        let search = json!({"stellenangebote": [
            {"titel": "Data Scientist", "arbeitgeber": "Acme", "arbeitsort": {"ort": "Berlin"}, "hashId": "h1", "refnr": "R-1"},
            {"titel": "data scientist", "arbeitgeber": "ACME", "arbeitsort": {"ort": "berlin"}, "hashId": "h2", "refnr": "R-2"},
            {"titel": "Analyst", "arbeitgeber": "Beta", "arbeitsort": {"ort": "Berlin"}},
            {"titel": "ML Engineer", "arbeitgeber": "Gamma", "arbeitsort": {"ort": "Berlin"}, "hashId": "h3", "refnr": "R-3"}
        ]});
        let detail = json!({"stellenangebotsBeschreibung": "<p>Forecasting <b>energy</b> demand</p>"});
        let (transport, client) = ScriptedTransport::new()
            .route("/pc/v4/jobs", HttpResponse::new(200, search.to_string()))
            .route("/jobdetails/", HttpResponse::new(200, detail.to_string()))
            .into_client();
        let ctx = SourceContext::new(client, IdentityStrategy::default());
        let mut source = Bundesagentur::new(config(), ctx);

        let jobs = source.fetch().await.unwrap();

        assert_eq!(jobs.len(), 2);
        assert_eq!(
            jobs[0].description.as_deref(),
            Some("Forecasting energy demand")
        );
        assert_eq!(jobs[1].description, None);
        assert!(source.errors().is_empty());

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert!(
            requests[0]
                .query
                .contains(&("angebotsart".to_string(), "1".to_string()))
        );
        assert!(requests[1].url.ends_with(&STANDARD.encode("R-1")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_records_rejected_call() {
        let (_, client) = ScriptedTransport::new().into_client();
        let ctx = SourceContext::new(client, IdentityStrategy::default());
        let mut source = Bundesagentur::new(config(), ctx);

        let jobs = source.fetch().await.unwrap();

        assert!(jobs.is_empty());
        assert_eq!(source.errors().len(), 1);
        assert!(source.errors()[0].contains("'Data Scientist' in Berlin"));
    }
}
