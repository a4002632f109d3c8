//! Canonical job record shared by every source adapter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Fields that make up a record's identity hash.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityStrategy {
    /// Normalized (title, company, location). A reworded re-post counts as
    /// new and two openings with identical triples collide.
    #[default]
    TitleCompanyLocation,

    /// The triple plus the posting URL.
    TitleCompanyLocationUrl,
}

impl IdentityStrategy {
    /// Compute the identity hash of a record under this strategy.
    pub fn hash(&self, job: &JobRecord) -> String {
        let mut parts = vec![
            normalize_key(&job.title),
            normalize_key(&job.company),
            normalize_key(&job.location),
        ];
        if *self == IdentityStrategy::TitleCompanyLocationUrl {
            parts.push(job.url.trim().to_string());
        }
        hex::encode(Sha256::digest(parts.join("|").as_bytes()))
    }
}

fn normalize_key(value: &str) -> String {
    value.trim().to_lowercase()
}

/// A job posting in the common record shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobRecord {
    pub title: String,
    pub company: String,
    /// Human-readable location, may carry qualifiers like "(Remote)"
    pub location: String,
    pub url: String,
    /// Source identifier (e.g. "remoteok")
    pub platform: String,

    /// Plain-text description, truncated
    pub description: Option<String>,
    pub requirements: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,

    pub salary_min: Option<i64>,
    pub salary_max: Option<i64>,
    pub salary_currency: Option<String>,
    pub salary_text: Option<String>,

    /// `YYYY-MM-DD`
    pub posted_date: Option<String>,
    pub scraped_at: DateTime<Utc>,

    #[serde(default)]
    pub money_score: f64,
    #[serde(default)]
    pub passion_score: f64,
    #[serde(default)]
    pub location_score: f64,
    #[serde(default)]
    pub total_score: f64,

    pub years_experience_required: Option<i64>,
    #[serde(default)]
    pub filtered_out: bool,
    pub filter_reason: Option<String>,
}

impl JobRecord {
    /// Create a record with the required fields; everything else defaulted.
    pub fn new(
        title: impl Into<String>,
        company: impl Into<String>,
        location: impl Into<String>,
        url: impl Into<String>,
        platform: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            company: company.into(),
            location: location.into(),
            url: url.into(),
            platform: platform.into(),
            description: None,
            requirements: None,
            tags: Vec::new(),
            salary_min: None,
            salary_max: None,
            salary_currency: None,
            salary_text: None,
            posted_date: None,
            scraped_at: Utc::now(),
            money_score: 0.0,
            passion_score: 0.0,
            location_score: 0.0,
            total_score: 0.0,
            years_experience_required: None,
            filtered_out: false,
            filter_reason: None,
        }
    }

    /// Identity hash under the default (title, company, location) strategy.
    pub fn identity_hash(&self) -> String {
        IdentityStrategy::default().hash(self)
    }

    /// Lowercased title and description, the text most checks scan.
    pub fn searchable_text(&self) -> String {
        format!("{} {}", self.title, self.description.as_deref().unwrap_or("")).to_lowercase()
    }

    /// Mark the record as excluded.
    pub fn exclude(&mut self, reason: impl Into<String>) {
        self.filtered_out = true;
        self.filter_reason = Some(reason.into());
    }

    /// Set salary fields and the derived display string.
    pub fn with_salary(
        mut self,
        min: Option<i64>,
        max: Option<i64>,
        currency: Option<String>,
    ) -> Self {
        self.salary_text = format_salary(min, max, currency.as_deref());
        self.salary_min = min;
        self.salary_max = max;
        self.salary_currency = currency;
        self
    }
}

/// Build a display string such as `EUR 60,000 - 75,000` or `USD 90,000+`.
pub fn format_salary(min: Option<i64>, max: Option<i64>, currency: Option<&str>) -> Option<String> {
    let prefix = currency.map(|c| format!("{c} ")).unwrap_or_default();
    match (min, max) {
        (Some(lo), Some(hi)) if lo > 0 && hi > 0 => Some(format!(
            "{prefix}{} - {}",
            group_thousands(lo),
            group_thousands(hi)
        )),
        (Some(lo), _) if lo > 0 => Some(format!("{prefix}{}+", group_thousands(lo))),
        _ => None,
    }
}

fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if value < 0 {
        out.insert(0, '-');
    }
    out
}
