//! Application configuration structures.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::IdentityStrategy;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Outbound HTTP and retry behavior
    #[serde(default)]
    pub http: HttpConfig,

    /// Per-source adapter settings
    #[serde(default)]
    pub sources: SourcesConfig,

    /// Relevance and experience filter settings
    #[serde(default)]
    pub filtering: FilteringConfig,

    /// Scoring model
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Job store location and retention
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Digest settings
    #[serde(default)]
    pub notification: NotificationConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::validation("http.user_agent is empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::validation("http.timeout_secs must be > 0"));
        }
        if self.http.max_retries == 0 {
            return Err(AppError::validation("http.max_retries must be > 0"));
        }
        if self.http.backoff_base < 1.0 {
            return Err(AppError::validation("http.backoff_base must be >= 1.0"));
        }

        let weights = &self.scoring.weights;
        if weights.money < 0.0 || weights.passion < 0.0 || weights.location < 0.0 {
            return Err(AppError::validation("scoring.weights must be non-negative"));
        }
        for tier in &self.scoring.location.tiers {
            if tier.keywords.is_empty() {
                return Err(AppError::validation(format!(
                    "scoring.location tier '{}' has no keywords",
                    tier.name
                )));
            }
        }
        if self.scoring.passion.title_weight_multiplier <= 0.0 {
            return Err(AppError::validation(
                "scoring.passion.title_weight_multiplier must be > 0",
            ));
        }

        if self.filtering.hard_filter_experience_years <= self.filtering.experience_penalty_threshold
        {
            return Err(AppError::validation(
                "filtering.hard_filter_experience_years must exceed experience_penalty_threshold",
            ));
        }
        if self.database.retention_days == 0 {
            return Err(AppError::validation("database.retention_days must be > 0"));
        }
        Ok(())
    }
}

/// Outbound HTTP and retry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Attempts per request for transport errors and 5xx
    #[serde(default = "defaults::max_retries")]
    pub max_retries: u32,

    /// Backoff for attempt n is `backoff_base^n` seconds
    #[serde(default = "defaults::backoff_base")]
    pub backoff_base: f64,

    /// Ceiling applied to a server-supplied Retry-After
    #[serde(default = "defaults::max_retry_after")]
    pub max_retry_after_secs: u64,

    /// Separate budget for 429 responses
    #[serde(default = "defaults::max_rate_limit_retries")]
    pub max_rate_limit_retries: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            max_retries: defaults::max_retries(),
            backoff_base: defaults::backoff_base(),
            max_retry_after_secs: defaults::max_retry_after(),
            max_rate_limit_retries: defaults::max_rate_limit_retries(),
        }
    }
}

/// Settings for every source adapter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub bundesagentur: BundesagenturConfig,
    pub arbeitnow: ArbeitnowConfig,
    pub remoteok: RemoteOkConfig,
    pub jobicy: JobicyConfig,
    pub themuse: TheMuseConfig,
    pub weworkremotely: WeWorkRemotelyConfig,
    pub adzuna: AdzunaConfig,
}

/// Federal employment agency search API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BundesagenturConfig {
    pub enabled: bool,
    pub locations: Vec<String>,
    pub search_terms: Vec<String>,
    pub radius_km: u32,
    pub results_per_page: u32,
    /// Detail lookups per run; 0 disables enrichment
    pub max_details: usize,
    pub delay_ms: u64,
}

impl Default for BundesagenturConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            locations: strings(&["München", "Nürnberg", "Berlin"]),
            search_terms: strings(&["Data Scientist", "Machine Learning Engineer"]),
            radius_km: 50,
            results_per_page: 100,
            max_details: 20,
            delay_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArbeitnowConfig {
    pub enabled: bool,
    pub max_pages: u32,
    pub delay_ms: u64,
}

impl Default for ArbeitnowConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_pages: 5,
            delay_ms: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteOkConfig {
    pub enabled: bool,
    pub tags: Vec<String>,
    pub delay_ms: u64,
}

impl Default for RemoteOkConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tags: strings(&["data", "machine-learning", "python"]),
            delay_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobicyConfig {
    pub enabled: bool,
    pub tags: Vec<String>,
    pub results_per_tag: u32,
    pub delay_ms: u64,
}

impl Default for JobicyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tags: strings(&["data-science", "machine-learning", "python"]),
            results_per_tag: 50,
            delay_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TheMuseConfig {
    pub enabled: bool,
    pub categories: Vec<String>,
    pub max_pages: u32,
    pub delay_ms: u64,
}

impl Default for TheMuseConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            categories: strings(&["Data Science", "Data and Analytics", "Software Engineering"]),
            max_pages: 3,
            delay_ms: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeWorkRemotelyConfig {
    pub enabled: bool,
    pub feeds: Vec<String>,
    pub delay_ms: u64,
}

impl Default for WeWorkRemotelyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            feeds: strings(&[
                "https://weworkremotely.com/categories/remote-programming-jobs.rss",
                "https://weworkremotely.com/categories/remote-devops-sysadmin-jobs.rss",
            ]),
            delay_ms: 500,
        }
    }
}

/// Keyed search API; credentials come from the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdzunaConfig {
    pub enabled: bool,
    pub countries: Vec<String>,
    pub search_terms: Vec<String>,
    pub max_pages: u32,
    pub results_per_page: u32,
    pub delay_ms: u64,
}

impl Default for AdzunaConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            countries: strings(&["de", "gb"]),
            search_terms: strings(&["data scientist", "machine learning"]),
            max_pages: 2,
            results_per_page: 50,
            delay_ms: 500,
        }
    }
}

/// Keyword and experience filter settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilteringConfig {
    /// Matched against title + description
    #[serde(default = "defaults::irrelevant_keywords")]
    pub irrelevant_keywords: Vec<String>,

    /// Matched against the title only
    #[serde(default = "defaults::hard_filter_keywords")]
    pub hard_filter_keywords: Vec<String>,

    #[serde(default = "defaults::hard_filter_years")]
    pub hard_filter_experience_years: i64,

    #[serde(default = "defaults::penalty_threshold")]
    pub experience_penalty_threshold: i64,

    #[serde(default = "defaults::penalty_points")]
    pub experience_penalty_points: f64,
}

impl Default for FilteringConfig {
    fn default() -> Self {
        Self {
            irrelevant_keywords: defaults::irrelevant_keywords(),
            hard_filter_keywords: defaults::hard_filter_keywords(),
            hard_filter_experience_years: defaults::hard_filter_years(),
            experience_penalty_threshold: defaults::penalty_threshold(),
            experience_penalty_points: defaults::penalty_points(),
        }
    }
}

/// Scoring model settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub weights: ScoringWeights,
    pub money: MoneyConfig,
    pub passion: PassionConfig,
    pub location: LocationConfig,
}

/// Weights for the composite score. Not required to sum to 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub money: f64,
    pub passion: f64,
    pub location: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            money: 0.33,
            passion: 0.34,
            location: 0.33,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MoneyConfig {
    pub salary_thresholds: SalaryThresholds,
    pub seniority_keywords: SeniorityKeywords,
    pub high_seniority_bonus: f64,
    pub medium_seniority_bonus: f64,
    /// Rate into the base currency, keyed by upper-case code
    pub currency_conversion: BTreeMap<String, f64>,
    pub base_currency: String,
}

impl Default for MoneyConfig {
    fn default() -> Self {
        Self {
            salary_thresholds: SalaryThresholds::default(),
            seniority_keywords: SeniorityKeywords::default(),
            high_seniority_bonus: 3.0,
            medium_seniority_bonus: 1.5,
            currency_conversion: BTreeMap::from([
                ("USD".to_string(), 0.92),
                ("GBP".to_string(), 1.17),
                ("CHF".to_string(), 1.05),
                ("CAD".to_string(), 0.68),
            ]),
            base_currency: "EUR".to_string(),
        }
    }
}

/// Annual salary tiers in the base currency.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SalaryThresholds {
    pub excellent: i64,
    pub great: i64,
    pub good: i64,
    pub average: i64,
}

impl Default for SalaryThresholds {
    fn default() -> Self {
        Self {
            excellent: 80_000,
            great: 65_000,
            good: 50_000,
            average: 40_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SeniorityKeywords {
    pub high: Vec<String>,
    pub medium: Vec<String>,
}

impl Default for SeniorityKeywords {
    fn default() -> Self {
        Self {
            high: strings(&["senior", "lead", "staff", "principal"]),
            medium: strings(&["mid-level", "experienced", "professional", " ii"]),
        }
    }
}

/// Passion score keyword classes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PassionConfig {
    pub energy: KeywordClass,
    pub ml: KeywordClass,
    pub tech: KeywordClass,
    /// Applied to match counts when only the title is scanned
    pub title_weight_multiplier: f64,
    /// Descriptions at or below this many characters count as absent
    pub min_description_length: usize,
}

impl Default for PassionConfig {
    fn default() -> Self {
        Self {
            energy: KeywordClass {
                keywords: strings(&[
                    "energy", "energie", "renewable", "grid", "solar", "wind", "battery",
                    "power", "utility", "utilities", "climate",
                ]),
                points: 4.0,
                max: 7.0,
            },
            ml: KeywordClass {
                keywords: strings(&[
                    "machine learning", "ml ", "deep learning", "artificial intelligence",
                    "neural", "nlp", "computer vision", "llm", "transformer", "forecasting",
                ]),
                points: 3.0,
                max: 6.0,
            },
            tech: KeywordClass {
                keywords: strings(&[
                    "python", "data", "sql", "cloud", "spark", "aws", "kubernetes",
                    "optimization",
                ]),
                points: 1.0,
                max: 3.0,
            },
            title_weight_multiplier: 2.0,
            min_description_length: 50,
        }
    }
}

/// One weighted keyword class: `min(matches * points, max)`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeywordClass {
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub points: f64,
    #[serde(default)]
    pub max: f64,
}

/// Ordered location tiers; the first matching tier wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    pub tiers: Vec<LocationTier>,
    pub default_score: f64,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            tiers: vec![
                LocationTier::new(
                    "home_region",
                    10.0,
                    &[
                        "bavaria", "bayern", "munich", "münchen", "muenchen", "nuremberg",
                        "nürnberg", "augsburg", "regensburg", "ingolstadt", "erlangen",
                        "würzburg",
                    ],
                ),
                LocationTier::new(
                    "preferred_country",
                    8.0,
                    &[
                        "berlin", "hamburg", "frankfurt", "stuttgart", "cologne", "köln",
                        "düsseldorf", "karlsruhe",
                    ],
                ),
                // Before the home-country tier so "Remote (Germany)" lands here.
                LocationTier::new(
                    "any_remote",
                    7.0,
                    &["remote", "worldwide", "anywhere", "homeoffice", "home office"],
                ),
                LocationTier::new("home_country", 6.0, &["germany", "deutschland"]),
                LocationTier::new(
                    "nearby_region",
                    4.0,
                    &[
                        "europe", "emea", "austria", "österreich", "switzerland", "schweiz",
                        "netherlands", "vienna", "zurich",
                    ],
                ),
            ],
            default_score: 2.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationTier {
    pub name: String,
    pub score: f64,
    pub keywords: Vec<String>,
}

impl LocationTier {
    pub fn new(name: &str, score: f64, keywords: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            score,
            keywords: strings(keywords),
        }
    }
}

/// Job store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "defaults::database_path")]
    pub path: String,

    #[serde(default = "defaults::retention_days")]
    pub retention_days: u32,

    #[serde(default)]
    pub identity: IdentityStrategy,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: defaults::database_path(),
            retention_days: defaults::retention_days(),
            identity: IdentityStrategy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Jobs included in one digest
    pub daily_top_n: usize,
    /// Digest cap when running with `--test`
    pub test_top_n: usize,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            daily_top_n: 15,
            test_top_n: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

mod defaults {
    use super::strings;

    // HTTP defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; jobradar/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn max_retries() -> u32 {
        3
    }
    pub fn backoff_base() -> f64 {
        2.0
    }
    pub fn max_retry_after() -> u64 {
        60
    }
    pub fn max_rate_limit_retries() -> u32 {
        5
    }

    // Filtering defaults
    pub fn irrelevant_keywords() -> Vec<String> {
        strings(&[
            "driver", "fahrer", "warehouse", "lager", "retail", "verkäufer", "cashier",
            "kassierer", "call center", "callcenter", "nurse", "pflege", "cleaning",
        ])
    }
    pub fn hard_filter_keywords() -> Vec<String> {
        strings(&[
            "head of", "director", "vice president", "vp of", "chief", "leiter", "cto",
        ])
    }
    pub fn hard_filter_years() -> i64 {
        10
    }
    pub fn penalty_threshold() -> i64 {
        5
    }
    pub fn penalty_points() -> f64 {
        2.0
    }

    // Database defaults
    pub fn database_path() -> String {
        "data/jobs.db".into()
    }
    pub fn retention_days() -> u32 {
        90
    }

    pub fn log_level() -> String {
        "info".into()
    }
}
