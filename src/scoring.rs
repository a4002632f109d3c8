// src/scoring.rs

//! Multi-criteria job scoring.
//!
//! Three independent 0-10 sub-scores (money, passion, location) are combined
//! into a weighted total used for ranking.

use crate::filters::experience_penalty;
use crate::models::{FilteringConfig, JobRecord, KeywordClass, ScoringConfig};

const MAX_SUB_SCORE: f64 = 10.0;
const NEUTRAL_MONEY_SCORE: f64 = 5.0;

/// Scores and ranks records.
pub struct JobScorer {
    scoring: ScoringConfig,
    filtering: FilteringConfig,
}

impl JobScorer {
    pub fn new(scoring: &ScoringConfig, filtering: &FilteringConfig) -> Self {
        Self {
            scoring: scoring.clone(),
            filtering: filtering.clone(),
        }
    }

    /// Score every unfiltered record, then sort all records by total, highest first.
    ///
    /// The sort is stable; excluded records keep zero scores.
    pub fn score(&self, jobs: &mut [JobRecord]) {
        log::info!("Scoring {} jobs", jobs.len());
        let weights = &self.scoring.weights;

        for job in jobs.iter_mut().filter(|job| !job.filtered_out) {
            let penalty = experience_penalty(job, &self.filtering);
            job.money_score = (self.money_score(job) - penalty).max(0.0);
            job.passion_score = self.passion_score(job);
            job.location_score = self.location_score(&job.location);
            job.total_score = weights.money * job.money_score
                + weights.passion * job.passion_score
                + weights.location * job.location_score;
        }

        jobs.sort_by(|a, b| b.total_score.total_cmp(&a.total_score));

        match jobs.first() {
            Some(top) => log::info!("Scoring complete, top score {:.2}", top.total_score),
            None => log::warn!("No jobs to score"),
        }
    }

    /// Salary tier plus seniority bonus, before any experience penalty.
    pub fn money_score(&self, job: &JobRecord) -> f64 {
        let money = &self.scoring.money;

        let mut score = match job.salary_min.filter(|s| *s > 0) {
            Some(amount) => {
                let salary = self.to_base_currency(amount, job.salary_currency.as_deref());
                let tiers = &money.salary_thresholds;
                if salary >= tiers.excellent {
                    10.0
                } else if salary >= tiers.great {
                    8.0
                } else if salary >= tiers.good {
                    6.0
                } else if salary >= tiers.average {
                    4.0
                } else {
                    2.0
                }
            }
            None => NEUTRAL_MONEY_SCORE,
        };

        let title = job.title.to_lowercase();
        let contains_any = |keywords: &[String]| {
            keywords
                .iter()
                .any(|kw| !kw.is_empty() && title.contains(&kw.to_lowercase()))
        };
        if contains_any(&money.seniority_keywords.high) {
            score = (score + money.high_seniority_bonus).min(MAX_SUB_SCORE);
        } else if contains_any(&money.seniority_keywords.medium) {
            score = (score + money.medium_seniority_bonus).min(MAX_SUB_SCORE);
        }
        score
    }

    /// Convert with the fixed rate table; unknown currencies pass through at 1.0.
    fn to_base_currency(&self, amount: i64, currency: Option<&str>) -> i64 {
        let money = &self.scoring.money;
        let Some(code) = currency.map(str::trim).filter(|c| !c.is_empty()) else {
            return amount;
        };
        let code = code.to_ascii_uppercase();
        if code.eq_ignore_ascii_case(&money.base_currency) {
            return amount;
        }
        let rate = money.currency_conversion.get(&code).copied().unwrap_or(1.0);
        (amount as f64 * rate) as i64
    }

    /// Keyword density over the energy, ML and tech classes.
    ///
    /// Without a substantial description only the title is scanned, with
    /// match counts scaled by the title multiplier.
    pub fn passion_score(&self, job: &JobRecord) -> f64 {
        let passion = &self.scoring.passion;
        let has_description = job
            .description
            .as_deref()
            .is_some_and(|d| d.trim().chars().count() > passion.min_description_length);

        let (text, multiplier) = if has_description {
            (job.searchable_text(), 1.0)
        } else {
            (job.title.to_lowercase(), passion.title_weight_multiplier)
        };

        let total: f64 = [&passion.energy, &passion.ml, &passion.tech]
            .into_iter()
            .map(|class| class_score(class, &text, multiplier))
            .sum();
        total.min(MAX_SUB_SCORE)
    }

    /// Score of the first tier whose keywords appear in the location.
    pub fn location_score(&self, location: &str) -> f64 {
        let location = location.to_lowercase();
        let config = &self.scoring.location;
        config
            .tiers
            .iter()
            .find(|tier| {
                tier.keywords
                    .iter()
                    .any(|kw| !kw.is_empty() && location.contains(&kw.to_lowercase()))
            })
            .map(|tier| tier.score)
            .unwrap_or(config.default_score)
    }
}

/// `min(matches * points * multiplier, max)`; a keyword counts once.
fn class_score(class: &KeywordClass, text: &str, multiplier: f64) -> f64 {
    let matches = class
        .keywords
        .iter()
        .filter(|kw| !kw.is_empty() && text.contains(&kw.to_lowercase()))
        .count();
    (matches as f64 * class.points * multiplier).min(class.max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scorer() -> JobScorer {
        JobScorer::new(&ScoringConfig::default(), &FilteringConfig::default())
    }

    fn job(title: &str, location: &str) -> JobRecord {
        JobRecord::new(title, "Acme", location, "https://x/1", "test")
    }

    fn salaried(title: &str, amount: i64, currency: &str) -> JobRecord {
        job(title, "Berlin").with_salary(Some(amount), None, Some(currency.to_string()))
    }

    #[test]
    fn test_money_tiers() {
        let s = scorer();
        assert_eq!(s.money_score(&salaried("Data Scientist", 85_000, "EUR")), 10.0);
        assert_eq!(s.money_score(&salaried("Data Scientist", 65_000, "EUR")), 8.0);
        assert_eq!(s.money_score(&salaried("Data Scientist", 50_000, "EUR")), 6.0);
        assert_eq!(s.money_score(&salaried("Data Scientist", 40_000, "EUR")), 4.0);
        assert_eq!(s.money_score(&salaried("Data Scientist", 30_000, "EUR")), 2.0);
        assert_eq!(s.money_score(&job("Data Scientist", "Berlin")), 5.0);
    }

    #[test]
    fn test_money_currency_conversion() {
        let s = scorer();
        // 90k USD * 0.92 = 82.8k EUR
        assert_eq!(s.money_score(&salaried("Data Scientist", 90_000, "USD")), 10.0);
        // 50k GBP * 1.17 = 58.5k EUR
        assert_eq!(s.money_score(&salaried("Data Scientist", 50_000, "gbp")), 6.0);
        // Unknown currency is taken at face value
        assert_eq!(s.money_score(&salaried("Data Scientist", 52_000, "XYZ")), 6.0);
    }

    #[test]
    fn test_seniority_bonus_caps_at_ten() {
        let s = scorer();
        let plain = s.money_score(&salaried("Data Scientist", 85_000, "EUR"));
        let senior = s.money_score(&salaried("Senior Data Scientist", 85_000, "EUR"));
        assert_eq!(plain, 10.0);
        assert_eq!(senior, 10.0);
        assert_eq!(s.money_score(&job("Senior Data Scientist", "Berlin")), 8.0);
        assert_eq!(s.money_score(&job("Experienced Analyst", "Berlin")), 6.5);
    }

    #[test]
    fn test_experience_penalty_floors_at_zero() {
        let s = scorer();
        let mut low = salaried("Analyst", 30_000, "EUR");
        low.years_experience_required = Some(7);
        let mut mid = job("Senior Data Scientist", "Berlin");
        mid.years_experience_required = Some(8);
        let mut jobs = vec![low, mid];

        s.score(&mut jobs);

        let by_title = |t: &str| jobs.iter().find(|j| j.title == t).unwrap().money_score;
        assert_eq!(by_title("Analyst"), 0.0);
        assert_eq!(by_title("Senior Data Scientist"), 6.0);
    }

    #[test]
    fn test_passion_title_only_uses_multiplier() {
        let s = scorer();
        // energy: min(1*4*2, 7) = 7; tech ("data"): min(1*1*2, 3) = 2
        assert_eq!(s.passion_score(&job("Energy Data Scientist", "Berlin")), 9.0);
    }

    #[test]
    fn test_passion_with_description() {
        let s = scorer();
        let mut record = job("Data Scientist", "Berlin");
        record.description = Some(
            "Join our renewable energy team building machine learning models in Python and SQL."
                .to_string(),
        );
        // energy: 2 matches -> min(8, 7) = 7; ml: 1 -> 3; tech: python, data, sql -> 3
        assert_eq!(s.passion_score(&record), 10.0);
    }

    #[test]
    fn test_short_description_counts_as_absent() {
        let s = scorer();
        let mut record = job("Forecasting Analyst", "Berlin");
        record.description = Some("Solar and wind.".to_string());
        // Title only: ml "forecasting" -> min(1*3*2, 6) = 6
        assert_eq!(s.passion_score(&record), 6.0);
    }

    #[test]
    fn test_location_tiers() {
        let s = scorer();
        assert_eq!(s.location_score("80331 München"), 10.0);
        assert_eq!(s.location_score("Munich, Bavaria"), 10.0);
        assert_eq!(s.location_score("Berlin (Remote)"), 8.0);
        assert_eq!(s.location_score("Remote (Germany)"), 7.0);
        assert_eq!(s.location_score("Germany"), 6.0);
        assert_eq!(s.location_score("Vienna, Austria"), 4.0);
        assert_eq!(s.location_score("Paris, France"), 2.0);
    }

    #[test]
    fn test_score_sorts_stably_and_skips_filtered() {
        let s = scorer();
        let mut excluded = job("Energy ML Engineer", "Munich");
        excluded.exclude("Irrelevant keyword: test");
        let mut jobs = vec![
            job("Analyst", "Paris"),
            excluded,
            job("Energy Data Scientist", "Munich"),
            job("Analyst", "Lyon"),
        ];

        s.score(&mut jobs);

        assert_eq!(jobs[0].title, "Energy Data Scientist");
        assert_eq!(jobs[1].location, "Paris");
        assert_eq!(jobs[2].location, "Lyon");
        assert_eq!(jobs[3].title, "Energy ML Engineer");
        assert_eq!(jobs[3].total_score, 0.0);
        assert_eq!(jobs[3].money_score, 0.0);

        let top = &jobs[0];
        let expected = 0.33 * top.money_score + 0.34 * top.passion_score + 0.33 * top.location_score;
        assert!((top.total_score - expected).abs() < 1e-9);
    }
}
