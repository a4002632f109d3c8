// src/storage/sqlite.rs

//! SQLite-backed job store.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, ErrorCode, Row, params, params_from_iter};

use super::{StoreStats, StoredJob};
use crate::error::Result;
use crate::models::{IdentityStrategy, JobRecord};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS jobs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    job_hash TEXT UNIQUE NOT NULL,
    title TEXT NOT NULL,
    company TEXT NOT NULL,
    location TEXT,
    url TEXT NOT NULL,
    platform TEXT NOT NULL,
    description TEXT,
    requirements TEXT,
    tags TEXT,
    salary_min INTEGER,
    salary_max INTEGER,
    salary_currency TEXT,
    salary_text TEXT,
    posted_date TEXT,
    scraped_at TEXT NOT NULL,
    money_score REAL NOT NULL DEFAULT 0,
    passion_score REAL NOT NULL DEFAULT 0,
    location_score REAL NOT NULL DEFAULT 0,
    total_score REAL NOT NULL DEFAULT 0,
    sent_to_user INTEGER NOT NULL DEFAULT 0,
    sent_at TEXT,
    years_experience_required INTEGER,
    filtered_out INTEGER NOT NULL DEFAULT 0,
    filter_reason TEXT
);

CREATE INDEX IF NOT EXISTS idx_scraped_at ON jobs(scraped_at);
CREATE INDEX IF NOT EXISTS idx_sent_to_user ON jobs(sent_to_user);
CREATE INDEX IF NOT EXISTS idx_total_score ON jobs(total_score DESC);
CREATE INDEX IF NOT EXISTS idx_platform ON jobs(platform);
"#;

/// Bound parameters per `mark_sent` statement, below SQLite's variable limit.
const MARK_SENT_CHUNK: usize = 500;

const INSERT_SQL: &str = "INSERT INTO jobs (
    job_hash, title, company, location, url, platform,
    description, requirements, tags,
    salary_min, salary_max, salary_currency, salary_text,
    posted_date, scraped_at,
    money_score, passion_score, location_score, total_score,
    years_experience_required, filtered_out, filter_reason
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22)";

const SELECT_COLUMNS: &str = "id, job_hash, title, company, location, url, platform,
    description, requirements, tags,
    salary_min, salary_max, salary_currency, salary_text,
    posted_date, scraped_at,
    money_score, passion_score, location_score, total_score,
    years_experience_required, filtered_out, filter_reason,
    sent_to_user, sent_at";

/// Persistent job store.
///
/// Records are keyed by their identity hash; a hash is stored at most once.
pub struct JobStore {
    conn: Connection,
    identity: IdentityStrategy,
}

impl JobStore {
    /// Open (or create) the database file, creating parent directories.
    pub fn open(path: impl AsRef<Path>, identity: IdentityStrategy) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        log::debug!("Job store opened at {}", path.display());
        Self::init(conn, identity)
    }

    /// Private in-memory database.
    pub fn open_in_memory(identity: IdentityStrategy) -> Result<Self> {
        Self::init(Connection::open_in_memory()?, identity)
    }

    fn init(conn: Connection, identity: IdentityStrategy) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn, identity })
    }

    pub fn identity(&self) -> IdentityStrategy {
        self.identity
    }

    /// Every identity hash ever stored.
    pub fn existing_identity_set(&self) -> Result<HashSet<String>> {
        let mut stmt = self.conn.prepare("SELECT job_hash FROM jobs")?;
        let hashes = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<HashSet<_>>>()?;
        Ok(hashes)
    }

    /// Insert records whose identity is not stored yet; returns rows written.
    ///
    /// The existing set is read once up front. Rows that still collide on
    /// the unique hash (duplicates inside `jobs`) are skipped silently.
    /// Excluded records are stored too.
    pub fn insert(&mut self, jobs: &[JobRecord]) -> Result<usize> {
        let existing = self.existing_identity_set()?;
        let fresh: Vec<(String, &JobRecord)> = jobs
            .iter()
            .map(|job| (self.identity.hash(job), job))
            .filter(|(hash, _)| !existing.contains(hash))
            .collect();

        if fresh.is_empty() {
            log::info!("No new jobs to insert");
            return Ok(0);
        }

        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(INSERT_SQL)?;
            for (hash, job) in &fresh {
                let tags = serde_json::to_string(&job.tags)?;
                let result = stmt.execute(params![
                    hash,
                    job.title,
                    job.company,
                    job.location,
                    job.url,
                    job.platform,
                    job.description,
                    job.requirements,
                    tags,
                    job.salary_min,
                    job.salary_max,
                    job.salary_currency,
                    job.salary_text,
                    job.posted_date,
                    timestamp(&job.scraped_at),
                    job.money_score,
                    job.passion_score,
                    job.location_score,
                    job.total_score,
                    job.years_experience_required,
                    job.filtered_out,
                    job.filter_reason,
                ]);
                match result {
                    Ok(_) => inserted += 1,
                    Err(rusqlite::Error::SqliteFailure(err, _))
                        if err.code == ErrorCode::ConstraintViolation =>
                    {
                        log::debug!("Skipping duplicate job {}", hash);
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }
        tx.commit()?;

        log::info!("Inserted {} new jobs", inserted);
        Ok(inserted)
    }

    /// Unsent, unfiltered records, best first.
    pub fn unsent(&self) -> Result<Vec<StoredJob>> {
        self.query_jobs(
            &format!(
                "SELECT {} FROM jobs WHERE sent_to_user = 0 AND filtered_out = 0
                 ORDER BY total_score DESC, id ASC",
                SELECT_COLUMNS
            ),
            [],
        )
    }

    /// Best unfiltered records regardless of sent state.
    pub fn top(&self, limit: usize) -> Result<Vec<StoredJob>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.query_jobs(
            &format!(
                "SELECT {} FROM jobs WHERE filtered_out = 0
                 ORDER BY total_score DESC, id ASC LIMIT ?1",
                SELECT_COLUMNS
            ),
            [limit],
        )
    }

    /// Flag records as delivered. Returns rows updated.
    ///
    /// Hashes are bound in chunks of `MARK_SENT_CHUNK` per statement, all inside
    /// one transaction.
    pub fn mark_sent(&mut self, hashes: &[String]) -> Result<usize> {
        if hashes.is_empty() {
            return Ok(0);
        }

        let now = timestamp(&Utc::now());
        let tx = self.conn.transaction()?;
        let mut updated = 0;
        for chunk in hashes.chunks(MARK_SENT_CHUNK) {
            let placeholders = vec!["?"; chunk.len()].join(",");
            let sql = format!(
                "UPDATE jobs SET sent_to_user = 1, sent_at = ? WHERE job_hash IN ({})",
                placeholders
            );
            let values = std::iter::once(&now).chain(chunk.iter());
            updated += tx.execute(&sql, params_from_iter(values))?;
        }
        tx.commit()?;

        log::info!("Marked {} jobs as sent", updated);
        Ok(updated)
    }

    /// Delete records scraped more than `retention_days` ago.
    pub fn purge_older_than(&self, retention_days: u32) -> Result<usize> {
        let cutoff = Utc::now() - Duration::days(i64::from(retention_days));
        let deleted = self.conn.execute(
            "DELETE FROM jobs WHERE scraped_at < ?1",
            params![timestamp(&cutoff)],
        )?;
        if deleted > 0 {
            log::info!("Purged {} jobs older than {} days", deleted, retention_days);
        }
        Ok(deleted)
    }

    pub fn stats(&self) -> Result<StoreStats> {
        let count = |sql: &str| -> Result<usize> {
            let n: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
            Ok(n.max(0) as usize)
        };

        let mut stmt = self
            .conn
            .prepare("SELECT platform, COUNT(*) FROM jobs GROUP BY platform")?;
        let by_platform = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?.max(0) as usize))
            })?
            .collect::<rusqlite::Result<BTreeMap<_, _>>>()?;

        Ok(StoreStats {
            total: count("SELECT COUNT(*) FROM jobs")?,
            unsent: count("SELECT COUNT(*) FROM jobs WHERE sent_to_user = 0 AND filtered_out = 0")?,
            filtered: count("SELECT COUNT(*) FROM jobs WHERE filtered_out = 1")?,
            by_platform,
        })
    }

    fn query_jobs<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Vec<StoredJob>> {
        let mut stmt = self.conn.prepare(sql)?;
        let jobs = stmt
            .query_map(params, row_to_job)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(jobs)
    }
}

/// RFC 3339 in UTC with a `Z` suffix; sorts lexicographically.
fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn row_to_job(row: &Row) -> rusqlite::Result<StoredJob> {
    let tags: Option<String> = row.get(9)?;
    let tags = match tags.as_deref() {
        Some(raw) if !raw.is_empty() => serde_json::from_str(raw)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(9, Type::Text, Box::new(e)))?,
        _ => Vec::new(),
    };

    let scraped_at: String = row.get(15)?;
    let scraped_at = DateTime::parse_from_rfc3339(&scraped_at)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(15, Type::Text, Box::new(e)))?
        .with_timezone(&Utc);

    let record = JobRecord {
        title: row.get(2)?,
        company: row.get(3)?,
        location: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        url: row.get(5)?,
        platform: row.get(6)?,
        description: row.get(7)?,
        requirements: row.get(8)?,
        tags,
        salary_min: row.get(10)?,
        salary_max: row.get(11)?,
        salary_currency: row.get(12)?,
        salary_text: row.get(13)?,
        posted_date: row.get(14)?,
        scraped_at,
        money_score: row.get(16)?,
        passion_score: row.get(17)?,
        location_score: row.get(18)?,
        total_score: row.get(19)?,
        years_experience_required: row.get(20)?,
        filtered_out: row.get(21)?,
        filter_reason: row.get(22)?,
    };

    Ok(StoredJob {
        id: row.get(0)?,
        identity_hash: row.get(1)?,
        record,
        sent_to_user: row.get(23)?,
        sent_at: row.get(24)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> JobStore {
        JobStore::open_in_memory(IdentityStrategy::default()).unwrap()
    }

    fn job(title: &str, total: f64) -> JobRecord {
        let mut job = JobRecord::new(title, "Acme", "Berlin", "https://x/1", "arbeitnow");
        job.total_score = total;
        job
    }

    #[test]
    fn test_insert_is_idempotent() {
        let mut store = store();
        let record = job("Data Scientist", 5.0);

        assert_eq!(store.insert(&[record.clone()]).unwrap(), 1);
        assert_eq!(store.insert(&[record]).unwrap(), 0);
        assert_eq!(store.stats().unwrap().total, 1);
    }

    #[test]
    fn test_insert_skips_duplicates_within_batch() {
        let mut store = store();
        let a = job("Data Scientist", 5.0);
        let mut b = job("data scientist ", 7.0);
        b.url = "https://x/2".to_string();

        assert_eq!(store.insert(&[a, b]).unwrap(), 1);
        assert_eq!(store.existing_identity_set().unwrap().len(), 1);
    }

    #[test]
    fn test_unsent_orders_by_score_and_hides_filtered() {
        let mut store = store();
        let mut excluded = job("Truck Driver", 9.2);
        excluded.exclude("Irrelevant keyword: driver");
        let records = vec![job("ML Engineer", 9.2), job("Data Analyst", 3.1), excluded];

        assert_eq!(store.insert(&records).unwrap(), 3);

        let unsent = store.unsent().unwrap();
        let scores: Vec<f64> = unsent.iter().map(|j| j.record.total_score).collect();
        assert_eq!(scores, vec![9.2, 3.1]);
        assert_eq!(unsent[0].record.title, "ML Engineer");
        assert_eq!(store.stats().unwrap().filtered, 1);
    }

    #[test]
    fn test_mark_sent() {
        let mut store = store();
        store
            .insert(&[job("ML Engineer", 9.0), job("Data Analyst", 3.0)])
            .unwrap();
        let first = store.unsent().unwrap()[0].identity_hash.clone();

        assert_eq!(store.mark_sent(&[]).unwrap(), 0);
        assert_eq!(store.mark_sent(&[first.clone()]).unwrap(), 1);

        let unsent = store.unsent().unwrap();
        assert_eq!(unsent.len(), 1);
        assert_ne!(unsent[0].identity_hash, first);

        let sent = store
            .top(10)
            .unwrap()
            .into_iter()
            .find(|j| j.identity_hash == first)
            .unwrap();
        assert!(sent.sent_to_user);
        assert!(sent.sent_at.is_some());
    }

    #[test]
    fn test_mark_sent_spans_statement_chunks() {
        let mut store = store();
        let records: Vec<JobRecord> = (0..1200)
            .map(|i| job(&format!("Data Engineer {}", i), 1.0))
            .collect();
        assert_eq!(store.insert(&records).unwrap(), 1200);

        let mut hashes: Vec<String> = store
            .unsent()
            .unwrap()
            .into_iter()
            .map(|j| j.identity_hash)
            .collect();
        hashes.push("not-a-stored-hash".to_string());

        assert_eq!(store.mark_sent(&hashes).unwrap(), 1200);
        assert!(store.unsent().unwrap().is_empty());
    }

    #[test]
    fn test_purge_older_than() {
        let mut store = store();
        let mut old = job("Old Posting", 1.0);
        old.scraped_at = Utc::now() - Duration::days(100);
        store.insert(&[old, job("Fresh Posting", 2.0)]).unwrap();

        assert_eq!(store.purge_older_than(90).unwrap(), 1);
        let remaining = store.top(10).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].record.title, "Fresh Posting");
    }

    #[test]
    fn test_stats_by_platform() {
        let mut store = store();
        let mut other = job("ML Engineer", 1.0);
        other.platform = "remoteok".to_string();
        store.insert(&[job("Data Scientist", 1.0), other]).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.unsent, 2);
        assert_eq!(stats.by_platform.get("arbeitnow"), Some(&1));
        assert_eq!(stats.by_platform.get("remoteok"), Some(&1));
    }

    #[test]
    fn test_stored_fields_survive() {
        let mut store = store();
        let mut record = job("Data Scientist", 6.5)
            .with_salary(Some(60_000), Some(75_000), Some("EUR".to_string()));
        record.tags = vec!["python".to_string(), "ml".to_string()];
        record.posted_date = Some("2026-02-01".to_string());
        record.years_experience_required = Some(3);
        store.insert(&[record.clone()]).unwrap();

        let stored = store.top(1).unwrap().remove(0).record;
        assert_eq!(stored.tags, record.tags);
        assert_eq!(stored.salary_text.as_deref(), Some("EUR 60,000 - 75,000"));
        assert_eq!(stored.years_experience_required, Some(3));
        assert_eq!(stored.scraped_at.timestamp(), record.scraped_at.timestamp());
    }

    #[test]
    fn test_reopen_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("jobs.db");
        let record = job("Data Scientist", 5.0);

        {
            let mut store = JobStore::open(&path, IdentityStrategy::default()).unwrap();
            store.insert(&[record.clone()]).unwrap();
        }

        let store = JobStore::open(&path, IdentityStrategy::default()).unwrap();
        assert!(
            store
                .existing_identity_set()
                .unwrap()
                .contains(&record.identity_hash())
        );
    }
}
