//! jobradar CLI
//!
//! Local entry point for scheduled runs and for inspecting the job store.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use jobradar::{
    error::{AppError, Result},
    http::ResilientClient,
    models::{Config, format_salary},
    notify::LogNotifier,
    pipeline,
    sources::{self, SOURCE_NAMES, SourceContext},
    storage::JobStore,
    utils::report,
};

/// jobradar - job posting aggregator
#[derive(Parser, Debug)]
#[command(name = "jobradar", version, about = "Aggregates and ranks job postings")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "data/config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scrape, filter, score, store and send the digest
    Run {
        /// Cap the digest at `notification.test_top_n`
        #[arg(long)]
        test: bool,
    },

    /// Run a single source and print its records without storing them
    Fetch {
        /// Source identifier, e.g. "remoteok"
        source: String,

        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the best stored jobs
    List {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },

    /// Show job store statistics
    Stats,

    /// Delete old jobs from the store
    Purge {
        /// Retention in days (default: `database.retention_days`)
        #[arg(long)]
        days: Option<u32>,
    },

    /// Validate the configuration file
    Validate,
}

/// Initialize logging at the given default level.
fn init_logging(level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn open_store(config: &Config) -> Result<JobStore> {
    JobStore::open(&config.database.path, config.database.identity)
}

fn source_context(config: &Config) -> Result<SourceContext> {
    let client = ResilientClient::from_config(&config.http)?;
    Ok(SourceContext::new(client, config.database.identity))
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // The logger needs the configured level, so loading is split from the fallback.
    let loaded = Config::load(&cli.config);
    let level = match (&loaded, cli.verbose) {
        (_, true) => "debug".to_string(),
        (Ok(config), false) => config.logging.level.clone(),
        (Err(_), false) => "info".to_string(),
    };
    init_logging(&level);

    let config = loaded.unwrap_or_else(|e| {
        log::warn!(
            "Config load failed from {}: {}. Using defaults.",
            cli.config.display(),
            e
        );
        Config::default()
    });

    if let Err(e) = config.validate() {
        log::error!("Config validation failed: {}", e);
        return Err(e);
    }

    match cli.command {
        Command::Run { test } => {
            let ctx = source_context(&config)?;
            let mut sources = sources::build_sources(&config, &ctx);
            let mut store = open_store(&config)?;
            let notifier = LogNotifier::new();

            let summary =
                pipeline::run_pipeline(&config, &mut sources, &mut store, &notifier, test).await?;

            if summary.errors.is_empty() {
                log::info!("Run complete");
            } else {
                log::warn!("Run complete with {} source errors", summary.errors.len());
            }
        }

        Command::Fetch { source, json } => {
            let ctx = source_context(&config)?;
            let Some(mut adapter) = sources::source_by_name(&source, &config, &ctx) else {
                return Err(AppError::config(format!(
                    "Unknown source '{}'. Available: {}",
                    source,
                    SOURCE_NAMES.join(", ")
                )));
            };

            let outcome = adapter.safe_fetch().await;
            if json {
                println!("{}", serde_json::to_string_pretty(&outcome.jobs)?);
            } else {
                for job in &outcome.jobs {
                    log::info!("{} | {} | {} | {}", job.title, job.company, job.location, job.url);
                    if let Some(salary) = &job.salary_text {
                        report::sub_item(salary);
                    }
                }
            }
            for error in &outcome.errors {
                log::warn!("{}", error);
            }
            log::info!(
                "{}: {} jobs ({:?})",
                outcome.platform,
                outcome.jobs.len(),
                outcome.status
            );
        }

        Command::List { limit } => {
            let store = open_store(&config)?;
            let jobs = store.top(limit)?;
            if jobs.is_empty() {
                log::info!("No jobs stored yet");
            }
            for (rank, stored) in jobs.iter().enumerate() {
                let job = &stored.record;
                let sent = if stored.sent_to_user { " (sent)" } else { "" };
                log::info!(
                    "#{} [{:.1}] {} @ {} - {}{}",
                    rank + 1,
                    job.total_score,
                    job.title,
                    job.company,
                    job.location,
                    sent
                );
                let salary =
                    format_salary(job.salary_min, job.salary_max, job.salary_currency.as_deref());
                if let Some(salary) = salary {
                    report::sub_item(&salary);
                }
                report::sub_item(&job.url);
            }
        }

        Command::Stats => {
            let stats = open_store(&config)?.stats()?;
            let mut items = vec![
                ("Total jobs", stats.total.to_string()),
                ("Unsent jobs", stats.unsent.to_string()),
                ("Filtered jobs", stats.filtered.to_string()),
            ];
            items.extend(stats.by_platform.iter().map(|(p, c)| (p.as_str(), c.to_string())));
            report::summary(&config.database.path, &items);
        }

        Command::Purge { days } => {
            let days = days.unwrap_or(config.database.retention_days);
            let deleted = open_store(&config)?.purge_older_than(days)?;
            log::info!("Deleted {} jobs older than {} days", deleted, days);
        }

        Command::Validate => {
            // No fallback to defaults here: a broken file must fail.
            Config::load(&cli.config)?.validate()?;
            log::info!("✓ Config OK ({})", cli.config.display());
            log::info!(
                "Sources enabled: {}",
                sources::build_sources(&config, &source_context(&config)?)
                    .iter()
                    .filter(|s| s.is_enabled())
                    .map(|s| s.platform())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
    }

    Ok(())
}
