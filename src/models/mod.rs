// src/models/mod.rs

//! Domain models for the job radar.
//!
//! This module contains the canonical job record and the typed
//! configuration consumed by every component.

mod config;
mod job;

// Re-export all public types
pub use config::{
    AdzunaConfig, ArbeitnowConfig, BundesagenturConfig, Config, DatabaseConfig, FilteringConfig,
    HttpConfig, JobicyConfig, KeywordClass, LocationConfig, LocationTier, LoggingConfig,
    MoneyConfig, NotificationConfig, PassionConfig, RemoteOkConfig, SalaryThresholds,
    ScoringConfig, ScoringWeights, SeniorityKeywords, SourcesConfig, TheMuseConfig,
    WeWorkRemotelyConfig,
};
pub use job::{IdentityStrategy, JobRecord, format_salary};
