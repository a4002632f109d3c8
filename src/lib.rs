// src/lib.rs

//! jobradar: job posting aggregator.
//!
//! Scrapes public job boards, filters and scores the postings against a
//! preference model, and keeps a deduplicated backlog for digest delivery.

pub mod error;
pub mod filters;
pub mod http;
pub mod models;
pub mod notify;
pub mod pipeline;
pub mod scoring;
pub mod sources;
pub mod storage;
pub mod utils;

pub use error::{AppError, Result};
pub use models::{Config, IdentityStrategy, JobRecord};
