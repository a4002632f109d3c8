//! Record filters.
//!
//! Filters mark records as excluded; they never remove them, so excluded
//! postings still reach the store for auditing.

mod experience;
mod relevance;

pub use experience::{ExperienceFilter, experience_penalty};
pub use relevance::RelevanceFilter;
