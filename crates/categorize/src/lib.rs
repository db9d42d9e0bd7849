//! Rule-based categorization of Brazilian bank statement transactions.
//!
//! A [`RuleStore`] is built once from a keyword configuration and handed to a
//! [`Categorizer`], which maps a description plus signed amount to a single
//! category name.

pub mod config;
pub mod engine;
pub mod insights;
pub mod normalize;
pub mod stats;
pub mod store;

pub use config::{CategoryConfig, ConfigError, KeywordConfig, Thresholds, BUNDLED_KEYWORDS};
pub use engine::Categorizer;
pub use insights::{keyword_candidates, write_uncategorized_csv, UncategorizedEntry};
pub use normalize::normalize_description;
pub use stats::{CategoryReport, CategoryTotals, Efficiency};
pub use store::{
    CategoryRule, CategoryType, LoadOutcome, RuleStore, TransactionKind, FALLBACK_CATEGORY,
};
