//! Filtering and categorization for X/Twitter feeds.
//!
//! Tweets fetched through the `bird` CLI are scored and filtered for
//! marketing, spam and low-value content, then deduplicated and sorted into
//! news, threads, resources and discussions for Markdown reports.

pub mod agent;
pub mod bird;
pub mod config;
pub mod error;
pub mod filter;
pub mod parser;
pub mod patterns;
pub mod report;
pub mod types;

pub use agent::{AgentOptions, Analysis, AnalysisAgent};
pub use bird::BirdClient;
pub use config::{load_config, Config, ConfigBuilder};
pub use error::{Error, Result};
pub use filter::{ContentFilter, FilterOptions, FilterProfile, FilterVerdict, PassThrough, TweetFilter};
pub use parser::{Category, CategorizedItem, ParsedContent, TweetParser};
pub use patterns::{PatternOverrides, PatternSet};
pub use report::MarkdownWriter;
pub use types::{Tweet, TweetRecord};

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::config::{load_config, Config, ConfigBuilder};
    pub use crate::error::{Error, Result};
    pub use crate::filter::{ContentFilter, FilterOptions, FilterProfile, FilterVerdict, TweetFilter};
    pub use crate::parser::{ParsedContent, TweetParser};
    pub use crate::patterns::PatternSet;
    pub use crate::types::{Tweet, TweetRecord};
    pub use futures::StreamExt;
}
