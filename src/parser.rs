//! Rule-based categorization of filtered tweets.
//!
//! A [`TweetParser`] is one session: it remembers the tweet ids (and URLs)
//! it has already seen so the same tweet is never emitted twice, even across
//! several [`TweetParser::parse_tweets`] calls.

use crate::types::Tweet;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::OnceLock;

/// Substrings that mark a link as code (repositories, package registries)
const CODE_HINTS: &[&str] = &["github", "git.io", "npm", "pypi"];

/// Substrings that mark a tweet as news
const NEWS_KEYWORDS: &[&str] = &[
    "release",
    "announc",
    "launch",
    "update",
    "new",
    "v2.",
    "v3.",
    "beta",
    "just shipped",
];

const THREAD_GLYPH: &str = "🧵";
const SHORT_LINK_HOST: &str = "t.co";

/// Category assigned to a tweet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    News,
    Thread,
    Resource,
    /// A resource that points at code; reported with resources
    Code,
    Discussion,
}

impl Category {
    /// Output bucket this category is reported under
    pub fn bucket(self) -> Bucket {
        match self {
            Category::News => Bucket::News,
            Category::Thread => Bucket::Threads,
            Category::Resource | Category::Code => Bucket::Resources,
            Category::Discussion => Bucket::Discussions,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::News => "news",
            Category::Thread => "thread",
            Category::Resource => "resource",
            Category::Code => "code",
            Category::Discussion => "discussion",
        };
        f.write_str(name)
    }
}

/// The four report buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    News,
    Threads,
    Resources,
    Discussions,
}

/// A categorized tweet, ready for presentation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorizedItem {
    pub id: String,
    pub text: String,
    /// Handle with a leading `@`
    pub author: String,
    pub author_name: String,
    pub created_at: String,
    pub engagement: u64,
    pub urls: Vec<String>,
    pub category: Category,
    pub confidence: f64,
    pub is_quote: bool,
}

/// Metadata describing a parse run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseMetadata {
    pub source: String,
    pub parsed_at: DateTime<Utc>,
    /// Distinct tweet ids seen in the session so far
    pub total_parsed: usize,
}

/// Categorized output of a parse run. Buckets are unordered; consumers rank
/// them at presentation time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedContent {
    pub news: Vec<CategorizedItem>,
    pub threads: Vec<CategorizedItem>,
    pub resources: Vec<CategorizedItem>,
    pub discussions: Vec<CategorizedItem>,
    pub metadata: ParseMetadata,
}

impl ParsedContent {
    /// Empty content for a source
    pub fn empty(source: impl Into<String>) -> Self {
        Self {
            news: Vec::new(),
            threads: Vec::new(),
            resources: Vec::new(),
            discussions: Vec::new(),
            metadata: ParseMetadata {
                source: source.into(),
                parsed_at: Utc::now(),
                total_parsed: 0,
            },
        }
    }

    pub fn bucket(&self, bucket: Bucket) -> &[CategorizedItem] {
        match bucket {
            Bucket::News => &self.news,
            Bucket::Threads => &self.threads,
            Bucket::Resources => &self.resources,
            Bucket::Discussions => &self.discussions,
        }
    }

    fn bucket_mut(&mut self, bucket: Bucket) -> &mut Vec<CategorizedItem> {
        match bucket {
            Bucket::News => &mut self.news,
            Bucket::Threads => &mut self.threads,
            Bucket::Resources => &mut self.resources,
            Bucket::Discussions => &mut self.discussions,
        }
    }

    /// Number of categorized items across all buckets
    pub fn len(&self) -> usize {
        self.news.len() + self.threads.len() + self.resources.len() + self.discussions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn url_regex() -> &'static Regex {
    static URL_RE: OnceLock<Regex> = OnceLock::new();
    URL_RE.get_or_init(|| Regex::new(r"https?://\S+").expect("URL regex must compile"))
}

/// True for `t.co` shortener links
fn is_short_link(url: &str) -> bool {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    let host = rest.split('/').next().unwrap_or(rest);
    host.eq_ignore_ascii_case(SHORT_LINK_HOST)
}

/// Collect a tweet's links: structured URLs plus any found in the text,
/// deduplicated in first-seen order. Bare shortener links are dropped unless
/// they carry a meaningful path (more than 3 `/`).
pub fn extract_urls(tweet: &Tweet) -> Vec<String> {
    let mut seen = HashSet::new();
    tweet
        .urls()
        .iter()
        .map(String::as_str)
        .chain(url_regex().find_iter(tweet.text()).map(|m| m.as_str()))
        .filter(|url| seen.insert(*url))
        .filter(|url| !is_short_link(url) || url.matches('/').count() > 3)
        .map(str::to_string)
        .collect()
}

/// Categorize a single tweet. Pure; does not touch session state.
pub fn categorize(tweet: &Tweet) -> (Category, f64) {
    let text = tweet.text().to_lowercase();
    let has_urls = !tweet.urls().is_empty();

    // Shared links
    if has_urls && !tweet.is_quote() {
        let mentions_code = |s: &str| CODE_HINTS.iter().any(|hint| s.contains(hint));
        if mentions_code(&text) || tweet.urls().iter().any(|u| mentions_code(&u.to_lowercase())) {
            return (Category::Code, 0.9);
        }
        return (Category::Resource, 0.8);
    }

    // Thread indicators
    if text.contains(THREAD_GLYPH)
        || text.contains("thread")
        || tweet.reply_count() > 10
        || (has_urls && tweet.text_len() > 280)
    {
        return (Category::Thread, 0.85);
    }

    if NEWS_KEYWORDS.iter().any(|kw| text.contains(kw)) {
        return (Category::News, 0.75);
    }

    if tweet.reply_count() > 5 || text.contains('?') {
        return (Category::Discussion, 0.7);
    }

    (Category::Discussion, 0.5)
}

/// Categorizer session
#[derive(Debug, Default)]
pub struct TweetParser {
    seen_ids: HashSet<String>,
    seen_urls: HashSet<String>,
}

impl TweetParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Distinct tweet ids processed by this session
    pub fn seen_ids(&self) -> usize {
        self.seen_ids.len()
    }

    /// Distinct URLs observed by this session
    pub fn seen_urls(&self) -> &HashSet<String> {
        &self.seen_urls
    }

    /// Categorize tweets into buckets, skipping ids already seen in this
    /// session. Tweets are processed in input order.
    pub fn parse_tweets<'a, I>(&mut self, tweets: I, source: &str) -> ParsedContent
    where
        I: IntoIterator<Item = &'a Tweet>,
    {
        let mut content = ParsedContent::empty(source);

        for tweet in tweets {
            if !self.seen_ids.insert(tweet.id().to_string()) {
                tracing::debug!(id = tweet.id(), "skipping duplicate tweet");
                continue;
            }

            let (category, confidence) = categorize(tweet);
            let urls = extract_urls(tweet);
            self.seen_urls.extend(urls.iter().cloned());

            content
                .bucket_mut(category.bucket())
                .push(CategorizedItem {
                    id: tweet.id().to_string(),
                    text: tweet.text().to_string(),
                    author: format!("@{}", tweet.author_username()),
                    author_name: tweet.author_name().to_string(),
                    created_at: tweet.created_at().to_string(),
                    engagement: tweet.engagement(),
                    urls,
                    category,
                    confidence,
                    is_quote: tweet.is_quote(),
                });
        }

        content.metadata.total_parsed = self.seen_ids.len();
        tracing::info!(
            source,
            news = content.news.len(),
            threads = content.threads.len(),
            resources = content.resources.len(),
            discussions = content.discussions.len(),
            "parsed tweets"
        );
        content
    }
}
