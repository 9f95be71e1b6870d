use crate::config::FiltersConfig;
use crate::patterns::{contains_any, PatternSet};
use crate::types::Tweet;
use std::collections::HashSet;

/// Minimum score a tweet needs to pass
pub const PASS_SCORE: f64 = 30.0;

/// Filter profile selected by the command being run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterProfile {
    /// Home timeline: every check enabled
    Timeline,
    /// Bookmarks were hand-picked, so marketing is tolerated and the bar is lower
    Bookmarks,
    /// No filtering - keep all tweets
    None,
}

impl From<&str> for FilterProfile {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "bookmarks" => FilterProfile::Bookmarks,
            "none" => FilterProfile::None,
            _ => FilterProfile::Timeline, // Default fallback
        }
    }
}

impl FilterProfile {
    /// Built-in options for this profile, or `None` when filtering is disabled
    pub fn options(self) -> Option<FilterOptions> {
        match self {
            FilterProfile::Timeline => Some(FilterOptions {
                min_engagement: 3,
                ..FilterOptions::default()
            }),
            FilterProfile::Bookmarks => Some(FilterOptions {
                min_engagement: 2,
                filter_marketing: false,
                ..FilterOptions::default()
            }),
            FilterProfile::None => None,
        }
    }

    /// Options for tweets headed to AI analysis. Analysis is always
    /// quality-filtered, so a command without a profile falls back to
    /// options derived from config alone.
    pub fn analysis_options(self, config: &FiltersConfig) -> FilterOptions {
        match self.options() {
            Some(options) => options.with_config(config),
            None => FilterOptions::from_config(config),
        }
    }
}

/// Switches for the content filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOptions {
    pub min_engagement: u64,
    pub filter_marketing: bool,
    pub filter_self_improvement: bool,
    /// Covers both the spam and the low-quality pattern lists
    pub filter_spam: bool,
    pub custom_keywords: Vec<String>,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            min_engagement: 3,
            filter_marketing: true,
            filter_self_improvement: true,
            filter_spam: true,
            custom_keywords: Vec::new(),
        }
    }
}

impl FilterOptions {
    /// Apply the `filters` config section on top of these options.
    ///
    /// `enabled: false` turns off every pattern check; an explicit
    /// `min_engagement` wins over the profile's threshold.
    pub fn with_config(mut self, config: &FiltersConfig) -> Self {
        if !config.enabled {
            self.filter_marketing = false;
            self.filter_self_improvement = false;
            self.filter_spam = false;
        }
        if let Some(min) = config.min_engagement {
            self.min_engagement = min;
        }
        if !config.custom_keywords.is_empty() {
            self.custom_keywords = config.custom_keywords.clone();
        }
        self
    }

    /// Options derived purely from config, mapping the legacy `min_score`
    /// onto an engagement threshold (`min_score / 10`).
    pub fn from_config(config: &FiltersConfig) -> Self {
        let base = Self {
            min_engagement: config.min_score / 10,
            ..Self::default()
        };
        base.with_config(config)
    }
}

/// Verdict for a single tweet
#[derive(Debug, Clone, PartialEq)]
pub struct FilterVerdict<'a> {
    pub tweet: &'a Tweet,
    pub passed: bool,
    pub reason: Option<String>,
    pub score: f64,
}

/// Filter trait for deciding whether tweets are worth keeping
pub trait TweetFilter {
    fn filter_tweet<'a>(&self, tweet: &'a Tweet) -> FilterVerdict<'a>;

    /// Filter a batch, preserving input order.
    /// Returns the passing tweets and every verdict.
    fn filter_tweets<'a>(&self, tweets: &'a [Tweet]) -> (Vec<&'a Tweet>, Vec<FilterVerdict<'a>>) {
        let verdicts: Vec<FilterVerdict<'a>> =
            tweets.iter().map(|tweet| self.filter_tweet(tweet)).collect();
        let passed = verdicts
            .iter()
            .filter(|v| v.passed)
            .map(|v| v.tweet)
            .collect();
        (passed, verdicts)
    }
}

/// Keeps everything (`--no-filter`)
pub struct PassThrough;

impl TweetFilter for PassThrough {
    fn filter_tweet<'a>(&self, tweet: &'a Tweet) -> FilterVerdict<'a> {
        FilterVerdict {
            tweet,
            passed: true,
            reason: None,
            score: 0.0,
        }
    }
}

/// Heuristic quality filter
pub struct ContentFilter<'p> {
    options: FilterOptions,
    patterns: &'p PatternSet,
    custom_keywords: Vec<String>,
}

impl<'p> ContentFilter<'p> {
    pub fn new(options: FilterOptions, patterns: &'p PatternSet) -> Self {
        let custom_keywords = options
            .custom_keywords
            .iter()
            .map(|k| k.to_lowercase())
            .collect();
        Self {
            options,
            patterns,
            custom_keywords,
        }
    }

    pub fn options(&self) -> &FilterOptions {
        &self.options
    }

    /// Additive quality score plus the soft-failure reasons recorded on the way
    fn score(&self, tweet: &Tweet) -> (f64, Vec<String>) {
        let mut reasons = Vec::new();
        let mut score = 0.0;

        // Engagement (0-40)
        let engagement = tweet.engagement();
        if engagement >= self.options.min_engagement {
            score += (engagement.saturating_mul(2)).min(40) as f64;
        } else {
            reasons.push(format!("Low engagement ({})", engagement));
        }

        // Length (-10 or +20)
        let text_length = tweet.text_len();
        if (50..=500).contains(&text_length) {
            score += 20.0;
        } else if text_length < 20 {
            reasons.push("Too short".to_string());
            score -= 10.0;
        }

        if tweet.has_media() {
            score += 5.0;
        }

        // Unique URLs (0-15)
        let unique_urls: HashSet<&str> = tweet.urls().iter().map(String::as_str).collect();
        score += (unique_urls.len() * 5).min(15) as f64;

        if tweet.is_quote() {
            score += 15.0;
        }

        (score, reasons)
    }

    /// First matching rejection rule, in precedence order
    fn rejection(&self, text: &str) -> Option<&'static str> {
        if self.options.filter_marketing && self.patterns.matches_marketing(text) {
            return Some("Marketing content");
        }
        if self.options.filter_self_improvement && self.patterns.matches_self_improvement(text) {
            return Some("Self-improvement content");
        }
        if self.options.filter_spam {
            if self.patterns.matches_spam(text) {
                return Some("Spam detected");
            }
            if self.patterns.matches_low_quality(text) {
                return Some("Low quality");
            }
        }
        if contains_any(text, &self.custom_keywords) {
            return Some("Matched custom filter");
        }
        None
    }
}

impl TweetFilter for ContentFilter<'_> {
    fn filter_tweet<'a>(&self, tweet: &'a Tweet) -> FilterVerdict<'a> {
        let (score, reasons) = self.score(tweet);

        if let Some(reason) = self.rejection(tweet.text()) {
            tracing::debug!(id = tweet.id(), reason, score, "tweet rejected");
            return FilterVerdict {
                tweet,
                passed: false,
                reason: Some(reason.to_string()),
                score,
            };
        }

        // Recorded reasons veto a pass regardless of score
        let passed = score >= PASS_SCORE && reasons.is_empty();
        tracing::debug!(id = tweet.id(), passed, score, "tweet scored");

        FilterVerdict {
            tweet,
            passed,
            reason: if reasons.is_empty() {
                None
            } else {
                Some(reasons.join("; "))
            },
            score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::test_support::record;
    use crate::types::{Tweet, TweetRecord};
    use serde_json::json;

    const CLEAN_TEXT: &str = "This is a solid update about a release and details.";

    fn tweet_with(text: &str, engagement: i64) -> Tweet {
        Tweet::try_from(TweetRecord {
            reply_count: 0,
            retweet_count: 0,
            like_count: engagement,
            ..record("1", text)
        })
        .unwrap()
    }

    fn no_patterns() -> PatternSet {
        PatternSet::new(&[], &[], &[], &[]).unwrap()
    }

    #[test]
    fn test_clean_tweet_scores_sixty_and_passes() {
        let patterns = PatternSet::default();
        let filter = ContentFilter::new(FilterOptions::default(), &patterns);
        let tweet = tweet_with(CLEAN_TEXT, 30);

        let verdict = filter.filter_tweet(&tweet);
        assert_eq!(verdict.score, 60.0);
        assert!(verdict.passed);
        assert_eq!(verdict.reason, None);
    }

    #[test]
    fn test_engagement_points_are_capped() {
        let patterns = no_patterns();
        let filter = ContentFilter::new(FilterOptions::default(), &patterns);

        assert_eq!(filter.filter_tweet(&tweet_with(CLEAN_TEXT, 5)).score, 30.0);
        assert_eq!(filter.filter_tweet(&tweet_with(CLEAN_TEXT, 1000)).score, 60.0);
    }

    #[test]
    fn test_engagement_at_threshold_passes_check() {
        let patterns = no_patterns();
        let options = FilterOptions {
            min_engagement: 15,
            ..FilterOptions::default()
        };
        let filter = ContentFilter::new(options, &patterns);

        let at_threshold = tweet_with(CLEAN_TEXT, 15);
        let verdict = filter.filter_tweet(&at_threshold);
        assert!(verdict.passed);
        assert_eq!(verdict.score, 50.0);

        let below = tweet_with(CLEAN_TEXT, 14);
        let verdict = filter.filter_tweet(&below);
        assert!(!verdict.passed);
        assert_eq!(verdict.reason.as_deref(), Some("Low engagement (14)"));
    }

    #[test]
    fn test_empty_tweet_scores_negative() {
        let patterns = PatternSet::default();
        let filter = ContentFilter::new(FilterOptions::default(), &patterns);
        let tweet = tweet_with("", 0);

        let verdict = filter.filter_tweet(&tweet);
        assert_eq!(verdict.score, -10.0);
        assert!(!verdict.passed);
        assert_eq!(verdict.reason.as_deref(), Some("Low engagement (0); Too short"));
    }

    #[test]
    fn test_marketing_rejects_regardless_of_score() {
        let patterns = PatternSet::default();
        let filter = ContentFilter::new(FilterOptions::default(), &patterns);
        let tweet = tweet_with("Limited time offer on our new developer tooling, buy now!", 1000);

        let verdict = filter.filter_tweet(&tweet);
        assert!(!verdict.passed);
        assert_eq!(verdict.reason.as_deref(), Some("Marketing content"));
        assert_eq!(verdict.score, 60.0);
    }

    #[test]
    fn test_marketing_wins_over_spam() {
        let patterns = PatternSet::default();
        let filter = ContentFilter::new(FilterOptions::default(), &patterns);
        let tweet = tweet_with("Early access giveaway for everyone who replies below", 100);

        let verdict = filter.filter_tweet(&tweet);
        assert_eq!(verdict.reason.as_deref(), Some("Marketing content"));
    }

    #[test]
    fn test_rejection_precedence_chain() {
        let patterns = PatternSet::default();
        let options = FilterOptions {
            custom_keywords: vec!["Crypto".to_string()],
            ..FilterOptions::default()
        };
        let filter = ContentFilter::new(options, &patterns);

        let cases = [
            ("Fixing my morning routine and getting lots done", "Self-improvement content"),
            ("Click here to see what everyone is talking about", "Spam detected"),
            ("rt @someone the original post was great", "Low quality"),
            ("Thoughts on the crypto market structure this week", "Matched custom filter"),
        ];
        for (text, reason) in cases {
            let tweet = tweet_with(text, 100);
            assert_eq!(filter.filter_tweet(&tweet).reason.as_deref(), Some(reason), "{}", text);
        }
    }

    #[test]
    fn test_disabled_checks_are_skipped() {
        let patterns = PatternSet::default();
        let options = FilterOptions {
            filter_marketing: false,
            filter_self_improvement: false,
            filter_spam: false,
            ..FilterOptions::default()
        };
        let filter = ContentFilter::new(options, &patterns);
        let tweet = tweet_with("Buy now: my morning routine giveaway, click here today", 100);

        let verdict = filter.filter_tweet(&tweet);
        assert!(verdict.passed);
    }

    #[test]
    fn test_empty_patterns_do_not_filter_everything() {
        let patterns = no_patterns();
        let options = FilterOptions {
            min_engagement: 1,
            ..FilterOptions::default()
        };
        let filter = ContentFilter::new(options, &patterns);
        let tweet = crate::types::test_support::tweet("123", CLEAN_TEXT);

        let verdict = filter.filter_tweet(&tweet);
        assert!(verdict.passed);
        assert_eq!(verdict.reason, None);
    }

    #[test]
    fn test_reasons_veto_high_score() {
        let patterns = no_patterns();
        let filter = ContentFilter::new(FilterOptions::default(), &patterns);
        // Short text, but media + three links + quote push the score over the bar
        let tweet = Tweet::try_from(TweetRecord {
            media: vec![json!({"type": "photo"})],
            urls: vec![
                "https://a.example".to_string(),
                "https://b.example".to_string(),
                "https://c.example".to_string(),
                "https://d.example".to_string(),
            ],
            quoted_tweet: Some(json!({"id": "9"})),
            ..record("1", "look")
        })
        .unwrap();

        let verdict = filter.filter_tweet(&tweet);
        assert_eq!(verdict.score, 40.0 - 10.0 + 5.0 + 15.0 + 15.0);
        assert!(verdict.score >= PASS_SCORE);
        assert!(!verdict.passed);
        assert_eq!(verdict.reason.as_deref(), Some("Too short"));
    }

    #[test]
    fn test_repeated_url_counts_once() {
        let patterns = no_patterns();
        let filter = ContentFilter::new(FilterOptions::default(), &patterns);
        let text = "Release notes for the new parser are out, read them now";
        let tweet = Tweet::try_from(TweetRecord {
            reply_count: 0,
            retweet_count: 0,
            like_count: 30,
            urls: vec!["https://a.example/x".to_string(); 3],
            ..record("1", text)
        })
        .unwrap();

        // 40 engagement + 20 length + 5 for the single distinct link
        assert_eq!(filter.filter_tweet(&tweet).score, 65.0);
    }

    #[test]
    fn test_low_engagement_vetoes_high_score() {
        let patterns = no_patterns();
        let options = FilterOptions {
            min_engagement: 50,
            ..FilterOptions::default()
        };
        let filter = ContentFilter::new(options, &patterns);
        let tweet = Tweet::try_from(TweetRecord {
            urls: vec!["https://a.example".to_string()],
            quoted_tweet: Some(json!({"id": "9"})),
            ..record("1", CLEAN_TEXT)
        })
        .unwrap();

        let verdict = filter.filter_tweet(&tweet);
        assert_eq!(verdict.score, 40.0);
        assert!(!verdict.passed);
    }

    #[test]
    fn test_filter_tweets_preserves_order() {
        let patterns = PatternSet::default();
        let filter = ContentFilter::new(FilterOptions::default(), &patterns);
        let tweets = vec![
            tweet_with(CLEAN_TEXT, 30),
            tweet_with("", 0),
            tweet_with("Another thoughtful paragraph about compilers and their design", 30),
        ];

        let (passed, verdicts) = filter.filter_tweets(&tweets);
        assert_eq!(verdicts.len(), 3);
        assert_eq!(passed.len(), 2);
        assert!(std::ptr::eq(passed[0], &tweets[0]));
        assert!(std::ptr::eq(passed[1], &tweets[2]));
        assert!(!verdicts[1].passed);
    }

    #[test]
    fn test_pass_through_keeps_everything() {
        let tweets = vec![tweet_with("", 0), tweet_with("buy now", 0)];
        let (passed, verdicts) = PassThrough.filter_tweets(&tweets);
        assert_eq!(passed.len(), 2);
        assert!(verdicts.iter().all(|v| v.passed));
    }

    #[test]
    fn test_profiles() {
        assert_eq!(FilterProfile::from("BOOKMARKS"), FilterProfile::Bookmarks);
        assert_eq!(FilterProfile::from("whatever"), FilterProfile::Timeline);
        assert!(FilterProfile::None.options().is_none());

        let bookmarks = FilterProfile::Bookmarks.options().unwrap();
        assert_eq!(bookmarks.min_engagement, 2);
        assert!(!bookmarks.filter_marketing);
        assert!(bookmarks.filter_spam);
    }

    #[test]
    fn test_options_from_config() {
        let config = FiltersConfig {
            enabled: false,
            min_score: 40,
            ..FiltersConfig::default()
        };
        let options = FilterOptions::from_config(&config);
        assert_eq!(options.min_engagement, 4);
        assert!(!options.filter_marketing);
        assert!(!options.filter_self_improvement);
        assert!(!options.filter_spam);

        let config = FiltersConfig {
            min_engagement: Some(7),
            ..FiltersConfig::default()
        };
        let options = FilterProfile::Timeline.options().unwrap().with_config(&config);
        assert_eq!(options.min_engagement, 7);
        assert!(options.filter_marketing);
    }

    #[test]
    fn test_analysis_options_filter_without_profile() {
        let config = FiltersConfig::default();
        assert_eq!(
            FilterProfile::None.analysis_options(&config),
            FilterOptions::from_config(&config)
        );
        assert_eq!(
            FilterProfile::Bookmarks.analysis_options(&config),
            FilterProfile::Bookmarks.options().unwrap()
        );

        let patterns = PatternSet::default();
        let filter = ContentFilter::new(FilterProfile::None.analysis_options(&config), &patterns);
        let tweets = vec![
            tweet_with(CLEAN_TEXT, 30),
            tweet_with("Limited time offer on our new developer tooling, buy now!", 1000),
        ];
        let (passed, _) = filter.filter_tweets(&tweets);
        assert_eq!(passed.len(), 1);
        assert_eq!(passed[0].text(), CLEAN_TEXT);
    }
}
