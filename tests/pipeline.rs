//! End-to-end checks over bird-shaped JSON: ingest, filter, categorize, render.

use chrono::{NaiveDate, NaiveDateTime};
use news_parser::config::FiltersConfig;
use news_parser::prelude::*;
use news_parser::report;
use news_parser::Category;
use news_parser::types::{tweets_from_api, BirdPayload};

const FIRST_PAGE: &str = r#"{
  "tweets": [
    {
      "id": "100",
      "text": "Announcing version 2 of our parser, faster and smaller than before",
      "createdAt": "Wed Jan 15 10:00:00 +0000 2025",
      "author": {"username": "ferris", "name": "Ferris"},
      "replyCount": 2, "retweetCount": 5, "likeCount": 20
    },
    {
      "id": "101",
      "text": "Source for the parser lives on GitHub, contributions welcome",
      "createdAt": "Wed Jan 15 10:00:00 +0000 2025",
      "author": {"username": "ferris", "name": "Ferris"},
      "replyCount": 1, "retweetCount": 2, "likeCount": 9,
      "entities": {"urls": [{"expanded_url": "https://github.com/ferris/parser"}]}
    },
    {
      "id": "102",
      "text": "🚀 Launching soon, get early access to our course today",
      "createdAt": "Wed Jan 15 10:00:00 +0000 2025",
      "author": {"username": "growth", "name": "Growth Guru"},
      "replyCount": 40, "retweetCount": 40, "likeCount": 400
    },
    {
      "id": "",
      "text": "orphan record without an id"
    }
  ],
  "nextCursor": "page-2"
}"#;

const SECOND_PAGE: &str = r#"[
  {
    "id": "103",
    "text": "Interesting take on borrow checker ergonomics in large codebases",
    "createdAt": "Wed Jan 15 10:00:00 +0000 2025",
    "author": {"username": "quiet", "name": "Quiet Poster"},
    "replyCount": 0, "retweetCount": 0, "likeCount": 1
  },
  {
    "id": "104",
    "text": "What is everyone using for async runtimes these days in production?",
    "createdAt": "Wed Jan 15 10:00:00 +0000 2025",
    "author": {"username": "corro", "name": "Corro"},
    "replyCount": 6, "retweetCount": 1, "likeCount": 10,
    "quotedTweet": null
  },
  {
    "id": "105",
    "text": "Free crypto giveaway for everyone, click here to claim your share",
    "createdAt": "Wed Jan 15 10:00:00 +0000 2025",
    "author": {"username": "spammer", "name": "Totally Real"},
    "replyCount": 10, "retweetCount": 10, "likeCount": 10
  },
  {
    "id": "100",
    "text": "Announcing version 2 of our parser, faster and smaller than before",
    "createdAt": "Wed Jan 15 10:00:00 +0000 2025",
    "author": {"username": "ferris", "name": "Ferris"},
    "replyCount": 2, "retweetCount": 5, "likeCount": 20
  }
]"#;

fn load_fixture() -> Vec<Tweet> {
    let mut tweets = Vec::new();
    for page in [FIRST_PAGE, SECOND_PAGE] {
        let payload: BirdPayload = serde_json::from_str(page).unwrap();
        let (records, _) = payload.into_parts();
        tweets.extend(tweets_from_api(records));
    }
    tweets
}

fn report_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 1, 15)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap()
}

#[test]
fn test_fixture_ingestion() {
    let first: BirdPayload = serde_json::from_str(FIRST_PAGE).unwrap();
    let (records, cursor) = first.into_parts();
    assert_eq!(records.len(), 4);
    assert_eq!(cursor.as_deref(), Some("page-2"));

    // The id-less record is dropped
    let ids: Vec<String> = load_fixture().iter().map(|t| t.id().to_string()).collect();
    assert_eq!(ids, vec!["100", "101", "102", "103", "104", "105", "100"]);
}

#[test]
fn test_timeline_filtering() {
    let tweets = load_fixture();
    let patterns = PatternSet::default();
    let options = FilterProfile::Timeline.options().unwrap();
    let filter = ContentFilter::new(options, &patterns);

    let (passed, verdicts) = filter.filter_tweets(&tweets);

    let passed_ids: Vec<&str> = passed.iter().map(|t| t.id()).collect();
    assert_eq!(passed_ids, vec!["100", "101", "104", "100"]);
    assert_eq!(verdicts.len(), tweets.len());

    let reason = |id: &str| {
        verdicts
            .iter()
            .find(|v| v.tweet.id() == id)
            .and_then(|v| v.reason.clone())
    };
    assert_eq!(reason("102").as_deref(), Some("Marketing content"));
    assert_eq!(reason("103").as_deref(), Some("Low engagement (1)"));
    assert_eq!(reason("105").as_deref(), Some("Spam detected"));
    assert_eq!(reason("100"), None);
}

#[test]
fn test_bookmarks_profile_tolerates_marketing() {
    let tweets = load_fixture();
    let patterns = PatternSet::default();
    let filter = ContentFilter::new(FilterProfile::Bookmarks.options().unwrap(), &patterns);

    let (passed, _) = filter.filter_tweets(&tweets);
    assert!(passed.iter().any(|t| t.id() == "102"));
    assert!(!passed.iter().any(|t| t.id() == "105"));
}

#[test]
fn test_disabled_pattern_checks_leave_only_scoring() {
    let tweets = load_fixture();
    let patterns = PatternSet::default();
    let config = FiltersConfig {
        enabled: false,
        min_engagement: Some(0),
        ..FiltersConfig::default()
    };
    let options = FilterProfile::Timeline.options().unwrap().with_config(&config);
    let filter = ContentFilter::new(options, &patterns);

    // 103 has no reason to reject it, but its score stays below the bar
    let (passed, _) = filter.filter_tweets(&tweets);
    let ids: Vec<&str> = passed.iter().map(|t| t.id()).collect();
    assert_eq!(ids, vec!["100", "101", "102", "104", "105", "100"]);
}

#[test]
fn test_categorize_and_dedup() {
    let tweets = load_fixture();
    let patterns = PatternSet::default();
    let filter = ContentFilter::new(FilterProfile::Timeline.options().unwrap(), &patterns);
    let (passed, _) = filter.filter_tweets(&tweets);

    let mut parser = TweetParser::new();
    let parsed = parser.parse_tweets(passed, "home_timeline");

    assert_eq!(parsed.len(), 3);
    assert_eq!(parsed.metadata.total_parsed, 3);
    assert_eq!(parsed.news[0].id, "100");
    assert_eq!(parsed.resources[0].category, Category::Code);
    assert_eq!(parsed.discussions[0].confidence, 0.7);
    assert!(parser.seen_urls().contains("https://github.com/ferris/parser"));

    // A later batch in the same session yields nothing new
    let again = parser.parse_tweets(&tweets[..2], "home_timeline");
    assert!(again.is_empty());
}

#[test]
fn test_timeline_report_snapshot() {
    let tweets = load_fixture();
    let patterns = PatternSet::default();
    let filter = ContentFilter::new(FilterProfile::Timeline.options().unwrap(), &patterns);
    let (passed, _) = filter.filter_tweets(&tweets);

    let parsed = TweetParser::new().parse_tweets(passed, "home_timeline");
    let markdown = report::render_markdown(&parsed, report_time());

    insta::assert_snapshot!("timeline_report", markdown);
}
