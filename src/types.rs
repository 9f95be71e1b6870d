use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A validated tweet. Fields are private so a `Tweet` can only be obtained
/// through [`Tweet::try_from`], which enforces the identity and counter
/// invariants.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tweet {
    id: String,
    text: String,
    created_at: String,
    author_username: String,
    author_name: String,
    author_id: String,
    reply_count: u64,
    retweet_count: u64,
    like_count: u64,
    conversation_id: String,
    media: Vec<Value>,
    quoted_tweet: Option<Value>,
    urls: Vec<String>,
    mentions: Vec<String>,
    hashtags: Vec<String>,
}

/// Unvalidated tweet fields, as assembled from an API record or by hand.
///
/// Counters are signed so that bad upstream data can be represented and
/// rejected instead of silently wrapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TweetRecord {
    pub id: String,
    pub text: String,
    pub created_at: String,
    pub author_username: String,
    pub author_name: String,
    pub author_id: String,
    pub reply_count: i64,
    pub retweet_count: i64,
    pub like_count: i64,
    pub conversation_id: String,
    pub media: Vec<Value>,
    pub quoted_tweet: Option<Value>,
    pub urls: Vec<String>,
    pub mentions: Vec<String>,
    pub hashtags: Vec<String>,
}

fn non_negative(value: i64, what: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| Error::InvalidItem(format!("{} cannot be negative", what)))
}

impl TryFrom<TweetRecord> for Tweet {
    type Error = Error;

    fn try_from(record: TweetRecord) -> Result<Self> {
        if record.id.is_empty() {
            return Err(Error::InvalidItem("Tweet ID cannot be empty".to_string()));
        }
        if record.author_username.is_empty() {
            return Err(Error::InvalidItem(
                "Author username cannot be empty".to_string(),
            ));
        }
        if record.author_name.is_empty() {
            return Err(Error::InvalidItem("Author name cannot be empty".to_string()));
        }

        Ok(Self {
            reply_count: non_negative(record.reply_count, "Reply count")?,
            retweet_count: non_negative(record.retweet_count, "Retweet count")?,
            like_count: non_negative(record.like_count, "Like count")?,
            id: record.id,
            text: record.text,
            created_at: record.created_at,
            author_username: record.author_username,
            author_name: record.author_name,
            author_id: record.author_id,
            conversation_id: record.conversation_id,
            media: record.media,
            quoted_tweet: record.quoted_tweet,
            urls: record.urls,
            mentions: record.mentions,
            hashtags: record.hashtags,
        })
    }
}

impl Tweet {
    /// Build a tweet from a raw bird record
    pub fn from_api(data: ApiTweet) -> Result<Self> {
        Self::try_from(TweetRecord::from(data))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn created_at(&self) -> &str {
        &self.created_at
    }

    pub fn author_username(&self) -> &str {
        &self.author_username
    }

    pub fn author_name(&self) -> &str {
        &self.author_name
    }

    pub fn author_id(&self) -> &str {
        &self.author_id
    }

    pub fn reply_count(&self) -> u64 {
        self.reply_count
    }

    pub fn retweet_count(&self) -> u64 {
        self.retweet_count
    }

    pub fn like_count(&self) -> u64 {
        self.like_count
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    pub fn media(&self) -> &[Value] {
        &self.media
    }

    pub fn quoted_tweet(&self) -> Option<&Value> {
        self.quoted_tweet.as_ref()
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    pub fn mentions(&self) -> &[String] {
        &self.mentions
    }

    pub fn hashtags(&self) -> &[String] {
        &self.hashtags
    }

    /// Total engagement: replies + retweets + likes
    pub fn engagement(&self) -> u64 {
        self.reply_count + self.retweet_count + self.like_count
    }

    pub fn has_media(&self) -> bool {
        !self.media.is_empty()
    }

    pub fn is_quote(&self) -> bool {
        self.quoted_tweet.is_some()
    }

    /// Length of the text in characters (not bytes)
    pub fn text_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// A tweet as emitted by `bird ... --json`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiTweet {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub author: Option<ApiAuthor>,
    #[serde(default)]
    pub author_id: Option<String>,
    #[serde(default)]
    pub reply_count: Option<i64>,
    #[serde(default)]
    pub retweet_count: Option<i64>,
    #[serde(default)]
    pub like_count: Option<i64>,
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub media: Option<Vec<Value>>,
    #[serde(default)]
    pub quoted_tweet: Option<Value>,
    #[serde(default)]
    pub entities: Option<ApiEntities>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiAuthor {
    pub username: Option<String>,
    pub name: Option<String>,
}

/// Entity lists may be missing or `null`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiEntities {
    #[serde(default)]
    pub urls: Option<Vec<ApiUrl>>,
    #[serde(default)]
    pub user_mentions: Option<Vec<ApiMention>>,
    #[serde(default)]
    pub hashtags: Option<Vec<ApiHashtag>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiUrl {
    pub expanded_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiMention {
    pub screen_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiHashtag {
    pub text: Option<String>,
}

impl From<ApiTweet> for TweetRecord {
    fn from(data: ApiTweet) -> Self {
        let author = data.author.unwrap_or_default();
        let entities = data.entities.unwrap_or_default();

        Self {
            id: data.id,
            text: data.text,
            created_at: data.created_at,
            author_username: author.username.unwrap_or_else(|| "unknown".to_string()),
            author_name: author.name.unwrap_or_else(|| "Unknown".to_string()),
            author_id: data.author_id.unwrap_or_default(),
            reply_count: data.reply_count.unwrap_or(0),
            retweet_count: data.retweet_count.unwrap_or(0),
            like_count: data.like_count.unwrap_or(0),
            conversation_id: data.conversation_id.unwrap_or_default(),
            media: data.media.unwrap_or_default(),
            // `null` in the payload means "not a quote"
            quoted_tweet: data.quoted_tweet.filter(|q| !q.is_null()),
            urls: entities
                .urls
                .unwrap_or_default()
                .into_iter()
                .filter_map(|u| u.expanded_url)
                .collect(),
            mentions: entities
                .user_mentions
                .unwrap_or_default()
                .into_iter()
                .filter_map(|m| m.screen_name)
                .collect(),
            hashtags: entities
                .hashtags
                .unwrap_or_default()
                .into_iter()
                .filter_map(|h| h.text)
                .collect(),
        }
    }
}

/// Shape of bird's JSON output: either a bare list or a wrapper object.
///
/// Records stay as raw JSON here so that one malformed record cannot fail
/// the whole page; [`tweets_from_api`] decodes them one by one.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum BirdPayload {
    List(Vec<Value>),
    Page {
        #[serde(default)]
        tweets: Option<Vec<Value>>,
        #[serde(default)]
        data: Option<Vec<Value>>,
        #[serde(default, rename = "nextCursor")]
        next_cursor: Option<String>,
    },
}

impl BirdPayload {
    /// Split the payload into its records and the pagination cursor, if any
    pub fn into_parts(self) -> (Vec<Value>, Option<String>) {
        match self {
            BirdPayload::List(tweets) => (tweets, None),
            BirdPayload::Page {
                tweets,
                data,
                next_cursor,
            } => {
                let records = match tweets {
                    Some(t) if !t.is_empty() => t,
                    _ => data.unwrap_or_default(),
                };
                (records, next_cursor.filter(|c| !c.is_empty()))
            }
        }
    }
}

fn decode_record(record: Value) -> Result<Tweet> {
    let data: ApiTweet = serde_json::from_value(record)?;
    Tweet::from_api(data)
}

/// Convert raw records into tweets, skipping any that are malformed or
/// fail validation
pub fn tweets_from_api(records: Vec<Value>) -> Vec<Tweet> {
    records
        .into_iter()
        .filter_map(|record| match decode_record(record) {
            Ok(tweet) => Some(tweet),
            Err(e) => {
                tracing::warn!("Skipping record: {}", e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// A valid record with the given text and ten of each engagement counter
    pub fn record(id: &str, text: &str) -> TweetRecord {
        TweetRecord {
            id: id.to_string(),
            text: text.to_string(),
            created_at: "2024-01-01".to_string(),
            author_username: "testuser".to_string(),
            author_name: "Test User".to_string(),
            author_id: "456".to_string(),
            reply_count: 10,
            retweet_count: 10,
            like_count: 10,
            conversation_id: "789".to_string(),
            ..Default::default()
        }
    }

    pub fn tweet(id: &str, text: &str) -> Tweet {
        Tweet::try_from(record(id, text)).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::record;
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_tweet() {
        let tweet = Tweet::try_from(record("123", "Test tweet")).unwrap();
        assert_eq!(tweet.id(), "123");
        assert_eq!(tweet.engagement(), 30);
        assert!(!tweet.has_media());
        assert!(!tweet.is_quote());
    }

    #[test]
    fn test_empty_id_rejected() {
        let err = Tweet::try_from(record("", "Test")).unwrap_err();
        assert!(err.to_string().contains("Tweet ID cannot be empty"));
    }

    #[test]
    fn test_empty_author_rejected() {
        let mut r = record("1", "Test");
        r.author_username.clear();
        assert!(Tweet::try_from(r).is_err());

        let mut r = record("1", "Test");
        r.author_name.clear();
        assert!(Tweet::try_from(r).is_err());
    }

    #[test]
    fn test_negative_counters_rejected() {
        for field in 0..3 {
            let mut r = record("1", "Test");
            match field {
                0 => r.reply_count = -1,
                1 => r.retweet_count = -1,
                _ => r.like_count = -1,
            }
            let err = Tweet::try_from(r).unwrap_err();
            assert!(err.to_string().contains("cannot be negative"));
        }
    }

    #[test]
    fn test_from_api_record() {
        let data: ApiTweet = serde_json::from_value(json!({
            "id": "42",
            "text": "Look at https://example.com/post",
            "createdAt": "Wed Jan 01 00:00:00 +0000 2025",
            "author": {"username": "rustlang", "name": "Rust"},
            "authorId": "7",
            "replyCount": 2,
            "retweetCount": 3,
            "likeCount": 4,
            "conversationId": "42",
            "media": [{"type": "photo"}],
            "quotedTweet": {"id": "41"},
            "entities": {
                "urls": [{"expanded_url": "https://example.com/post"}, {"url": "https://t.co/x"}],
                "user_mentions": [{"screen_name": "ferris"}],
                "hashtags": [{"text": "rust"}]
            }
        }))
        .unwrap();

        let tweet = Tweet::from_api(data).unwrap();
        assert_eq!(tweet.author_username(), "rustlang");
        assert_eq!(tweet.engagement(), 9);
        assert!(tweet.has_media());
        assert!(tweet.is_quote());
        assert_eq!(tweet.urls(), ["https://example.com/post".to_string()]);
        assert_eq!(tweet.mentions(), ["ferris".to_string()]);
        assert_eq!(tweet.hashtags(), ["rust".to_string()]);
    }

    #[test]
    fn test_from_api_defaults() {
        let data: ApiTweet =
            serde_json::from_value(json!({"id": "1", "text": "hi", "createdAt": "now"})).unwrap();
        let tweet = Tweet::from_api(data).unwrap();
        assert_eq!(tweet.author_username(), "unknown");
        assert_eq!(tweet.author_name(), "Unknown");
        assert_eq!(tweet.engagement(), 0);
        assert!(tweet.urls().is_empty());
    }

    #[test]
    fn test_null_quote_is_not_quote() {
        let data: ApiTweet = serde_json::from_value(
            json!({"id": "1", "text": "hi", "createdAt": "now", "quotedTweet": null}),
        )
        .unwrap();
        assert!(!Tweet::from_api(data).unwrap().is_quote());
    }

    #[test]
    fn test_payload_shapes() {
        let list: BirdPayload = serde_json::from_str(r#"[{"id": "1", "text": "a"}]"#).unwrap();
        let (records, cursor) = list.into_parts();
        assert_eq!(records.len(), 1);
        assert!(cursor.is_none());

        let page: BirdPayload =
            serde_json::from_str(r#"{"tweets": [], "data": [{"id": "2"}], "nextCursor": "abc"}"#)
                .unwrap();
        let (records, cursor) = page.into_parts();
        assert_eq!(records[0]["id"], "2");
        assert_eq!(cursor.as_deref(), Some("abc"));
    }

    #[test]
    fn test_invalid_records_skipped() {
        let records = vec![
            json!({"id": "1"}),
            json!({"id": ""}),
            json!({"id": "3", "likeCount": -5}),
        ];
        let tweets = tweets_from_api(records);
        assert_eq!(tweets.len(), 1);
        assert_eq!(tweets[0].id(), "1");
    }

    #[test]
    fn test_malformed_record_does_not_sink_page() {
        let page: BirdPayload = serde_json::from_str(
            r#"{"tweets": [
                {"id": "1", "text": "good one"},
                {"id": "2", "text": "mention", "entities": {"user_mentions": [{"id_str": "9"}]}},
                {"id": "3", "text": "null urls", "entities": {"urls": null, "hashtags": [{}]}},
                {"id": 4, "text": "numeric id"},
                {"id": "5", "text": "bad counter", "likeCount": "many"}
            ], "nextCursor": "next"}"#,
        )
        .unwrap();
        let (records, cursor) = page.into_parts();
        assert_eq!(records.len(), 5);
        assert_eq!(cursor.as_deref(), Some("next"));

        let tweets = tweets_from_api(records);
        let ids: Vec<&str> = tweets.iter().map(|t| t.id()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert!(tweets[1].mentions().is_empty());
        assert!(tweets[2].urls().is_empty());
        assert!(tweets[2].hashtags().is_empty());
    }
}
