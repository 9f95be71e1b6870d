//! Wrapper around the `bird` CLI, which fetches X/Twitter content as JSON.

use crate::error::{Error, Result};
use crate::types::{tweets_from_api, BirdPayload, Tweet};
use async_stream::stream;
use futures::{Stream, StreamExt};
use serde_json::Value;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

/// Environment variables holding headless auth tokens, forwarded to bird
pub const AUTH_ENV_VARS: [&str; 2] = ["AUTH_TOKEN", "CT0"];

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const WHOAMI_TIMEOUT: Duration = Duration::from_secs(10);

/// Default page limit for `fetch_all_bookmarks` (~20 bookmarks per page)
pub const DEFAULT_MAX_PAGES: usize = 10;

/// Collect auth tokens to forward: trimmed, and only when non-empty
pub fn auth_env_from<F>(lookup: F) -> BTreeMap<&'static str, String>
where
    F: Fn(&str) -> Option<String>,
{
    AUTH_ENV_VARS
        .iter()
        .filter_map(|&key| {
            let value = lookup(key)?;
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some((key, trimmed.to_string()))
            }
        })
        .collect()
}

/// Auth tokens from the process environment
pub fn auth_env() -> BTreeMap<&'static str, String> {
    auth_env_from(|key| std::env::var(key).ok())
}

/// Client for the bird CLI
#[derive(Debug, Clone)]
pub struct BirdClient {
    count: usize,
    timeout: Duration,
    program: OsString,
    base_args: Vec<OsString>,
}

impl BirdClient {
    /// Create a client fetching `count` items per request by default
    pub fn new(count: usize) -> Self {
        Self {
            count,
            timeout: DEFAULT_TIMEOUT,
            program: OsString::from("bird"),
            base_args: Vec::new(),
        }
    }

    /// Run a different executable (plus leading arguments) instead of `bird`
    pub fn with_program(mut self, program: impl Into<OsString>, base_args: Vec<OsString>) -> Self {
        self.program = program.into();
        self.base_args = base_args;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn count(&self) -> usize {
        self.count
    }

    fn command(&self, args: &[String]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.base_args).args(args).kill_on_drop(true);

        let tokens = auth_env();
        for key in AUTH_ENV_VARS {
            match tokens.get(key) {
                Some(value) => {
                    cmd.env(key, value);
                }
                None => {
                    cmd.env_remove(key);
                }
            }
        }
        cmd
    }

    async fn output(&self, args: &[String], timeout: Duration) -> Result<Output> {
        tracing::debug!("Running: bird {}", args.join(" "));
        match tokio::time::timeout(timeout, self.command(args).output()).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(Error::Fetch(format!(
                "`bird {}` timed out after {}s",
                args.first().map(String::as_str).unwrap_or(""),
                timeout.as_secs()
            ))),
        }
    }

    /// Run `bird <command> --json [args]` and return one page of records
    async fn run_page(&self, command: &str, extra: &[String]) -> Result<(Vec<Value>, Option<String>)> {
        let mut args = vec![command.to_string(), "--json".to_string()];
        args.extend_from_slice(extra);

        let output = self.output(&args, self.timeout).await?;
        if !output.status.success() {
            return Err(Error::Fetch(format!(
                "`bird {}` exited with {}: {}",
                command,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        if stdout.trim().is_empty() {
            return Ok((Vec::new(), None));
        }

        match serde_json::from_str::<BirdPayload>(&stdout) {
            Ok(payload) => Ok(payload.into_parts()),
            Err(e) => {
                let preview: String = stdout.chars().take(500).collect();
                tracing::error!("Failed to parse bird output: {}", preview);
                Err(e.into())
            }
        }
    }

    async fn fetch(&self, command: &str, extra: Vec<String>) -> Result<Vec<Tweet>> {
        let (records, _) = self.run_page(command, &extra).await?;
        Ok(tweets_from_api(records))
    }

    fn count_args(&self, count: Option<usize>) -> Vec<String> {
        vec!["--count".to_string(), count.unwrap_or(self.count).to_string()]
    }

    /// Fetch the home timeline ("For You" feed)
    pub async fn fetch_home_timeline(&self, count: Option<usize>) -> Result<Vec<Tweet>> {
        tracing::info!("Fetching home timeline ({} tweets)", count.unwrap_or(self.count));
        self.fetch("home", self.count_args(count)).await
    }

    /// Fetch bookmarked tweets
    pub async fn fetch_bookmarks(&self, count: Option<usize>) -> Result<Vec<Tweet>> {
        tracing::info!("Fetching bookmarks ({} tweets)", count.unwrap_or(self.count));
        self.fetch("bookmarks", self.count_args(count)).await
    }

    /// Fetch a user's tweets. The handle may carry a leading `@`.
    pub async fn fetch_user_tweets(&self, handle: &str, count: Option<usize>) -> Result<Vec<Tweet>> {
        let handle = handle.trim_start_matches('@');
        tracing::info!("Fetching tweets from @{} ({} tweets)", handle, count.unwrap_or(self.count));
        let mut args = vec![handle.to_string()];
        args.extend(self.count_args(count));
        self.fetch("user-tweets", args).await
    }

    /// Search for tweets matching a query
    pub async fn search_tweets(&self, query: &str, count: Option<usize>) -> Result<Vec<Tweet>> {
        tracing::info!("Searching for '{}' ({} tweets)", query, count.unwrap_or(self.count));
        let mut args = vec![query.to_string()];
        args.extend(self.count_args(count));
        self.fetch("search", args).await
    }

    /// Stream bookmark pages, one `bird` call per page, following the cursor.
    ///
    /// Stops at `max_pages`, on the first failing or empty call, on
    /// unparseable output, or when no cursor is returned.
    pub fn bookmark_pages(&self, max_pages: usize) -> impl Stream<Item = Vec<Tweet>> + '_ {
        Box::pin(stream! {
            let mut cursor: Option<String> = None;

            for page in 1..=max_pages {
                tracing::info!("Fetching bookmarks page {}", page);
                let mut args = vec![
                    "--all".to_string(),
                    "--max-pages".to_string(),
                    "1".to_string(),
                ];
                if let Some(c) = &cursor {
                    args.push("--cursor".to_string());
                    args.push(c.clone());
                }

                let (records, next) = match self.run_page("bookmarks", &args).await {
                    Ok(parts) => parts,
                    Err(e) => {
                        tracing::warn!("Stopping at bookmarks page {}: {}", page, e);
                        break;
                    }
                };

                if records.is_empty() && next.is_none() {
                    break;
                }

                yield tweets_from_api(records);

                match next {
                    Some(c) => cursor = Some(c),
                    None => break,
                }
            }
        })
    }

    /// Fetch all bookmarks using cursor pagination
    pub async fn fetch_all_bookmarks(&self, max_pages: usize) -> Vec<Tweet> {
        let pages: Vec<Vec<Tweet>> = self.bookmark_pages(max_pages).collect().await;
        let all: Vec<Tweet> = pages.into_iter().flatten().collect();
        tracing::info!("Fetched {} total bookmarks", all.len());
        all
    }

    /// Check that bird is installed and authenticated
    pub async fn verify_credentials(&self) -> bool {
        match self.output(&["whoami".to_string()], WHOAMI_TIMEOUT).await {
            Ok(output) if output.status.success() => {
                String::from_utf8_lossy(&output.stdout).contains('@')
            }
            Ok(_) => {
                tracing::warn!("bird CLI not authenticated or command failed");
                false
            }
            Err(Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("bird CLI not found on PATH");
                false
            }
            Err(e) => {
                tracing::warn!("bird CLI check failed: {}", e);
                false
            }
        }
    }
}

impl Default for BirdClient {
    fn default() -> Self {
        Self::new(50)
    }
}
