//! LLM analysis of fetched tweets over the Anthropic Messages API.

use crate::config::AgentConfig;
use crate::error::{Error, Result};
use crate::types::Tweet;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const DEFAULT_BASE_URL: &str = "https://api.z.ai/api/anthropic";
pub const DEFAULT_FOCUS: &str = "news and insights";

/// Environment variables checked for an API key, in order
pub const API_KEY_VARS: [&str; 3] = ["ANTHROPIC_AUTH_TOKEN", "ANTHROPIC_API_KEY", "ZAI_API_KEY"];
pub const BASE_URL_VAR: &str = "ANTHROPIC_BASE_URL";

pub const DEFAULT_SYSTEM_PROMPT: &str = include_str!("../prompts/system.md");
pub const DEFAULT_ANALYSIS_PROMPT: &str = include_str!("../prompts/analysis.md");

const ANTHROPIC_VERSION: &str = "2023-06-01";
const CONTINUE_PROMPT: &str = "Continue exactly where you left off.";

/// Substitute `{tweets}` and `{focus}` in a prompt template.
///
/// Any other brace sequence, in the template or in the substituted values,
/// is copied through untouched.
pub fn render_analysis_prompt(template: &str, tweets: &str, focus: &str) -> String {
    let mut out = String::with_capacity(template.len() + tweets.len() + focus.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        if let Some(after) = tail.strip_prefix("{tweets}") {
            out.push_str(tweets);
            rest = after;
        } else if let Some(after) = tail.strip_prefix("{focus}") {
            out.push_str(focus);
            rest = after;
        } else {
            out.push('{');
            rest = &tail[1..];
        }
    }

    out.push_str(rest);
    out
}

/// `@user: text` followed by a link to the tweet
pub fn format_tweet_for_analysis(tweet: &Tweet) -> String {
    format!(
        "@{user}: {text}\n🔗 https://x.com/{user}/status/{id}",
        user = tweet.author_username(),
        text = tweet.text(),
        id = tweet.id()
    )
}

pub fn format_tweets_for_analysis<'a, I>(tweets: I) -> String
where
    I: IntoIterator<Item = &'a Tweet>,
{
    tweets
        .into_iter()
        .map(format_tweet_for_analysis)
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

/// Read a prompt file, or use the built-in default when no path is given
pub fn load_prompt(path: Option<&Path>, default: &str) -> Result<String> {
    match path {
        Some(path) => {
            tracing::debug!("Loading prompt from {}", path.display());
            Ok(fs::read_to_string(path)?)
        }
        None => Ok(default.to_string()),
    }
}

/// USD per million (input, output) tokens
pub fn model_pricing(model: &str) -> (f64, f64) {
    let model = model.to_lowercase();
    if model.contains("opus") {
        (15.0, 75.0)
    } else if model.contains("haiku") {
        (0.80, 4.0)
    } else {
        (3.0, 15.0)
    }
}

/// Cost in USD of a single request
pub fn request_cost(model: &str, usage: &Usage) -> f64 {
    let (input, output) = model_pricing(model);
    (usage.input_tokens as f64 * input + usage.output_tokens as f64 * output) / 1_000_000.0
}

/// Resolved settings for talking to the model
#[derive(Debug, Clone)]
pub struct AgentOptions {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub fallback_model: String,
    pub max_turns: u32,
    pub max_budget_usd: f64,
    pub max_tokens: u32,
    pub system_prompt: String,
}

impl AgentOptions {
    /// Build options from config and the process environment
    pub fn from_config(config: &AgentConfig, system_prompt: String) -> Result<Self> {
        Self::from_config_with(config, system_prompt, |key| std::env::var(key).ok())
    }

    /// Build options from config, resolving the API key and base URL
    /// through `lookup`
    pub fn from_config_with<F>(config: &AgentConfig, system_prompt: String, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = API_KEY_VARS
            .iter()
            .filter_map(|key| lookup(key))
            .map(|value| value.trim().to_string())
            .find(|value| !value.is_empty())
            .ok_or_else(|| {
                Error::Agent(format!(
                    "No API key found. Set {} environment variable.",
                    API_KEY_VARS.join(", ")
                ))
            })?;

        let base_url = lookup(BASE_URL_VAR)
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(Self {
            base_url,
            api_key,
            model: config.model.clone(),
            fallback_model: config.fallback_model.clone(),
            max_turns: config.max_turns,
            max_budget_usd: config.max_budget_usd,
            max_tokens: config.max_tokens,
            system_prompt,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
struct ApiMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: &'a [ApiMessage],
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Usage,
}

impl MessagesResponse {
    fn text(&self) -> String {
        self.content
            .iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text.as_deref())
            .collect()
    }
}

/// Result of an analysis run
#[derive(Debug, Clone)]
pub struct Analysis {
    pub text: String,
    pub model: String,
    pub turns: u32,
    pub cost_usd: f64,
}

/// Sends analysis prompts to the model
#[derive(Debug, Clone)]
pub struct AnalysisAgent {
    client: Client,
    options: AgentOptions,
}

impl AnalysisAgent {
    pub fn new(options: AgentOptions) -> Self {
        Self::with_client(Client::new(), options)
    }

    pub fn with_client(client: Client, options: AgentOptions) -> Self {
        tracing::info!(
            "Agent configured: base_url={} model={}",
            options.base_url,
            options.model
        );
        Self { client, options }
    }

    pub fn options(&self) -> &AgentOptions {
        &self.options
    }

    async fn send(&self, model: &str, messages: &[ApiMessage]) -> Result<MessagesResponse> {
        let url = format!("{}/v1/messages", self.options.base_url);
        let body = MessagesRequest {
            model,
            max_tokens: self.options.max_tokens,
            system: &self.options.system_prompt,
            messages,
        };

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.options.api_key)
            .bearer_auth(&self.options.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Agent(format!("{} returned {}: {}", url, status, body)));
        }

        Ok(response.json().await?)
    }

    /// Send a prompt, following up while the reply is cut off by the token
    /// limit. Stops at `max_turns` or once spending reaches the budget.
    /// The fallback model is tried once if the primary model's first request
    /// fails.
    pub async fn query(&self, prompt: &str) -> Result<Analysis> {
        let mut model = self.options.model.clone();
        let mut messages = vec![ApiMessage {
            role: "user",
            content: prompt.to_string(),
        }];
        let mut text = String::new();
        let mut cost = 0.0;
        let mut turns = 0;

        while turns < self.options.max_turns {
            let response = match self.send(&model, &messages).await {
                Ok(response) => response,
                Err(e) if turns == 0 && model != self.options.fallback_model => {
                    tracing::warn!(
                        "Model {} failed ({}), retrying with {}",
                        model,
                        e,
                        self.options.fallback_model
                    );
                    model = self.options.fallback_model.clone();
                    self.send(&model, &messages).await?
                }
                Err(e) => return Err(e),
            };
            turns += 1;
            cost += request_cost(&model, &response.usage);

            let chunk = response.text();
            text.push_str(&chunk);

            if response.stop_reason.as_deref() != Some("max_tokens") {
                break;
            }
            if cost >= self.options.max_budget_usd {
                tracing::warn!(
                    "Budget of ${:.2} reached after {} turns, stopping",
                    self.options.max_budget_usd,
                    turns
                );
                break;
            }

            messages.push(ApiMessage {
                role: "assistant",
                content: chunk,
            });
            messages.push(ApiMessage {
                role: "user",
                content: CONTINUE_PROMPT.to_string(),
            });
        }

        tracing::info!("Query cost: ${:.4} over {} turn(s)", cost, turns);
        Ok(Analysis {
            text,
            model,
            turns,
            cost_usd: cost,
        })
    }

    /// Analyze already formatted tweets with an analysis template
    pub async fn analyze_tweets(&self, template: &str, tweets: &str, focus: &str) -> Result<Analysis> {
        self.query(&render_analysis_prompt(template, tweets, focus)).await
    }
}
