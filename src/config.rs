use crate::error::{Error, Result};
use crate::patterns::PatternOverrides;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// File name looked up in the working directory and the user config dir
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// `filters` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FiltersConfig {
    /// Master switch for the pattern checks
    pub enabled: bool,
    /// Overrides the per-command engagement threshold when set
    pub min_engagement: Option<u64>,
    /// Legacy score knob; `min_score / 10` becomes the engagement threshold
    /// when options are derived from config alone
    pub min_score: u64,
    pub custom_keywords: Vec<String>,
    pub patterns: Option<PatternOverrides>,
}

impl Default for FiltersConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_engagement: None,
            min_score: 30,
            custom_keywords: Vec::new(),
            patterns: None,
        }
    }
}

/// `agent` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub model: String,
    pub fallback_model: String,
    pub max_turns: u32,
    pub max_budget_usd: f64,
    pub max_tokens: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-5".to_string(),
            fallback_model: "claude-haiku-3-5".to_string(),
            max_turns: 5,
            max_budget_usd: 0.50,
            max_tokens: 4096,
        }
    }
}

/// `prompts` section. Paths are relative to the config file's directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    pub system: Option<PathBuf>,
    pub analysis: Option<PathBuf>,
}

/// Configuration for a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub filters: FiltersConfig,
    pub agent: AgentConfig,
    pub prompts: PromptsConfig,
    pub output_dir: PathBuf,
    /// Directory relative prompt paths resolve against
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            filters: FiltersConfig::default(),
            agent: AgentConfig::default(),
            prompts: PromptsConfig::default(),
            output_dir: PathBuf::from("output"),
            base_dir: PathBuf::from("."),
        }
    }
}

impl Config {
    /// Parse a YAML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let mut config: Config = if contents.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(&contents)?
        };
        config.base_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.agent.max_turns == 0 {
            return Err(Error::Config("agent.max_turns must be at least 1".to_string()));
        }

        if !self.agent.max_budget_usd.is_finite() || self.agent.max_budget_usd < 0.0 {
            return Err(Error::Config(format!(
                "agent.max_budget_usd must be a non-negative number, got {}",
                self.agent.max_budget_usd
            )));
        }

        if self.agent.model.trim().is_empty() {
            return Err(Error::Config("agent.model cannot be empty".to_string()));
        }

        Ok(())
    }

    /// Resolve a prompt path from the config against its base directory
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

/// Get the user config file: $HOME/.config/news-parser/config.yaml
pub fn user_config_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .ok()
        .map(|home| {
            PathBuf::from(home)
                .join(".config")
                .join("news-parser")
                .join(CONFIG_FILE_NAME)
        })
}

/// Load configuration, falling back to defaults.
///
/// Checks the explicit path first, then `config.yaml` in the working
/// directory, then the user config file. Returns defaults when none exist.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let mut candidates = Vec::new();
    if let Some(path) = explicit {
        candidates.push(path.to_path_buf());
    }
    candidates.push(PathBuf::from(CONFIG_FILE_NAME));
    candidates.extend(user_config_path());

    for path in candidates {
        if path.exists() {
            tracing::info!("Loading config from: {}", path.display());
            return Config::from_file(&path);
        }
        if explicit == Some(path.as_path()) {
            tracing::warn!("Config file not found: {}", path.display());
        }
    }

    Ok(Config::default())
}

/// Builder for creating configurations
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an already loaded configuration
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    /// Set the report output directory
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    /// Enable or disable the pattern checks
    pub fn filters_enabled(mut self, enabled: bool) -> Self {
        self.config.filters.enabled = enabled;
        self
    }

    /// Set the engagement threshold
    pub fn min_engagement(mut self, min: u64) -> Self {
        self.config.filters.min_engagement = Some(min);
        self
    }

    /// Add a custom keyword to filter out
    pub fn add_custom_keyword(mut self, keyword: impl Into<String>) -> Self {
        let keyword = keyword.into();
        if !self.config.filters.custom_keywords.contains(&keyword) {
            self.config.filters.custom_keywords.push(keyword);
        }
        self
    }

    /// Set custom keywords from a comma-separated string
    pub fn custom_keywords_str(mut self, keywords: &str) -> Result<Self> {
        if keywords.is_empty() {
            self.config.filters.custom_keywords = vec![];
            return Ok(self);
        }

        let parsed: Result<Vec<String>> = keywords
            .split(',')
            .map(|s| {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Err(Error::Config("Empty custom keyword".to_string()));
                }
                Ok(trimmed.to_string())
            })
            .collect();

        self.config.filters.custom_keywords = parsed?;
        Ok(self)
    }

    /// Override the filter pattern lists
    pub fn patterns(mut self, patterns: PatternOverrides) -> Self {
        self.config.filters.patterns = Some(patterns);
        self
    }

    /// Set the agent model
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.agent.model = model.into();
        self
    }

    /// Set the maximum number of agent turns
    pub fn max_turns(mut self, turns: u32) -> Self {
        self.config.agent.max_turns = turns;
        self
    }

    /// Set the agent spending cap
    pub fn max_budget_usd(mut self, budget: f64) -> Self {
        self.config.agent.max_budget_usd = budget;
        self
    }

    /// Build the final configuration
    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}
