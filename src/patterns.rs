//! Pattern lists driving the content filter's rejection rules.
//!
//! A [`PatternSet`] holds four lists: regexes for marketing, spam and
//! low-quality content, and literal keywords for self-improvement content.
//! Regexes are compiled once, case-insensitively, and a category matches when
//! any of its patterns matches.

use crate::error::Result;
use regex::{RegexSet, RegexSetBuilder};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default marketing patterns
pub const MARKETING_PATTERNS: &[&str] = &[
    r"🚀",
    r"launching\s+soon",
    r"early\s+access",
    r"limited\s+time",
    r"\d+%\s+off",
    r"buy\s+now",
    r"shop\s+now",
    r"link\s+in\s+bio",
    r"follow\s+for\s+more",
    r"dm\s+me",
    r"subscribe\s+now",
];

/// Default self-improvement keywords (substring match)
pub const SELF_IMPROVEMENT_KEYWORDS: &[&str] = &[
    "morning routine",
    "productivity hack",
    "life coach",
    "mindset",
    "grindset",
    "hustle",
    "10x",
    "growth mindset",
    "affirmation",
    "manifest",
    "self-care",
    "wellness tips",
    "habit tracker",
];

/// Default spam patterns
pub const SPAM_PATTERNS: &[&str] = &[
    r"(?:https?://t\.co/)\S{10}",
    r"free\s+(?:money|crypto|btc|eth)",
    r"click\s+here",
    r"claim\s+now",
    r"giveaway",
    r"contest\s+alert",
];

/// Default low-quality patterns
pub const LOW_QUALITY_PATTERNS: &[&str] = &[
    r"^rt\s+",
    r"^\s*[👍❤️😂🔥]+",
    r"^\s*\.\s*$",
    r"this\.",
    r"^wow$",
    r"^amazing$",
    r"^incredible$",
];

fn owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Per-category overrides as they appear in YAML (either a standalone
/// patterns file or the `filters.patterns` section of the main config).
/// A missing key keeps the built-in default for that category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marketing: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_improvement: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spam: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low_quality: Option<Vec<String>>,
}

impl PatternOverrides {
    /// True when no category is overridden
    pub fn is_empty(&self) -> bool {
        self.marketing.is_none()
            && self.self_improvement.is_none()
            && self.spam.is_none()
            && self.low_quality.is_none()
    }

    /// Read overrides from a YAML file.
    ///
    /// Returns `Ok(None)` when the file is absent or cannot be read, so the
    /// caller falls back to defaults. A file that exists but is not valid
    /// YAML is an error.
    pub fn from_file(path: &Path) -> Result<Option<Self>> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                tracing::warn!(
                    "Patterns file {} unavailable ({}), using defaults",
                    path.display(),
                    e
                );
                return Ok(None);
            }
        };

        // An empty document deserializes to unit, not a mapping
        if contents.trim().is_empty() {
            return Ok(Some(Self::default()));
        }

        Ok(Some(serde_yaml::from_str(&contents)?))
    }
}

/// Compiled pattern lists. Immutable once built.
#[derive(Debug, Clone)]
pub struct PatternSet {
    marketing: RegexSet,
    self_improvement: Vec<String>,
    spam: RegexSet,
    low_quality: RegexSet,
}

fn compile(patterns: &[String]) -> Result<RegexSet> {
    Ok(RegexSetBuilder::new(patterns)
        .case_insensitive(true)
        .build()?)
}

impl PatternSet {
    /// Compile a pattern set from explicit lists
    pub fn new(
        marketing: &[String],
        self_improvement: &[String],
        spam: &[String],
        low_quality: &[String],
    ) -> Result<Self> {
        Ok(Self {
            marketing: compile(marketing)?,
            self_improvement: self_improvement.iter().map(|k| k.to_lowercase()).collect(),
            spam: compile(spam)?,
            low_quality: compile(low_quality)?,
        })
    }

    /// Compile overrides, filling any missing category from the defaults
    pub fn from_overrides(overrides: &PatternOverrides) -> Result<Self> {
        let pick = |list: &Option<Vec<String>>, default: &[&str]| {
            list.clone().unwrap_or_else(|| owned(default))
        };

        Self::new(
            &pick(&overrides.marketing, MARKETING_PATTERNS),
            &pick(&overrides.self_improvement, SELF_IMPROVEMENT_KEYWORDS),
            &pick(&overrides.spam, SPAM_PATTERNS),
            &pick(&overrides.low_quality, LOW_QUALITY_PATTERNS),
        )
    }

    /// Resolve the pattern set for a run.
    ///
    /// Precedence: a non-empty `filters.patterns` config section, then the
    /// patterns file, then the built-in defaults. A `filters.patterns`
    /// section with no keys set still defers to the patterns file.
    pub fn load(config: Option<&PatternOverrides>, patterns_file: Option<&Path>) -> Result<Self> {
        if let Some(overrides) = config.filter(|o| !o.is_empty()) {
            tracing::debug!("Using filter patterns from config");
            return Self::from_overrides(overrides);
        }

        if let Some(path) = patterns_file {
            if let Some(overrides) = PatternOverrides::from_file(path)? {
                tracing::debug!("Using filter patterns from {}", path.display());
                return Self::from_overrides(&overrides);
            }
        }

        Ok(Self::default())
    }

    pub fn matches_marketing(&self, text: &str) -> bool {
        self.marketing.is_match(text)
    }

    pub fn matches_self_improvement(&self, text: &str) -> bool {
        contains_any(text, &self.self_improvement)
    }

    pub fn matches_spam(&self, text: &str) -> bool {
        self.spam.is_match(text)
    }

    pub fn matches_low_quality(&self, text: &str) -> bool {
        self.low_quality.is_match(text)
    }
}

impl Default for PatternSet {
    fn default() -> Self {
        Self::from_overrides(&PatternOverrides::default())
            .expect("built-in filter patterns must compile")
    }
}

/// Case-insensitive substring match against any keyword.
/// Keywords are expected to be lower-cased already.
pub fn contains_any(text: &str, keywords: &[String]) -> bool {
    if keywords.is_empty() {
        return false;
    }
    let lower = text.to_lowercase();
    keywords.iter().any(|k| lower.contains(k.as_str()))
}
