//! Configuration for the classifier
//!
//! The configuration is a typed structure loaded from TOML. Unknown keys are
//! rejected when the configuration is built, so a typo never silently falls
//! back to a default.

use crate::error::{B8Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;

const ROOT_KEYS: &[&str] = &[
    "min_dev",
    "rob_s",
    "rob_x",
    "use_relevant",
    "lexer",
    "degenerator",
    "storage",
    "logging",
];

const LEXER_KEYS: &[&str] = &[
    "min_size",
    "max_size",
    "allow_numbers",
    "get_uris",
    "get_html",
    "get_bbcode",
    "stopwords",
];

const DEGENERATOR_KEYS: &[&str] = &["multibyte"];
const STORAGE_KEYS: &[&str] = &["database_url"];
const LOGGING_KEYS: &[&str] = &["level", "format"];

/// Main classifier configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct B8Config {
    /// Minimum deviation from 0.5 for a token to count as relevant
    #[serde(default = "default_min_dev")]
    pub min_dev: f64,
    /// Robinson's strength constant. Accepted and validated, the affinity
    /// formula uses a fixed Laplace constant of 1.
    #[serde(default = "default_rob")]
    pub rob_s: f64,
    /// Score assigned to tokens with no information at all
    #[serde(default = "default_rob")]
    pub rob_x: f64,
    /// Maximum number of distinct tokens combined into the final score
    #[serde(default = "default_use_relevant")]
    pub use_relevant: usize,
    #[serde(default)]
    pub lexer: LexerConfig,
    #[serde(default)]
    pub degenerator: DegeneratorConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Tokenizer configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct LexerConfig {
    /// Minimum token length in characters
    pub min_size: usize,
    /// Maximum token length in characters
    pub max_size: usize,
    /// Keep purely numeric tokens
    pub allow_numbers: bool,
    /// Extract URI parts as tokens
    pub get_uris: bool,
    /// Keep markup tags as tokens
    pub get_html: bool,
    /// Keep BBCode tags as tokens
    pub get_bbcode: bool,
    /// Words never used as tokens (compared case-insensitively)
    pub stopwords: Vec<String>,
}

/// Degenerator configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct DegeneratorConfig {
    /// Reserved for locale-aware case folding, currently no effect
    pub multibyte: bool,
}

/// Token store configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct StorageConfig {
    /// SQLite database URL (e.g., "sqlite://b8.db")
    pub database_url: String,
}

/// Logging configuration (used by the `b8` binary)
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct LoggingConfig {
    pub level: String,
    /// "pretty" or "json"
    pub format: String,
}

/// Database used when no `[storage]` section names one
pub const DEFAULT_DATABASE_URL: &str = "sqlite://b8.db";

fn default_min_dev() -> f64 {
    0.01
}

fn default_rob() -> f64 {
    0.5
}

fn default_use_relevant() -> usize {
    15
}

impl Default for LexerConfig {
    fn default() -> Self {
        Self {
            min_size: 3,
            max_size: 30,
            allow_numbers: false,
            get_uris: true,
            get_html: true,
            get_bbcode: false,
            stopwords: Vec::new(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Default for B8Config {
    fn default() -> Self {
        Self {
            min_dev: default_min_dev(),
            rob_s: default_rob(),
            rob_x: default_rob(),
            use_relevant: default_use_relevant(),
            lexer: LexerConfig::default(),
            degenerator: DegeneratorConfig::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl B8Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            B8Error::Config(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let table: toml::Table = content
            .parse()
            .map_err(|e: toml::de::Error| B8Error::Config(format!("Failed to parse config: {}", e)))?;
        check_keys(&table)?;

        let config: B8Config = toml::from_str(content)
            .map_err(|e| B8Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;

        Ok(config)
    }

    /// Apply a `key=value` override
    pub fn apply_override(&mut self, assignment: &str) -> Result<()> {
        let (key, value) = assignment.split_once('=').ok_or_else(|| {
            B8Error::Config(format!("Expected key=value, got \"{}\"", assignment))
        })?;
        self.set(key.trim(), value.trim())
    }

    /// Set a single option by name. Section options use dotted keys
    /// (e.g., `lexer.min_size`).
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "min_dev" => self.min_dev = parse_value(key, value)?,
            "rob_s" => self.rob_s = parse_value(key, value)?,
            "rob_x" => self.rob_x = parse_value(key, value)?,
            "use_relevant" => self.use_relevant = parse_value(key, value)?,
            "lexer.min_size" => self.lexer.min_size = parse_value(key, value)?,
            "lexer.max_size" => self.lexer.max_size = parse_value(key, value)?,
            "lexer.allow_numbers" => self.lexer.allow_numbers = parse_value(key, value)?,
            "lexer.get_uris" => self.lexer.get_uris = parse_value(key, value)?,
            "lexer.get_html" => self.lexer.get_html = parse_value(key, value)?,
            "lexer.get_bbcode" => self.lexer.get_bbcode = parse_value(key, value)?,
            "lexer.stopwords" => {
                self.lexer.stopwords = value
                    .split(',')
                    .map(str::trim)
                    .filter(|w| !w.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            "degenerator.multibyte" => self.degenerator.multibyte = parse_value(key, value)?,
            "storage.database_url" => self.storage.database_url = value.to_string(),
            "logging.level" => self.logging.level = value.to_string(),
            "logging.format" => self.logging.format = value.to_string(),
            _ => return Err(B8Error::UnknownConfigKey(key.to_string())),
        }
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !(0.0..0.5).contains(&self.min_dev) {
            return Err(B8Error::Config(format!(
                "min_dev must be in [0, 0.5), got {}",
                self.min_dev
            )));
        }

        if !(self.rob_s > 0.0) {
            return Err(B8Error::Config(format!("rob_s must be positive, got {}", self.rob_s)));
        }

        if !(self.rob_x > 0.0 && self.rob_x < 1.0) {
            return Err(B8Error::Config(format!(
                "rob_x must be in (0, 1), got {}",
                self.rob_x
            )));
        }

        if self.use_relevant == 0 {
            return Err(B8Error::Config("use_relevant must be at least 1".to_string()));
        }

        if self.lexer.min_size == 0 || self.lexer.min_size > self.lexer.max_size {
            return Err(B8Error::Config(format!(
                "lexer sizes must satisfy 1 <= min_size <= max_size, got {}..{}",
                self.lexer.min_size, self.lexer.max_size
            )));
        }

        if self.storage.database_url.is_empty() {
            return Err(B8Error::Config("storage.database_url is empty".to_string()));
        }

        match self.logging.format.as_str() {
            "pretty" | "json" => Ok(()),
            other => Err(B8Error::Config(format!(
                "logging.format must be \"pretty\" or \"json\", got \"{}\"",
                other
            ))),
        }
    }
}

fn section_keys(section: &str) -> Option<&'static [&'static str]> {
    match section {
        "lexer" => Some(LEXER_KEYS),
        "degenerator" => Some(DEGENERATOR_KEYS),
        "storage" => Some(STORAGE_KEYS),
        "logging" => Some(LOGGING_KEYS),
        _ => None,
    }
}

fn check_keys(table: &toml::Table) -> Result<()> {
    for (key, value) in table {
        if !ROOT_KEYS.contains(&key.as_str()) {
            return Err(B8Error::UnknownConfigKey(key.clone()));
        }

        if let (Some(allowed), toml::Value::Table(section)) = (section_keys(key), value) {
            for nested in section.keys() {
                if !allowed.contains(&nested.as_str()) {
                    return Err(B8Error::UnknownConfigKey(format!("{}.{}", key, nested)));
                }
            }
        }
    }
    Ok(())
}

fn parse_value<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    value
        .parse()
        .map_err(|e| B8Error::Config(format!("Invalid value \"{}\" for {}: {}", value, key, e)))
}
