use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::error::{Result, SubwatchError};

/// Context hint passed to the provider with every batch
pub const DEFAULT_CONTEXT: &str = "These are subtitles from a video file.";

fn default_interval_secs() -> u64 {
    10
}

fn default_target_language() -> String {
    "TH".to_string()
}

fn default_context() -> Option<String> {
    Some(DEFAULT_CONTEXT.to_string())
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_ledger_path() -> PathBuf {
    PathBuf::from("translated_files.json")
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub watch: WatchConfig,
    #[serde(default)]
    pub translate: TranslateConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Directories scanned recursively for subtitle files
    #[serde(default)]
    pub dirs: Vec<PathBuf>,
    /// Seconds to sleep between scans
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Optional regex searched in the file name; non-matching files are skipped
    #[serde(default)]
    pub filename_pattern: Option<String>,
    /// Retry files whose last recorded outcome is `error`
    #[serde(default)]
    pub retry_errors: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateConfig {
    /// DeepL authentication key
    #[serde(default)]
    pub api_key: String,
    /// Target language code, e.g. "TH" or "EN-US"
    #[serde(default = "default_target_language")]
    pub target_language: String,
    /// Source language code; detected by the provider when absent
    #[serde(default)]
    pub source_language: Option<String>,
    /// Context hint sent alongside the texts
    #[serde(default = "default_context")]
    pub context: Option<String>,
    /// API base URL override
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Ledger file, relative to the working directory unless absolute
    #[serde(default = "default_ledger_path")]
    pub path: PathBuf,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            dirs: Vec::new(),
            interval_secs: default_interval_secs(),
            filename_pattern: None,
            retry_errors: false,
        }
    }
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            target_language: default_target_language(),
            source_language: None,
            context: default_context(),
            endpoint: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: default_ledger_path(),
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SubwatchError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| SubwatchError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| SubwatchError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| SubwatchError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Apply environment overrides from the process environment
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dirs) = lookup("WATCH_DIRS") {
            self.watch.dirs = dirs
                .split(',')
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(PathBuf::from)
                .collect();
        }

        if let Some(lang) = lookup("TARGET_LANG") {
            self.translate.target_language = lang.trim().to_string();
        }

        if let Some(key) = lookup("DEEPL_API_KEY") {
            self.translate.api_key = key.trim().to_string();
        }

        if let Some(interval) = lookup("SLEEP_INTERVAL") {
            self.watch.interval_secs = interval.trim().parse().map_err(|e| {
                SubwatchError::Config(format!("Invalid SLEEP_INTERVAL '{}': {}", interval, e))
            })?;
        }

        if let Some(pattern) = lookup("WATCH_REGEX") {
            self.watch.filename_pattern = Some(pattern).filter(|p| !p.is_empty());
        }

        if let Some(path) = lookup("LEDGER_FILE") {
            self.ledger.path = PathBuf::from(path);
        }

        Ok(())
    }

    /// Compiled filename filter, if one is configured
    pub fn filename_filter(&self) -> Result<Option<Regex>> {
        self.watch
            .filename_pattern
            .as_deref()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| {
                    SubwatchError::Config(format!("Invalid filename pattern '{}': {}", pattern, e))
                })
            })
            .transpose()
    }

    pub fn validate(&self) -> Result<()> {
        if self.watch.dirs.is_empty() {
            return Err(SubwatchError::Config("No watch directories configured".to_string()));
        }
        if self.watch.interval_secs == 0 {
            return Err(SubwatchError::Config("Poll interval must be at least one second".to_string()));
        }
        if self.translate.api_key.trim().is_empty() {
            return Err(SubwatchError::Config("Translation API key is missing".to_string()));
        }
        if self.translate.target_language.trim().is_empty() {
            return Err(SubwatchError::Config("Target language is missing".to_string()));
        }
        if !is_language_code(&self.translate.target_language) {
            return Err(SubwatchError::Config(format!(
                "Invalid target language '{}': expected letters and hyphens, e.g. TH or EN-US",
                self.translate.target_language
            )));
        }
        if let Some(source) = self.translate.source_language.as_deref().filter(|s| !is_language_code(s)) {
            return Err(SubwatchError::Config(format!("Invalid source language '{}'", source)));
        }
        self.filename_filter()?;
        Ok(())
    }
}

/// Letters in hyphen-separated groups. The code ends up in output file names.
fn is_language_code(code: &str) -> bool {
    code.split('-')
        .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_alphabetic()))
}
