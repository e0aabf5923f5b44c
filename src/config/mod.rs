/// Parsing and validation of configuration files.
pub mod parser;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use std::time::Duration;

/// User configuration, stored as TOML.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    /// What a scan includes and captures
    #[serde(default)]
    pub scan: ScanConfig,

    /// Change detection settings
    #[serde(default)]
    pub watch: WatchConfig,

    /// Patch and report rendering settings
    #[serde(default)]
    pub report: ReportConfig,
}

/// The `[scan]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScanConfig {
    /// Files larger than this keep their metadata but no content
    #[serde(default = "default_max_content_size")]
    pub max_content_size: u64,
    /// Extensions (or whole file names) whose content is captured
    #[serde(default = "default_text_extensions")]
    pub text_extensions: Vec<String>,
    /// Gitignore-style patterns applied before the project's ignore file
    #[serde(default = "default_ignore_patterns")]
    pub ignore_patterns: Vec<String>,
}

/// The `[watch]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WatchConfig {
    /// Try native change notification before falling back to polling
    #[serde(default = "default_native")]
    pub native: bool,
    /// Re-scan period when polling, as a humantime duration
    #[serde(default = "default_poll_interval")]
    pub poll_interval: String,
    /// Quiet period that collapses a burst of notifications into one rescan
    #[serde(default = "default_debounce")]
    pub debounce: String,
}

/// The `[report]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportConfig {
    /// Unchanged lines shown around each hunk
    #[serde(default = "default_context_lines")]
    pub context_lines: usize,
    /// Line diff algorithm
    #[serde(default)]
    pub algorithm: DiffAlgorithm,
    /// Append every captured file's content to rendered reports
    #[serde(default)]
    pub include_contents: bool,
}

/// Algorithm used to compute line diffs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DiffAlgorithm {
    /// Myers' O(ND) algorithm
    #[default]
    Myers,
    /// Patience diff; steadier on moved blocks
    Patience,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_content_size: default_max_content_size(),
            text_extensions: default_text_extensions(),
            ignore_patterns: default_ignore_patterns(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            native: default_native(),
            poll_interval: default_poll_interval(),
            debounce: default_debounce(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            context_lines: default_context_lines(),
            algorithm: DiffAlgorithm::Myers,
            include_contents: false,
        }
    }
}

impl WatchConfig {
    /// Parsed polling interval.
    ///
    /// # Errors
    /// Returns an error if the configured value is not a valid duration.
    pub fn poll_interval(&self) -> Result<Duration> {
        humantime::parse_duration(&self.poll_interval)
            .with_context(|| format!("Invalid poll interval: {}", self.poll_interval))
    }

    /// Parsed debounce window.
    ///
    /// # Errors
    /// Returns an error if the configured value is not a valid duration.
    pub fn debounce(&self) -> Result<Duration> {
        humantime::parse_duration(&self.debounce)
            .with_context(|| format!("Invalid debounce window: {}", self.debounce))
    }
}

impl Config {
    /// Load configuration from a file
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Cannot create parent directories
    /// - Cannot read or parse the configuration file
    /// - Configuration file contains invalid TOML
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            // Create default config if it doesn't exist
            let config = Self::default();
            config.save(path)?;
            return Ok(config);
        }

        parser::parse_config_file(path)
    }

    /// Save configuration to a file
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Cannot create parent directories
    /// - Cannot write to the file
    /// - TOML serialization fails
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let toml_str = toml::to_string_pretty(self)?;
        let mut file = std::fs::File::create(path)?;
        file.write_all(toml_str.as_bytes())?;
        Ok(())
    }

    /// Get a configuration value by key
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        let parts: Vec<&str> = key.split('.').collect();
        if parts.len() != 2 {
            return None;
        }

        match (parts[0], parts[1]) {
            ("scan", "max_content_size") => Some(self.scan.max_content_size.to_string()),
            ("scan", "text_extensions") => Some(self.scan.text_extensions.join(",")),
            ("scan", "ignore_patterns") => Some(self.scan.ignore_patterns.join(",")),
            ("watch", "native") => Some(self.watch.native.to_string()),
            ("watch", "poll_interval") => Some(self.watch.poll_interval.clone()),
            ("watch", "debounce") => Some(self.watch.debounce.clone()),
            ("report", "context_lines") => Some(self.report.context_lines.to_string()),
            ("report", "algorithm") => Some(format!("{:?}", self.report.algorithm).to_lowercase()),
            ("report", "include_contents") => Some(self.report.include_contents.to_string()),
            _ => None,
        }
    }

    /// Set a configuration value by key
    ///
    /// List values are given comma-separated.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The key format is invalid (must be section.key)
    /// - The key is unknown
    /// - The value is invalid for the key
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let parts: Vec<&str> = key.split('.').collect();
        if parts.len() != 2 {
            return Err(anyhow::anyhow!("Invalid configuration key: {key}"));
        }

        match (parts[0], parts[1]) {
            ("scan", "max_content_size") => {
                self.scan.max_content_size = value
                    .parse()
                    .with_context(|| format!("Invalid number: {value}"))?;
            }
            ("scan", "text_extensions") => self.scan.text_extensions = split_list(value),
            ("scan", "ignore_patterns") => self.scan.ignore_patterns = split_list(value),
            ("watch", "native") => {
                self.watch.native = value
                    .parse()
                    .with_context(|| format!("Invalid boolean: {value}"))?;
            }
            ("watch", "poll_interval") => {
                humantime::parse_duration(value)
                    .with_context(|| format!("Invalid duration: {value}"))?;
                self.watch.poll_interval = value.to_string();
            }
            ("watch", "debounce") => {
                humantime::parse_duration(value)
                    .with_context(|| format!("Invalid duration: {value}"))?;
                self.watch.debounce = value.to_string();
            }
            ("report", "context_lines") => {
                self.report.context_lines = value
                    .parse()
                    .with_context(|| format!("Invalid number: {value}"))?;
            }
            ("report", "algorithm") => {
                self.report.algorithm = match value {
                    "myers" => DiffAlgorithm::Myers,
                    "patience" => DiffAlgorithm::Patience,
                    _ => return Err(anyhow::anyhow!("Unknown diff algorithm: {value}")),
                };
            }
            ("report", "include_contents") => {
                self.report.include_contents = value
                    .parse()
                    .with_context(|| format!("Invalid boolean: {value}"))?;
            }
            _ => return Err(anyhow::anyhow!("Unknown configuration key: {key}")),
        }

        parser::validate_config(self)
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// Default functions for serde
const fn default_max_content_size() -> u64 {
    1_048_576 // 1MB
}

fn default_text_extensions() -> Vec<String> {
    [
        "txt", "md", "markdown", "rst", "json", "jsonc", "yaml", "yml", "toml", "ini", "cfg",
        "conf", "env", "xml", "html", "htm", "css", "scss", "sass", "less", "js", "mjs", "cjs",
        "jsx", "ts", "tsx", "vue", "svelte", "rs", "py", "rb", "go", "java", "kt", "kts",
        "scala", "swift", "c", "h", "cc", "cpp", "hpp", "cs", "php", "pl", "lua", "sh", "bash",
        "zsh", "fish", "ps1", "bat", "sql", "graphql", "proto", "gradle", "properties", "csv",
        "tsv", "log", "lock", "gitignore", "dockerignore", "editorconfig", "dockerfile",
        "makefile", "license", "readme",
    ]
    .iter()
    .map(|s| (*s).to_string())
    .collect()
}

fn default_ignore_patterns() -> Vec<String> {
    vec![".git/".to_string()]
}

const fn default_native() -> bool {
    true
}

fn default_poll_interval() -> String {
    "2s".to_string()
}

fn default_debounce() -> String {
    "250ms".to_string()
}

const fn default_context_lines() -> usize {
    3
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_creates_default() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested/config.toml");

        let config = Config::load(&path)?;

        assert!(path.exists());
        assert_eq!(config, Config::default());
        assert_eq!(config.scan.max_content_size, 1_048_576);
        assert_eq!(config.watch.poll_interval()?, Duration::from_secs(2));

        Ok(())
    }

    #[test]
    fn test_get_set_roundtrip() -> Result<()> {
        let mut config = Config::default();

        config.set("report.algorithm", "patience")?;
        config.set("scan.ignore_patterns", "node_modules/, *.log")?;
        config.set("watch.poll_interval", "500ms")?;

        assert_eq!(config.get("report.algorithm").as_deref(), Some("patience"));
        assert_eq!(
            config.scan.ignore_patterns,
            vec!["node_modules/".to_string(), "*.log".to_string()]
        );
        assert_eq!(config.watch.poll_interval()?, Duration::from_millis(500));

        Ok(())
    }

    #[test]
    fn test_set_rejects_bad_values() {
        let mut config = Config::default();

        assert!(config.set("watch.poll_interval", "soon").is_err());
        assert!(config.set("scan.max_content_size", "0").is_err());
        assert!(config.set("nope", "1").is_err());
        assert!(config.set("core.pager", "less").is_err());
    }
}
