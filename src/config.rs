//! Configuration file handling.
//!
//! This module provides loading and saving of licenscan configuration
//! from a TOML file.
//!
//! # Configuration Location
//!
//! The configuration file is stored at:
//! - Linux: `~/.config/licenscan/config.toml`
//! - macOS: `~/Library/Application Support/licenscan/config.toml`
//! - Windows: `%APPDATA%\licenscan\config.toml`
//!
//! # Example Configuration
//!
//! ```toml
//! command_timeout_secs = 30
//! default_format = "all"
//! output_dir = "license-report"
//!
//! [harvest]
//! content_sniff = false
//!
//! [npm]
//! project_dirs = ["/app", "/srv/web"]
//!
//! [ignore]
//! packages = ["gpg-pubkey*", "@types/*"]
//!
//! [[fallback]]
//! pattern = "acme-*"
//! license = "LicenseRef-Acme"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::enumerator::EnumeratorOptions;
use crate::harvest::HarvestOptions;
use crate::license::{FallbackRule, FallbackTable};

/// Application configuration.
///
/// Loaded from a TOML file or created with default values. Command-line
/// flags override individual fields.
///
/// # Example
///
/// ```no_run
/// use licenscan::Config;
///
/// let config = Config::load().unwrap();
///
/// println!("Command timeout: {}s", config.command_timeout_secs);
/// println!("Report directory: {}", config.output_dir.display());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Budget for package listing and metadata commands, in seconds.
    ///
    /// Default: 30
    pub command_timeout_secs: u64,

    /// Budget for each manager presence check, in seconds.
    ///
    /// Default: 5
    pub probe_timeout_secs: u64,

    /// Budget for each single file read or copy, in seconds.
    ///
    /// Default: 5
    pub file_timeout_secs: u64,

    /// Default output format when no `--format` flag is provided.
    ///
    /// Valid values: "table", "csv", "json", "all"
    /// Default: "all"
    pub default_format: String,

    /// Directory receiving report files and the copyright mirror.
    ///
    /// Default: "license-report"
    pub output_dir: PathBuf,

    /// Whether package managers are enumerated concurrently.
    ///
    /// Default: true
    pub parallel: bool,

    /// Maximum number of packages resolved at the same time.
    ///
    /// Default: 8
    pub concurrency: usize,

    pub harvest: HarvestConfig,

    pub npm: NpmConfig,

    /// Ignore list configuration.
    pub ignore: IgnoreConfig,

    /// License rules consulted before the built-in fallback table.
    pub fallback: Vec<FallbackRule>,
}

/// Copyright harvester settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// Whether copyright files are harvested at all.
    pub enabled: bool,
    /// Whether README and plain-text files are inspected for notices.
    pub content_sniff: bool,
    /// Results per canonical file name in the exact-name pass.
    pub exact_cap: usize,
    /// Results per canonical token in the substring pass.
    pub substring_cap: usize,
    /// Results per pattern in the directory pass.
    pub directory_cap: usize,
    /// Files added by the content-sniff pass.
    pub sniff_cap: usize,
    /// Files larger than this are never sniffed.
    pub sniff_max_bytes: u64,
    /// Budget for walking the whole filesystem, in seconds.
    pub walk_timeout_secs: u64,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            content_sniff: true,
            exact_cap: 1000,
            substring_cap: 500,
            directory_cap: 5000,
            sniff_cap: 1000,
            sniff_max_bytes: 256 * 1024,
            walk_timeout_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NpmConfig {
    /// Application directories (inside the image) whose dependencies are
    /// listed in addition to global packages.
    pub project_dirs: Vec<String>,
}

/// Configuration for ignoring specific packages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IgnoreConfig {
    /// Package names to drop from the report.
    ///
    /// Supports glob patterns (e.g., "gpg-pubkey*", "@types/*").
    pub packages: Vec<String>,
}

impl IgnoreConfig {
    /// Check if a package should be ignored.
    pub fn should_ignore_package(&self, name: &str) -> bool {
        self.packages.iter().any(|pattern| {
            if pattern.contains('*') {
                glob_match(pattern, name)
            } else {
                pattern == name
            }
        })
    }
}

/// Simple glob matching (supports * as wildcard).
pub(crate) fn glob_match(pattern: &str, text: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();

    if parts.len() == 1 {
        return pattern == text;
    }

    let mut remaining = text;

    // Check prefix (before first *)
    if !parts[0].is_empty() {
        if !remaining.starts_with(parts[0]) {
            return false;
        }
        remaining = &remaining[parts[0].len()..];
    }

    // Check suffix (after last *)
    let last_part = parts[parts.len() - 1];
    if !last_part.is_empty() {
        if !remaining.ends_with(last_part) {
            return false;
        }
        remaining = &remaining[..remaining.len() - last_part.len()];
    }

    // Check middle parts
    for part in &parts[1..parts.len() - 1] {
        if part.is_empty() {
            continue;
        }
        if let Some(pos) = remaining.find(part) {
            remaining = &remaining[pos + part.len()..];
        } else {
            return false;
        }
    }

    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            command_timeout_secs: 30,
            probe_timeout_secs: 5,
            file_timeout_secs: 5,
            default_format: "all".to_string(),
            output_dir: PathBuf::from("license-report"),
            parallel: true,
            concurrency: 8,
            harvest: HarvestConfig::default(),
            npm: NpmConfig::default(),
            ignore: IgnoreConfig::default(),
            fallback: Vec::new(),
        }
    }
}

impl Config {
    /// Loads configuration from the config file.
    ///
    /// If the config file doesn't exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Loads configuration from `path`, falling back to defaults when the
    /// file is absent.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    /// Saves the configuration to the config file.
    ///
    /// Creates the parent directory if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    /// Returns the path to the configuration file.
    ///
    /// # Example
    ///
    /// ```
    /// use licenscan::Config;
    ///
    /// let path = Config::config_path();
    /// assert!(path.ends_with("licenscan/config.toml"));
    /// ```
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("licenscan")
            .join("config.toml")
    }

    /// Generates a string containing the default configuration.
    pub fn generate_default_config() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn file_timeout(&self) -> Duration {
        Duration::from_secs(self.file_timeout_secs)
    }

    /// Where harvested files are mirrored.
    pub fn copyright_dir(&self) -> PathBuf {
        self.output_dir.join("copyright_files")
    }

    pub fn enumerator_options(&self) -> EnumeratorOptions {
        EnumeratorOptions {
            command_timeout: self.command_timeout(),
            file_timeout: self.file_timeout(),
            npm_project_dirs: self.npm.project_dirs.clone(),
            ..EnumeratorOptions::default()
        }
    }

    pub fn harvest_options(&self) -> HarvestOptions {
        HarvestOptions {
            exact_cap: self.harvest.exact_cap,
            substring_cap: self.harvest.substring_cap,
            directory_cap: self.harvest.directory_cap,
            sniff_cap: self.harvest.sniff_cap,
            content_sniff: self.harvest.content_sniff,
            sniff_max_bytes: self.harvest.sniff_max_bytes,
            file_timeout: self.file_timeout(),
            walk_timeout: Duration::from_secs(self.harvest.walk_timeout_secs),
        }
    }

    /// The built-in fallback table with user rules in front.
    pub fn fallback_table(&self) -> FallbackTable {
        FallbackTable::with_overrides(self.fallback.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_glob_match_exact() {
        assert!(glob_match("zlib1g", "zlib1g"));
        assert!(!glob_match("zlib1g", "zlib1g-dev"));
    }

    #[test]
    fn test_glob_match_prefix() {
        assert!(glob_match("libssl*", "libssl3"));
        assert!(glob_match("libssl*", "libssl-dev"));
        assert!(!glob_match("libssl*", "openssl"));
    }

    #[test]
    fn test_glob_match_suffix() {
        assert!(glob_match("*-doc", "python3-doc"));
        assert!(!glob_match("*-doc", "python3"));
    }

    #[test]
    fn test_glob_match_contains() {
        assert!(glob_match("*license*", "license"));
        assert!(glob_match("*license*", "third-party-license.txt"));
        assert!(!glob_match("*license*", "readme.md"));
    }

    #[test]
    fn test_glob_match_scoped() {
        assert!(glob_match("@types/*", "@types/node"));
        assert!(!glob_match("@types/*", "@babel/core"));
    }

    #[test]
    fn test_glob_match_catch_all() {
        assert!(glob_match("*", "anything"));
        assert!(glob_match("*", ""));
    }

    #[test]
    fn test_ignore_config_packages() {
        let config = IgnoreConfig {
            packages: vec!["gpg-pubkey".to_string(), "@types/*".to_string()],
        };

        assert!(config.should_ignore_package("gpg-pubkey"));
        assert!(config.should_ignore_package("@types/node"));
        assert!(!config.should_ignore_package("bash"));
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();

        assert_eq!(config.command_timeout_secs, 30);
        assert_eq!(config.default_format, "all");
        assert_eq!(config.output_dir, PathBuf::from("license-report"));
        assert_eq!(
            config.copyright_dir(),
            PathBuf::from("license-report/copyright_files")
        );
        assert!(config.harvest.enabled);
        assert_eq!(config.harvest.exact_cap, 1000);
        assert_eq!(config.harvest.substring_cap, 500);
        assert_eq!(config.harvest.directory_cap, 5000);
        assert!(config.fallback.is_empty());
    }

    #[test]
    fn test_load_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
command_timeout_secs = 60

[harvest]
content_sniff = false

[npm]
project_dirs = ["/app"]

[[fallback]]
pattern = "acme-*"
license = "LicenseRef-Acme"
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.command_timeout(), Duration::from_secs(60));
        assert_eq!(config.probe_timeout_secs, 5);
        assert!(!config.harvest.content_sniff);
        assert_eq!(config.harvest.exact_cap, 1000);
        assert_eq!(config.npm.project_dirs, vec!["/app".to_string()]);

        let table = config.fallback_table();
        let rule = table.lookup("acme-agent").unwrap();
        assert_eq!(rule.license, "LicenseRef-Acme");
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.concurrency, 8);
    }

    #[test]
    fn test_default_config_round_trips() {
        let text = Config::generate_default_config();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.default_format, "all");
    }
}
