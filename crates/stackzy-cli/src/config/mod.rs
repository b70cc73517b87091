//! Configuration management.

use anyhow::Result;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::output::OutputFormat;

/// Overrides the config file location
pub const CONFIG_ENV: &str = "STACKZY_CONFIG";

/// CLI configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Stackzy API key.
    pub api_key: Option<String>,

    /// Stackzy API base URL.
    pub api_base_url: Option<String>,

    /// Store endpoint used for `--store` downloads.
    pub store_base_url: Option<String>,

    /// Store account email.
    pub store_email: Option<String>,

    /// Store account token.
    pub store_token: Option<String>,

    /// `adb` binary (default: `adb` from `PATH`).
    pub adb_path: Option<String>,

    /// Command used to run apktool, e.g. `java -jar ~/bin/apktool.jar`.
    pub apktool: Option<String>,

    /// Local JSON catalog used instead of the remote one.
    pub catalog_path: Option<String>,

    /// Analyzer version override; fetched from the API when unset.
    pub analyzer_version: Option<String>,

    /// Result cache override; follows the remote config when unset.
    pub caching_enabled: Option<bool>,

    /// Report untracked libraries after each analysis.
    #[serde(default)]
    pub sync_untracked: bool,

    /// Root for decompiled sources (default: system temp dir).
    pub temp_dir: Option<String>,

    /// Default output format.
    pub output_format: Option<OutputFormat>,
}

/// Keys accepted by `config set`, with a description
pub const KEYS: &[(&str, &str)] = &[
    ("api_key", "Your Stackzy API key"),
    ("api_base_url", "Stackzy API base URL"),
    ("store_base_url", "Store endpoint for --store downloads"),
    ("store_email", "Store account email"),
    ("store_token", "Store account token"),
    ("adb_path", "Path to the adb binary"),
    ("apktool", "apktool command (e.g. \"java -jar ~/apktool.jar\")"),
    ("catalog_path", "Local library catalog (JSON)"),
    ("analyzer_version", "Pin the analyzer version"),
    ("caching_enabled", "Use the result cache (true/false)"),
    ("sync_untracked", "Report untracked libraries (true/false)"),
    ("temp_dir", "Root for decompiled sources"),
    ("output_format", "Default output format (pretty/json/csv/yaml)"),
];

impl Config {
    /// Get the config file path.
    pub fn path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            if !path.trim().is_empty() {
                return Ok(expand_path(&path));
            }
        }

        let dirs = ProjectDirs::from("dev", "stackzy", "stackzy")
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Load configuration from file.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;

        Ok(config)
    }

    /// Save configuration to file.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Set a key by name; an empty value unsets optional keys
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let text = || (!value.trim().is_empty()).then(|| value.trim().to_string());

        match key {
            "api_key" => self.api_key = text(),
            "api_base_url" | "api_url" => self.api_base_url = text(),
            "store_base_url" | "store_url" => self.store_base_url = text(),
            "store_email" => self.store_email = text(),
            "store_token" => self.store_token = text(),
            "adb_path" | "adb" => self.adb_path = text(),
            "apktool" => self.apktool = text(),
            "catalog_path" | "catalog" => self.catalog_path = text(),
            "analyzer_version" => self.analyzer_version = text(),
            "caching_enabled" => {
                self.caching_enabled = text().map(|v| v.parse()).transpose()?;
            }
            "sync_untracked" => self.sync_untracked = value.trim().parse()?,
            "temp_dir" => self.temp_dir = text(),
            "output_format" | "output" => {
                self.output_format = text().map(|v| v.parse()).transpose()?;
            }
            _ => {
                let available = KEYS
                    .iter()
                    .map(|(k, d)| format!("  {k:<18} - {d}"))
                    .collect::<Vec<_>>()
                    .join("\n");
                anyhow::bail!("Unknown config key: {key}\n\nAvailable keys:\n{available}");
            }
        }

        Ok(())
    }
}

/// Expand `~` and environment variables in a configured path
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::full(path).map_or_else(|_| path.to_string(), |p| p.into_owned()))
}

/// Split a configured command line into program and arguments, expanding
/// `~` in each part
pub fn split_command(command: &str) -> Option<(PathBuf, Vec<String>)> {
    let mut parts = command.split_whitespace().map(|part| shellexpand::tilde(part).into_owned());
    let program = parts.next()?;
    Some((PathBuf::from(program), parts.collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_through_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested/config.toml");

        let mut config = Config::default();
        config.set("store_email", "me@example.com").unwrap();
        config.set("caching_enabled", "false").unwrap();
        config.set("output", "json").unwrap();
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.caching_enabled, Some(false));
        assert_eq!(loaded.output_format, Some(OutputFormat::Json));
    }

    #[test]
    fn test_missing_file_is_default() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::load_from(&tmp.path().join("none.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_set_rejects_unknown_and_invalid() {
        let mut config = Config::default();
        let err = config.set("colour", "x").unwrap_err();
        assert!(err.to_string().contains("Unknown config key"));
        assert!(config.set("sync_untracked", "maybe").is_err());
    }

    #[test]
    fn test_empty_value_unsets() {
        let mut config = Config::default();
        config.set("apktool", "apktool").unwrap();
        config.set("apktool", "").unwrap();
        assert_eq!(config.apktool, None);
    }

    #[test]
    fn test_split_command() {
        let (program, args) = split_command("java -jar /opt/apktool.jar").unwrap();
        assert_eq!(program, PathBuf::from("java"));
        assert_eq!(args, vec!["-jar", "/opt/apktool.jar"]);
        assert!(split_command("   ").is_none());
    }
}
