//! Optional TOML configuration
//!
//! Looked up at `--config`, then `KUBEDECK_CONFIG`, then
//! `<config dir>/kubedeck/config.toml`. Command line flags win over the file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "KUBEDECK_CONFIG";

/// How results are printed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Kubeconfig context; the current context when unset
    pub context: Option<String>,
    /// The context's namespace, then `default`, when unset
    pub namespace: Option<String>,
    pub log_tail: i64,
    pub event_limit: usize,
    pub warning_window_minutes: u64,
    pub output: OutputFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            context: None,
            namespace: None,
            log_tail: 100,
            event_limit: 50,
            warning_window_minutes: 60,
            output: OutputFormat::Table,
        }
    }
}

impl Config {
    /// Default file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("kubedeck").join("config.toml"))
    }

    /// Load from an explicit path, the environment or the default location.
    /// A missing file gives the defaults; an unreadable or malformed one is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
            .or_else(Self::default_path);

        match path {
            Some(path) => Self::load_file(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(Config::parse("").unwrap(), Config::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = Config::parse(
            r#"
            context = "kind-dev"
            namespace = "payments"
            output = "json"
            "#,
        )
        .unwrap();
        assert_eq!(config.context.as_deref(), Some("kind-dev"));
        assert_eq!(config.namespace.as_deref(), Some("payments"));
        assert_eq!(config.output, OutputFormat::Json);
        assert_eq!(config.log_tail, 100);
        assert_eq!(config.event_limit, 50);
    }

    #[test]
    fn malformed_file_is_an_error() {
        assert!(Config::parse("log_tail = \"many\"").is_err());
        assert!(Config::parse("colour = true").is_err());
        assert!(Config::parse("output = \"yaml\"").is_err());
    }

    #[test]
    fn missing_file_gives_defaults() {
        let path = std::env::temp_dir().join("kubedeck-no-such-dir/config.toml");
        assert_eq!(Config::load_file(&path).unwrap(), Config::default());
    }
}
