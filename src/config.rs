//! Configuration loading
//!
//! Configuration is read from a TOML file given with `--config` or the
//! `SIGNATURE_INSIGHTS_CONFIG` environment variable. Every section is optional.
//!
//! ```toml
//! [logging]
//! level = "debug"
//!
//! [report]
//! since_days = 14
//! top_campaigns = 5
//!
//! [teams]
//! sales = ["Sales", "Inside Sales"]
//! marketing = ["Marketing", "Brand"]
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::coverage::{TeamCategory, TeamMapping};
use crate::error::{Error, Result};

pub const CONFIG_ENV: &str = "SIGNATURE_INSIGHTS_CONFIG";

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub report: ReportConfig,

    #[serde(default)]
    pub teams: TeamsConfig,
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Report window and list sizes
#[derive(Debug, Deserialize)]
pub struct ReportConfig {
    /// Days of click and deployment history to load
    #[serde(default = "default_since_days")]
    pub since_days: i64,

    /// Campaign rows shown in text output
    #[serde(default = "default_top_campaigns")]
    pub top_campaigns: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            since_days: default_since_days(),
            top_campaigns: default_top_campaigns(),
        }
    }
}

fn default_since_days() -> i64 {
    30
}

fn default_top_campaigns() -> usize {
    10
}

/// Department names per team. Each department may appear under one team only.
#[derive(Debug, Deserialize)]
pub struct TeamsConfig {
    #[serde(default)]
    pub sales: Vec<String>,

    #[serde(default)]
    pub marketing: Vec<String>,
}

impl Default for TeamsConfig {
    fn default() -> Self {
        Self {
            sales: vec![
                "Sales".to_string(),
                "Business Development".to_string(),
                "Account Management".to_string(),
            ],
            marketing: vec![
                "Marketing".to_string(),
                "Brand".to_string(),
                "Communications".to_string(),
            ],
        }
    }
}

impl TeamsConfig {
    pub fn mapping(&self) -> Result<TeamMapping> {
        let sales = self
            .sales
            .iter()
            .map(|name| (TeamCategory::Sales, name.clone()));
        let marketing = self
            .marketing
            .iter()
            .map(|name| (TeamCategory::Marketing, name.clone()));
        TeamMapping::from_entries(sales.chain(marketing))
    }
}

impl Config {
    /// Loads from `path`, falling back to `$SIGNATURE_INSIGHTS_CONFIG`, then
    /// to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match std::env::var_os(CONFIG_ENV) {
                Some(value) => PathBuf::from(value),
                None => return Ok(Config::default()),
            },
        };

        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read config file {:?}: {}", path, e))
        })?;

        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        if config.report.since_days < 1 {
            return Err(Error::Config("report.since_days must be at least 1".to_string()));
        }
        config.teams.mapping()?;

        Ok(config)
    }
}
