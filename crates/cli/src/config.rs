use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::errors::CliError;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILENAME: &str = ".jcheck-cli.toml";

/// Bot-level settings for the `jcheck` CLI.
///
/// This is distinct from the per-repository `.jcheck/conf` blob the
/// Configuration Resolver reads (`jcheck_core::models::JCheckConfig`): it
/// holds the defaults this binary fills in when the caller doesn't pass an
/// explicit flag, and the override location handed to
/// `CheckRun::with_override` at construction time. Credentials are never
/// persisted here; the GitHub token always comes from `--token` or the
/// `JCHECK_GITHUB_TOKEN` environment variable.
#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub default: DefaultConfig,

    #[serde(default)]
    pub census: CensusConfig,

    #[serde(default)]
    pub r#override: OverrideConfig,
}

/// Default repository the `check-pr` command targets when `--repo` is
/// omitted.
#[derive(Debug, Serialize, Deserialize, Default)]
pub struct DefaultConfig {
    #[serde(default)]
    pub repo: Option<String>,
}

/// The single census role assigned to every pull-request author/reviewer
/// when the CLI backs the census with `FakeCensus`.
#[derive(Debug, Serialize, Deserialize)]
pub struct CensusConfig {
    #[serde(default = "default_census_role")]
    pub default_role: String,
}

impl Default for CensusConfig {
    fn default() -> Self {
        CensusConfig {
            default_role: default_census_role(),
        }
    }
}

fn default_census_role() -> String {
    "contributor".to_string()
}

/// The bot-level configuration override
/// applied ahead of per-PR resolution. Empty by default, meaning every
/// watched repository's own target-branch `.jcheck/conf` is authoritative.
#[derive(Debug, Serialize, Deserialize, Default)]
pub struct OverrideConfig {
    #[serde(default)]
    pub repo: Option<String>,
    #[serde(default)]
    pub git_ref: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
}

impl Config {
    /// Loads configuration from the specified file.
    pub fn load(path: &Path) -> Result<Self, CliError> {
        debug!("Loading configuration from {:?}", path);

        if !path.exists() {
            return Err(CliError::ConfigError(format!(
                "Configuration file not found: {:?}",
                path
            )));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            CliError::ConfigError(format!("Failed to read configuration file: {}", e))
        })?;

        toml::from_str(&content)
            .map_err(|e| CliError::ConfigError(format!("Failed to parse configuration file: {}", e)))
    }

    /// Saves configuration to the specified file.
    pub fn save(&self, path: &Path) -> Result<(), CliError> {
        debug!("Saving configuration to {:?}", path);

        let content = toml::to_string_pretty(self).map_err(|e| {
            CliError::ConfigError(format!("Failed to serialize configuration: {}", e))
        })?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| CliError::ConfigError(format!("Failed to create directory: {}", e)))?;
        }

        fs::write(path, content).map_err(|e| {
            CliError::ConfigError(format!("Failed to write configuration file: {}", e))
        })?;

        info!("Configuration saved to {:?}", path);
        Ok(())
    }

    /// Parses `census.default_role` into the `CensusRole` the CLI seeds
    /// `FakeCensus` with.
    pub fn census_role(&self) -> Result<jcheck_platforms::CensusRole, CliError> {
        parse_census_role(&self.census.default_role)
    }

    /// Builds a `ConfigOverride` from the `[override]` section, if a
    /// repository was configured there.
    pub fn config_override(&self) -> Option<jcheck_core::config_resolver::ConfigOverride> {
        let repo = self.r#override.repo.clone()?;
        Some(jcheck_core::config_resolver::ConfigOverride {
            repo,
            git_ref: self
                .r#override
                .git_ref
                .clone()
                .unwrap_or_else(|| "main".to_string()),
            path: self
                .r#override
                .path
                .clone()
                .unwrap_or_else(|| ".jcheck/conf".to_string()),
        })
    }
}

/// Parses a census role name as recognized by this CLI's configuration
/// file and `--census-role` flag.
pub fn parse_census_role(name: &str) -> Result<jcheck_platforms::CensusRole, CliError> {
    use jcheck_platforms::CensusRole;
    match name.to_ascii_lowercase().as_str() {
        "contributor" => Ok(CensusRole::Contributor),
        "author" => Ok(CensusRole::Author),
        "committer" => Ok(CensusRole::Committer),
        "reviewer" => Ok(CensusRole::Reviewer),
        "lead" => Ok(CensusRole::Lead),
        other => Err(CliError::InvalidArguments(format!(
            "Unrecognized census role: {}",
            other
        ))),
    }
}

/// Gets the path to the configuration file.
pub fn get_config_path(config_path: Option<&str>) -> PathBuf {
    if let Some(path) = config_path {
        PathBuf::from(path)
    } else {
        let current_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        current_dir.join(DEFAULT_CONFIG_FILENAME)
    }
}
