//! Configuration Resolver.
//!
//! Locates the effective `.jcheck/conf` for a PR: an override
//! repository/ref/path takes precedence when configured; otherwise the
//! target branch's own configuration is authoritative.

use jcheck_platforms::{models::PullRequest, ForgeAdapter};

use crate::errors::CheckRunError;
use crate::models::JCheckConfig;

#[cfg(test)]
#[path = "config_resolver_tests.rs"]
mod tests;

/// Where a resolved (or missing/invalid) configuration came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigSource {
    TargetBranch,
    Override {
        repo: String,
        git_ref: String,
        path: String,
    },
}

/// The outcome of [`resolve_for`]. `Invalid`/`Missing` are not errors in
/// the Rust sense — they are first-class results the Configuration
/// Resolver hands to the rest of the pipeline.
#[derive(Debug)]
pub enum Resolution {
    Ok {
        config: JCheckConfig,
        source: ConfigSource,
    },
    Missing(ConfigSource),
    Invalid(ConfigSource, String),
}

/// An override location configured at the bot/repository level.
#[derive(Clone, Debug)]
pub struct ConfigOverride {
    pub repo: String,
    pub git_ref: String,
    pub path: String,
}

const DEFAULT_CONFIG_PATH: &str = ".jcheck/conf";

/// Resolves the effective configuration for `pr`. When `override_location`
/// is set it is authoritative; a fetch failure there is treated as fatal
/// for the PR rather than falling back to the target branch.
pub async fn resolve_for(
    forge: &dyn ForgeAdapter,
    repo_owner: &str,
    repo_name: &str,
    pr: &PullRequest,
    override_location: Option<&ConfigOverride>,
) -> Result<Resolution, CheckRunError> {
    if let Some(over) = override_location {
        let source = ConfigSource::Override {
            repo: over.repo.clone(),
            git_ref: over.git_ref.clone(),
            path: over.path.clone(),
        };
        let (owner, name) = split_repo(&over.repo).unwrap_or((repo_owner.to_string(), repo_name.to_string()));
        let content = forge
            .fetch_file(&owner, &name, &over.git_ref, &over.path)
            .await?;
        return Ok(match content {
            None => Resolution::Missing(source),
            Some(text) => parse(&text, source),
        });
    }

    let source = ConfigSource::TargetBranch;
    let content = forge
        .fetch_file(repo_owner, repo_name, &pr.base_ref, DEFAULT_CONFIG_PATH)
        .await?;
    Ok(match content {
        None => Resolution::Missing(source),
        Some(text) => parse(&text, source),
    })
}

fn parse(text: &str, source: ConfigSource) -> Resolution {
    match toml::from_str::<JCheckConfig>(text) {
        Ok(config) => Resolution::Ok { config, source },
        Err(e) => Resolution::Invalid(source, e.to_string()),
    }
}

fn split_repo(repo: &str) -> Option<(String, String)> {
    let (owner, name) = repo.split_once('/')?;
    Some((owner.to_string(), name.to_string()))
}
