use clap::Args;
use jcheck_core::CheckRun;
use jcheck_platforms::auth::create_token_client;
use jcheck_platforms::fakes::{FakeCensus, FakeIssueTracker, FakeJCheckEngine, FakeVcs};
use jcheck_platforms::github::GitHubForgeAdapter;
use serde::Serialize;
use tracing::{info, instrument};

use crate::config::{get_config_path, parse_census_role, Config};
use crate::errors::CliError;

/// Environment variable the CLI reads the GitHub token from when `--token`
/// is not passed. The token is never written to the CLI's own
/// configuration file.
const GITHUB_TOKEN_ENV: &str = "JCHECK_GITHUB_TOKEN";

/// Arguments for the `check-pr` command.
#[derive(Args, Debug)]
pub struct CheckPrArgs {
    /// Repository to check, as `owner/name`. Defaults to `default.repo` in
    /// the CLI configuration file if omitted.
    #[arg(short, long)]
    pub repo: Option<String>,

    /// Pull request number to reconcile.
    #[arg(short = 'n', long)]
    pub pr_number: u64,

    /// GitHub personal access token. Falls back to the
    /// `JCHECK_GITHUB_TOKEN` environment variable.
    #[arg(short, long)]
    pub token: Option<String>,

    /// Census role assigned to every author/reviewer, since this CLI backs
    /// the census with an in-memory fake. Overrides `census.default_role` in the
    /// configuration file.
    #[arg(long)]
    pub census_role: Option<String>,

    /// Alternate CLI configuration file.
    #[arg(short, long)]
    pub config: Option<String>,
}

/// The observable outcome of one reconciliation pass, printed as JSON.
#[derive(Debug, Serialize)]
pub struct CheckPrResult {
    pub pr_number: u64,
    pub check_status: String,
    pub check_summary: String,
    pub labels: Vec<String>,
    pub cache_hit: bool,
    pub comments_posted: u32,
    pub comments_updated: u32,
}

/// Runs a single `CheckRun::run_once` tick against one pull request, wiring
/// a real `GitHubForgeAdapter` together with in-memory fakes for the four
/// adapters this workspace does not implement.
#[instrument(skip(args))]
pub async fn execute(args: CheckPrArgs) -> Result<(), CliError> {
    let config_path = get_config_path(args.config.as_deref());
    let config = if config_path.exists() {
        Config::load(&config_path)?
    } else {
        Config::default()
    };

    let repo = args
        .repo
        .clone()
        .or_else(|| config.default.repo.clone())
        .ok_or_else(|| {
            CliError::InvalidArguments(
                "No repository given: pass --repo or set default.repo".to_string(),
            )
        })?;
    let (repo_owner, repo_name) = repo.split_once('/').ok_or_else(|| {
        CliError::InvalidArguments(format!(
            "Repository must be in `owner/name` form, got `{}`",
            repo
        ))
    })?;

    let token = args
        .token
        .clone()
        .or_else(|| std::env::var(GITHUB_TOKEN_ENV).ok())
        .ok_or_else(|| {
            CliError::AuthError(format!(
                "No GitHub token given: pass --token or set {}",
                GITHUB_TOKEN_ENV
            ))
        })?;

    let census_role = match &args.census_role {
        Some(name) => parse_census_role(name)?,
        None => config.census_role()?,
    };

    let client = create_token_client(&token)
        .map_err(|e| CliError::AuthError(format!("Failed to authenticate with GitHub: {}", e)))?;
    let forge = GitHubForgeAdapter::new(client);

    let check_run = match config.config_override() {
        Some(over) => {
            info!(
                repo = over.repo.as_str(),
                "Using configured .jcheck/conf override"
            );
            CheckRun::with_override(
                forge,
                FakeIssueTracker::new(),
                FakeVcs::new(),
                FakeCensus::new(census_role),
                FakeJCheckEngine::new(),
                over,
            )
        }
        None => CheckRun::new(
            forge,
            FakeIssueTracker::new(),
            FakeVcs::new(),
            FakeCensus::new(census_role),
            FakeJCheckEngine::new(),
        ),
    };

    let now_epoch_ms = chrono::Utc::now().timestamp_millis();
    let report = check_run
        .run_once(repo_owner, repo_name, args.pr_number, now_epoch_ms)
        .await?;

    let result = CheckPrResult {
        pr_number: report.pr_number,
        check_status: format!("{:?}", report.desired.check_status),
        check_summary: report.desired.check_summary.clone(),
        labels: report.desired.labels.iter().cloned().collect(),
        cache_hit: report.cache_hit,
        comments_posted: report.actions.comments_posted,
        comments_updated: report.actions.comments_updated,
    };
    let json = serde_json::to_string_pretty(&result)
        .map_err(|e| CliError::Other(format!("Failed to serialize result: {}", e)))?;
    println!("{}", json);

    if report.desired.check_status == jcheck_core::models::CheckStatus::Failure {
        return Err(CliError::ValidationFailed(
            report.desired.check_summary.clone(),
        ));
    }

    Ok(())
}
