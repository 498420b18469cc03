//! # jcheck server
//!
//! A thin process entry point that demonstrates invoking the CheckRun
//! engine for a single work item. It deliberately does NOT implement a
//! webhook listener, a work queue, or a scheduler loop with per-item
//! timeouts — those are the host process's responsibility, outside
//! `jcheck_core`'s scope. What it *does* carry is the ambient stack a real
//! deployment needs around the engine: structured logging, a liveness
//! endpoint, and configuration loading.

#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

use std::env;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tracing::{error, info, instrument};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Server-specific error types.
mod errors;
use errors::ServerError;

use jcheck_core::CheckRun;
use jcheck_platforms::auth::create_token_client;
use jcheck_platforms::fakes::{FakeCensus, FakeIssueTracker, FakeJCheckEngine, FakeVcs};
use jcheck_platforms::github::GitHubForgeAdapter;
use jcheck_platforms::CensusRole;

/// Environment variable carrying the GitHub token this process authenticates
/// with. Never persisted.
const GITHUB_TOKEN_ENV: &str = "JCHECK_GITHUB_TOKEN";

/// Environment variable this process binds its liveness endpoint to.
const SERVER_ADDR_ENV: &str = "JCHECK_SERVER_ADDR";

/// Default bind address when `JCHECK_SERVER_ADDR` is unset.
const DEFAULT_SERVER_ADDR: &str = "0.0.0.0:8080";

/// Shared application state handed to every route handler.
struct AppState {
    /// The reconciliation engine this process drives. A real host would
    /// hold one of these per watched repository/bot identity.
    check_run: CheckRun<GitHubForgeAdapter, FakeIssueTracker, FakeVcs, FakeCensus, FakeJCheckEngine>,
}

/// Response body for `GET /healthz`.
#[derive(Serialize)]
struct HealthResponse {
    /// Always `"ok"` once the process has finished starting up.
    status: &'static str,
}

/// Liveness/readiness probe. Carries no reconciliation state: a process
/// that answers here has successfully authenticated with the forge and
/// built its `CheckRun`, nothing more.
#[instrument(skip_all)]
async fn healthz(State(_state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Response body for `POST /reconcile/:owner/:repo/:pr_number`.
#[derive(Serialize)]
struct ReconcileResponse {
    /// The pull request this tick reconciled.
    pr_number: u64,
    /// The computed status check verdict.
    check_status: String,
    /// The full desired label set.
    labels: Vec<String>,
    /// Whether the tick was skipped as a fingerprint cache hit.
    cache_hit: bool,
}

/// Runs a single `CheckRun::run_once` tick for one pull request and returns
/// the resulting desired state. This is a direct, synchronous trigger, not
/// a webhook endpoint: it performs none of the signature verification,
/// event-payload parsing, or queue hand-off a forge webhook receiver would
/// need. A host that wires up webhooks is expected to call into
/// `jcheck_core::CheckRun` the same way this handler does, after its own
/// event validation.
#[instrument(skip(state))]
async fn reconcile(
    State(state): State<Arc<AppState>>,
    Path((owner, repo, pr_number)): Path<(String, String, u64)>,
) -> Result<Json<ReconcileResponse>, StatusCode> {
    let now_epoch_ms = chrono::Utc::now().timestamp_millis();
    match state
        .check_run
        .run_once(&owner, &repo, pr_number, now_epoch_ms)
        .await
    {
        Ok(report) => Ok(Json(ReconcileResponse {
            pr_number: report.pr_number,
            check_status: format!("{:?}", report.desired.check_status),
            labels: report.desired.labels.iter().cloned().collect(),
            cache_hit: report.cache_hit,
        })),
        Err(e) => {
            error!(error = %e, owner, repo, pr_number, "reconciliation failed");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Builds the GitHub-backed `CheckRun` this process drives, authenticating
/// with the token in `JCHECK_GITHUB_TOKEN`. The four adapters this
/// workspace does not implement (issue tracker, VCS, census, jcheck) are
/// satisfied by in-memory fakes until a deployment supplies its
/// own (see DESIGN.md).
fn build_check_run(
) -> Result<CheckRun<GitHubForgeAdapter, FakeIssueTracker, FakeVcs, FakeCensus, FakeJCheckEngine>, ServerError>
{
    let token = env::var(GITHUB_TOKEN_ENV)
        .map_err(|_| ServerError::Auth(format!("{GITHUB_TOKEN_ENV} is not set")))?;
    let client = create_token_client(&token)
        .map_err(|e| ServerError::Auth(format!("failed to authenticate with GitHub: {e}")))?;
    let forge = GitHubForgeAdapter::new(client);
    Ok(CheckRun::new(
        forge,
        FakeIssueTracker::new(),
        FakeVcs::new(),
        FakeCensus::new(CensusRole::Contributor),
        FakeJCheckEngine::new(),
    ))
}

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_env("JCHECK_LOG"))
        .init();

    let check_run = build_check_run()?;
    let state = Arc::new(AppState { check_run });

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/reconcile/{owner}/{repo}/{pr_number}", post(reconcile))
        .with_state(state);

    let addr = env::var(SERVER_ADDR_ENV).unwrap_or_else(|_| DEFAULT_SERVER_ADDR.to_string());
    info!(%addr, "starting jcheck server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .await
        .map_err(|e| ServerError::Io(std::io::Error::other(e.to_string())))?;

    Ok(())
}
