//! Shared scenario builders for the end-to-end reconciliation tests in
//! spec §8. Each scenario seeds a `CheckRun` built from the in-memory
//! fakes with the same project/census shape — a single census
//! (`"TEST"`) and a single watched repository (`acme/widgets`) — and
//! drives it through `run_once` the number of times the scenario calls
//! for.

#![allow(dead_code)]

use jcheck_core::models::JCheckConfig;
use jcheck_core::CheckRun;
use jcheck_platforms::fakes::{FakeCensus, FakeForge, FakeIssueTracker, FakeJCheckEngine, FakeVcs};
use jcheck_platforms::models::{
    Issue, IssueState, JCheckFinding, PullRequest, PullRequestFile, Review, ReviewState, User,
};
use jcheck_platforms::CensusRole;

/// The `.jcheck/conf` shared by every scenario unless noted otherwise: one
/// required `reviewer`-role approval, no CSR/JEP/merge/backport checks.
pub const BASE_CONFIG: &str = r#"
[general]
project = "TEST"

[checks]

[census]
census_repo = "acme/census"
issue_project = "TEST"

[repository]
reviewers = { Reviewer = 1 }
"#;

pub type Engine = CheckRun<FakeForge, FakeIssueTracker, FakeVcs, FakeCensus, FakeJCheckEngine>;

pub fn author() -> User {
    User {
        id: 1,
        login: "duke".to_string(),
    }
}

pub fn reviewer() -> User {
    User {
        id: 2,
        login: "reviewbot".to_string(),
    }
}

/// Builds a `CheckRun` with `BASE_CONFIG` already seeded at `master`, a
/// resolvable target ref, and the primary issue `TEST-1` seeded with the
/// given title. The PR itself still needs to be inserted by the caller.
pub fn engine_with_issue(issue_title: &str) -> Engine {
    let check_run: Engine = CheckRun::new(
        FakeForge::new(),
        FakeIssueTracker::new(),
        FakeVcs::new(),
        FakeCensus::new(CensusRole::Contributor),
        FakeJCheckEngine::new(),
    );
    check_run.forge().insert_file("master", ".jcheck/conf", BASE_CONFIG);
    check_run.vcs().set_ref("acme", "widgets", "master", "target1");
    check_run.issue_tracker().insert_issue(Issue {
        id: "TEST-1".to_string(),
        title: issue_title.to_string(),
        state: IssueState::Open,
        labels: Vec::new(),
    });
    check_run
        .census()
        .set_role("TEST", &reviewer(), CensusRole::Reviewer);
    check_run
}

/// A minimal open, non-draft PR with one changed file (so the
/// empty-body/no-changes special-case checks don't fire), titled with the
/// `TEST-1` numeric prefix the fakes above resolve.
pub fn open_pr(title: &str, body: &str, head_sha: &str) -> PullRequest {
    PullRequest {
        number: 1,
        title: title.to_string(),
        body: Some(body.to_string()),
        draft: false,
        head_sha: head_sha.to_string(),
        base_ref: "master".to_string(),
        author: Some(author()),
        labels: Vec::new(),
        comments: Vec::new(),
        reviews: Vec::new(),
        check: None,
        last_force_push_epoch_ms: None,
    }
}

pub fn changed_file(path: &str) -> PullRequestFile {
    PullRequestFile {
        filename: path.to_string(),
        additions: 1,
        deletions: 0,
    }
}

pub fn approval(user: User, commit_sha: &str, target_ref: &str) -> Review {
    Review {
        user,
        state: ReviewState::Approved,
        commit_sha: commit_sha.to_string(),
        target_ref: target_ref.to_string(),
        submitted_at_epoch_ms: 0,
    }
}

/// Recomputes exactly the config blob the Check Executor hashes the jcheck
/// engine's findings cache key on, so a scenario can register scripted
/// findings against the same key `run_with_config` will look them up with.
pub fn base_config_blob() -> String {
    let config: JCheckConfig = toml::from_str(BASE_CONFIG).expect("BASE_CONFIG must parse");
    toml::to_string(&config).unwrap_or_default()
}

/// Scripts the jcheck engine to report `findings` for the `(target_head,
/// source_head)` commit range under [`BASE_CONFIG`]'s blob.
pub fn seed_findings(engine: &Engine, target_head: &str, source_head: &str, findings: Vec<JCheckFinding>) {
    engine
        .jcheck_engine()
        .set_findings((target_head, source_head), &base_config_blob(), findings);
}
