use super::*;
use jcheck_platforms::fakes::{FakeCensus, FakeForge, FakeIssueTracker, FakeJCheckEngine, FakeVcs};
use jcheck_platforms::models::{Issue, IssueState, PullRequest, PullRequestFile, User};
use jcheck_platforms::CensusRole;

const VALID_CONFIG: &str = r#"
[general]
project = "TEST"

[checks]

[census]
census_repo = "acme/census"
issue_project = "TEST"

[repository]
"#;

fn author() -> User {
    User {
        id: 1,
        login: "author".to_string(),
    }
}

fn open_pr() -> PullRequest {
    PullRequest {
        number: 1,
        title: "1: This is a pull request".to_string(),
        body: Some("A description of the change. This is a pull request.".to_string()),
        draft: false,
        head_sha: "head1".to_string(),
        base_ref: "master".to_string(),
        author: Some(author()),
        labels: Vec::new(),
        comments: Vec::new(),
        reviews: Vec::new(),
        check: None,
        last_force_push_epoch_ms: None,
    }
}

fn engine() -> CheckRun<FakeForge, FakeIssueTracker, FakeVcs, FakeCensus, FakeJCheckEngine> {
    CheckRun::new(
        FakeForge::new(),
        FakeIssueTracker::new(),
        FakeVcs::new(),
        FakeCensus::new(CensusRole::Contributor),
        FakeJCheckEngine::new(),
    )
}

/// A clean engine with a PR that has every clean-reconciliation precondition
/// already seeded: a resolvable `.jcheck/conf`, a target ref, a matching
/// issue, and a non-empty changed-file set.
fn clean_engine() -> CheckRun<FakeForge, FakeIssueTracker, FakeVcs, FakeCensus, FakeJCheckEngine> {
    let check_run = engine();
    check_run.forge.insert_pull_request(open_pr());
    check_run
        .forge
        .insert_file("master", ".jcheck/conf", VALID_CONFIG);
    check_run.forge.set_changed_files(
        1,
        vec![PullRequestFile {
            filename: "src/Widget.java".to_string(),
            additions: 3,
            deletions: 1,
        }],
    );
    check_run.vcs.set_ref("acme", "widgets", "master", "target1");
    check_run.issue_tracker.insert_issue(Issue {
        id: "TEST-1".to_string(),
        title: "This is a pull request".to_string(),
        state: IssueState::Open,
        labels: Vec::new(),
    });
    check_run
}

#[tokio::test]
async fn run_once_without_jcheck_conf_surfaces_a_failing_config_problem() {
    let check_run = engine();
    check_run.forge.insert_pull_request(open_pr());
    check_run.vcs.set_ref("acme", "widgets", "master", "target1");

    let report = check_run.run_once("acme", "widgets", 1, 0).await.unwrap();

    assert_eq!(report.desired.check_status, models::CheckStatus::Failure);
    assert_eq!(report.actions.comments_posted, 1);
}

#[tokio::test]
async fn run_once_with_clean_config_reaches_rfr() {
    let check_run = clean_engine();

    let report = check_run.run_once("acme", "widgets", 1, 0).await.unwrap();

    assert_eq!(report.desired.check_status, models::CheckStatus::Success);
    assert!(report.desired.labels.contains(models::LABEL_RFR));
    assert!(!report.desired.labels.contains(models::LABEL_READY));
}

#[tokio::test]
async fn second_tick_with_unchanged_inputs_is_a_cache_hit_and_a_noop() {
    let check_run = clean_engine();

    let first = check_run.run_once("acme", "widgets", 1, 0).await.unwrap();
    assert!(!first.cache_hit);

    // Nothing about the PR, its target branch, or the configuration changed
    // between ticks, so the fingerprint the second tick computes is
    // identical to the one stored by the first.
    let second = check_run.run_once("acme", "widgets", 1, 0).await.unwrap();
    assert!(second.cache_hit);
    assert!(second.actions.is_noop());
}

#[tokio::test]
async fn invalidate_cache_forces_a_recompute() {
    let check_run = clean_engine();

    let first = check_run.run_once("acme", "widgets", 1, 0).await.unwrap();
    assert!(!first.cache_hit);

    check_run.invalidate_cache(1);

    let second = check_run.run_once("acme", "widgets", 1, 0).await.unwrap();
    assert!(!second.cache_hit);
}

#[tokio::test]
async fn merge_conflict_yields_merge_conflict_label_and_no_ready() {
    let check_run = clean_engine();
    check_run
        .vcs
        .set_conflict("head1", "target1", vec!["src/Main.java".to_string()]);

    let report = check_run.run_once("acme", "widgets", 1, 0).await.unwrap();

    assert!(report.desired.labels.contains(models::LABEL_MERGE_CONFLICT));
    assert!(!report.desired.labels.contains(models::LABEL_READY));
    assert!(!report.desired.labels.contains(models::LABEL_RFR));
}
