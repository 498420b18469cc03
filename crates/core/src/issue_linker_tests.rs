use super::*;
use jcheck_platforms::fakes::FakeIssueTracker;
use jcheck_platforms::models::{IssueState, Label};

#[test]
fn test_classify_title_bare_numeric() {
    assert_eq!(classify_title("1234"), TitleForm::Bare(1234));
}

#[test]
fn test_classify_title_project_prefixed() {
    assert_eq!(
        classify_title("TEST-42: fix the thing"),
        TitleForm::ProjectPrefixed("TEST".to_string(), 42)
    );
}

#[test]
fn test_classify_title_canonical() {
    assert_eq!(
        classify_title("42: fix the thing"),
        TitleForm::Canonical(42, "fix the thing".to_string())
    );
}

#[test]
fn test_canonicalize_title_rewrites_bare_id() {
    let rewritten = canonicalize_title("42", "My first issue", 42);
    assert_eq!(rewritten, "42: My first issue");
}

#[test]
fn test_canonicalize_title_restores_truncated_title() {
    let rewritten = canonicalize_title("42: My first…", "My first issue", 42);
    assert_eq!(rewritten, "42: My first issue");
}

#[test]
fn test_canonicalize_title_leaves_canonical_title_alone() {
    let rewritten = canonicalize_title("42: My first issue", "My first issue", 42);
    assert_eq!(rewritten, "42: My first issue");
}

fn seed_issue(tracker: &FakeIssueTracker, id: &str, title: &str) {
    tracker.insert_issue(jcheck_platforms::models::Issue {
        id: id.to_string(),
        title: title.to_string(),
        state: IssueState::Open,
        labels: Vec::<Label>::new(),
    });
}

#[tokio::test]
async fn test_primary_issue_bare_numeric_resolves_against_configured_project() {
    let tracker = FakeIssueTracker::new();
    seed_issue(&tracker, "TEST-1", "My first issue");

    let issue_ref = primary_issue(&tracker, "TEST", "1: My first issue", Some("Fixes TEST-1"))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(issue_ref.project, "TEST");
    assert_eq!(issue_ref.numeric_id, 1);
}

#[tokio::test]
async fn test_primary_issue_freeform_title_has_no_primary_issue_and_no_blocker() {
    let tracker = FakeIssueTracker::new();

    let issue_ref = primary_issue(&tracker, "TEST", "This is a pull request", None)
        .await
        .unwrap();

    assert!(issue_ref.is_none());
}

#[tokio::test]
async fn test_primary_issue_wrong_project_is_blocked() {
    let tracker = FakeIssueTracker::new();

    let blocker = primary_issue(&tracker, "TEST", "BADPROJECT-1: something", None)
        .await
        .unwrap_err();

    assert!(matches!(blocker, IntegrationBlocker::WrongProject { .. }));
    assert!(blocker.message().contains("does not belong to the `TEST` project"));
}

#[tokio::test]
async fn test_primary_issue_nonexistent_id_is_blocked() {
    let tracker = FakeIssueTracker::new();

    let blocker = primary_issue(&tracker, "TEST", "2384848: whatever", None)
        .await
        .unwrap_err();

    assert!(matches!(blocker, IntegrationBlocker::FailedToRetrieve { .. }));
    assert!(blocker.message().contains("Failed to retrieve"));
}

#[test]
fn test_jep_label_policy() {
    assert!(!jep_label_applies("Targeted", IssueLifecycle::Open));
    assert!(!jep_label_applies("Delivered", IssueLifecycle::Closed));
    assert!(jep_label_applies("Delivered", IssueLifecycle::Open));
    assert!(jep_label_applies("Candidate", IssueLifecycle::Open));
}

#[test]
fn test_discover_related_ids_from_command_and_body_list() {
    let body = "### Issues\n- TEST-2\n/issue add TEST-3\n";
    let ids = discover_related_ids(body);
    assert_eq!(ids, vec!["TEST-2".to_string(), "TEST-3".to_string()]);
}
