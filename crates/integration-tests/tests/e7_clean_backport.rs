//! E7 (cleanBackport, spec §8): a `Backport <hash>` title whose cherry-pick
//! applies cleanly gets rewritten to `<id>: <issue-title>` and labeled both
//! `backport` and `clean`, with the original change's reviewer count still
//! applying.

mod common;

use common::*;
use jcheck_core::models::{LABEL_BACKPORT, LABEL_CLEAN, LABEL_READY};

const BACKPORT_CONFIG: &str = r#"
[general]
project = "TEST"

[checks]
enable_backport = true

[census]
census_repo = "acme/census"
issue_project = "TEST"

[repository]
reviewers = { Reviewer = 1 }
"#;

#[tokio::test]
async fn clean_backport_rewrites_title_and_applies_clean_label() {
    let engine = engine_with_issue("My first issue");
    engine.forge().insert_file("master", ".jcheck/conf", BACKPORT_CONFIG);

    engine.vcs().set_parent("abc1234f", "root-commit");
    engine
        .vcs()
        .set_commit_message("abc1234f", "1: My first issue\n\nOriginal change.");

    let mut pr = open_pr(
        "Backport abc1234f",
        "Backporting the original fix for My first issue.",
        "bp1",
    );
    pr.reviews.push(approval(reviewer(), "bp1", "master"));
    engine.forge().insert_pull_request(pr);
    engine.forge().set_changed_files(1, vec![changed_file("src/lib.rs")]);

    let outcome = engine.run_once("acme", "widgets", 1, 0).await.unwrap();
    assert!(outcome.desired.labels.contains(LABEL_BACKPORT));
    assert!(outcome.desired.labels.contains(LABEL_CLEAN));
    assert!(outcome.desired.labels.contains(LABEL_READY));

    let pr_after = engine.forge().get_pull_request("acme", "widgets", 1).await.unwrap();
    assert_eq!(pr_after.title, "1: My first issue");
}
