//! E5 (cannotRebase, spec §8): a conflicting target-branch commit flips
//! the PR into `merge-conflict` with a single explanatory comment, and
//! restoring a clean target flips it back to `ready` with a single,
//! distinct congratulatory comment — neither ever duplicates.

mod common;

use common::*;
use jcheck_core::models::{LABEL_MERGE_CONFLICT, LABEL_READY};

#[tokio::test]
async fn conflict_then_restore_posts_exactly_one_comment_each_way() {
    let engine = engine_with_issue("My first issue");

    let mut pr = open_pr("This is a pull request", "A simple, well-described change.", "h1");
    pr.reviews.push(approval(reviewer(), "h1", "master"));
    engine.forge().insert_pull_request(pr);
    engine.forge().set_changed_files(1, vec![changed_file("src/lib.rs")]);

    let first = engine.run_once("acme", "widgets", 1, 0).await.unwrap();
    assert!(first.desired.labels.contains(LABEL_READY));

    engine.vcs().set_ref("acme", "widgets", "master", "target2");
    engine
        .vcs()
        .set_conflict("h1", "target2", vec!["src/lib.rs".to_string()]);

    let second = engine.run_once("acme", "widgets", 1, 1).await.unwrap();
    assert!(second.desired.labels.contains(LABEL_MERGE_CONFLICT));
    assert!(!second.desired.labels.contains(LABEL_READY));

    let pr_after_conflict = engine.forge().get_pull_request("acme", "widgets", 1).await.unwrap();
    let conflict_comments: Vec<_> = pr_after_conflict
        .comments
        .iter()
        .filter(|c| c.body.contains("To resolve these merge conflicts"))
        .collect();
    assert_eq!(conflict_comments.len(), 1);

    // Re-run twice more with the conflict still in place: no duplicate comment appears.
    engine.run_once("acme", "widgets", 1, 2).await.unwrap();
    engine.run_once("acme", "widgets", 1, 3).await.unwrap();
    let pr_stable = engine.forge().get_pull_request("acme", "widgets", 1).await.unwrap();
    assert_eq!(
        pr_stable
            .comments
            .iter()
            .filter(|c| c.body.contains("To resolve these merge conflicts"))
            .count(),
        1
    );

    engine.vcs().set_ref("acme", "widgets", "master", "target1");

    let restored = engine.run_once("acme", "widgets", 1, 4).await.unwrap();
    assert!(!restored.desired.labels.contains(LABEL_MERGE_CONFLICT));
    assert!(restored.desired.labels.contains(LABEL_READY));

    let pr_restored = engine.forge().get_pull_request("acme", "widgets", 1).await.unwrap();
    let ready_comments: Vec<_> = pr_restored
        .comments
        .iter()
        .filter(|c| c.body.contains("change now passes all *automated*"))
        .collect();
    assert_eq!(ready_comments.len(), 1);
}
