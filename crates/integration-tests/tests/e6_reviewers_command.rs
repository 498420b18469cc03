//! E6 (reviewersCommand, spec §8): `/reviewers N` raises or lowers the
//! running requirement; only a Reviewer-or-above issuer may lower it, and
//! an unauthorized attempt gets a marker-keyed denial reply instead.

mod common;

use common::*;
use jcheck_core::commands::DENY_REVIEWERS_DECREASE_MESSAGE;
use jcheck_core::models::LABEL_READY;
use jcheck_platforms::models::Comment;
use jcheck_platforms::{CensusRole, CensusStore};

fn comment(id: u64, user: jcheck_platforms::models::User, body: &str, at: i64) -> Comment {
    Comment {
        id,
        body: body.to_string(),
        user,
        created_at_epoch_ms: at,
    }
}

#[tokio::test]
async fn reviewers_command_raise_requires_second_approval_then_author_cannot_lower() {
    let engine = engine_with_issue("My first issue");

    let mut pr = open_pr("This is a pull request", "A simple, well-described change.", "h1");
    pr.reviews.push(approval(reviewer(), "h1", "master"));
    pr.comments.push(comment(1, author(), "/reviewers 2", 0));
    engine.forge().insert_pull_request(pr);
    engine.forge().set_changed_files(1, vec![changed_file("src/lib.rs")]);

    let first = engine.run_once("acme", "widgets", 1, 0).await.unwrap();
    assert!(!first.desired.labels.contains(LABEL_READY));
    assert!(first.desired.body.contains("1/2 required Reviewer review(s)"));

    let mut pr = engine.forge().get_pull_request("acme", "widgets", 1).await.unwrap();
    pr.comments
        .push(comment(2, reviewer(), "/reviewers 1", 1));
    engine.forge().insert_pull_request(pr);

    let second = engine.run_once("acme", "widgets", 1, 1).await.unwrap();
    assert!(second.desired.labels.contains(LABEL_READY));

    let mut pr = engine.forge().get_pull_request("acme", "widgets", 1).await.unwrap();
    pr.comments.push(comment(3, author(), "/reviewers 0", 2));
    engine.forge().insert_pull_request(pr);

    let third = engine.run_once("acme", "widgets", 1, 2).await.unwrap();
    assert!(third.desired.labels.contains(LABEL_READY));
    let pr_final = engine.forge().get_pull_request("acme", "widgets", 1).await.unwrap();
    let denial: Vec<_> = pr_final
        .comments
        .iter()
        .filter(|c| c.body.contains(DENY_REVIEWERS_DECREASE_MESSAGE))
        .collect();
    assert_eq!(denial.len(), 1);

    // Sanity: the author genuinely has no Reviewer role, so the denial is real authorization, not an accident.
    assert_eq!(
        engine
            .census()
            .role_of("TEST", &author(), 0)
            .await
            .unwrap(),
        CensusRole::Contributor
    );
}
