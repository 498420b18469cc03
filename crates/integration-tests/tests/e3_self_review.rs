//! E3 (selfReview, spec §8): the author's own approval never counts toward
//! the reviewer requirement, and self-review trips the check to failure
//! even though the rendered body still lists the Reviewer role.

mod common;

use common::*;
use jcheck_core::models::{CheckStatus, LABEL_RFR};

#[tokio::test]
async fn self_approval_fails_the_check_and_withholds_rfr() {
    let engine = engine_with_issue("My first issue");
    engine
        .census()
        .set_role("TEST", &author(), jcheck_platforms::CensusRole::Reviewer);

    let mut pr = open_pr("This is a pull request", "A simple, well-described change.", "h1");
    pr.reviews.push(approval(author(), "h1", "master"));
    engine.forge().insert_pull_request(pr);
    engine.forge().set_changed_files(1, vec![changed_file("src/lib.rs")]);

    let outcome = engine.run_once("acme", "widgets", 1, 0).await.unwrap();
    assert_eq!(outcome.desired.check_status, CheckStatus::Failure);
    assert!(!outcome.desired.labels.contains(LABEL_RFR));
    assert!(outcome.desired.body.contains("Reviewer"));
}
