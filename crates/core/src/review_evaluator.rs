//! Review Evaluator.
//!
//! Maps forge reviews onto census roles, excludes self-reviews, and
//! decides which verdicts are *active* vs *stale* with respect to the
//! current PR head and target ref.

use std::collections::BTreeMap;

use jcheck_platforms::models::{PullRequest, Review, ReviewState};
use jcheck_platforms::CensusStore;

use crate::models::{Role, Verdict};

#[cfg(test)]
#[path = "review_evaluator_tests.rs"]
mod tests;

/// A review resolved against the census, with self-review and staleness
/// already decided.
#[derive(Debug, Clone)]
pub struct EvaluatedReview {
    pub user_id: u64,
    pub login: String,
    pub role: Role,
    pub verdict: Verdict,
    pub active: bool,
    pub is_self_review: bool,
}

fn to_verdict(state: &ReviewState) -> Verdict {
    match state {
        ReviewState::Approved => Verdict::Approved,
        ReviewState::Disapproved => Verdict::Disapproved,
        ReviewState::Comment => Verdict::Comment,
    }
}

/// Whether the commits added since `review.commit_sha` are exclusively a
/// merge of the target into the source, so the review stays active under
/// `acceptSimpleMerges`.
pub type SimpleMergeProbe<'a> = dyn Fn(&str, &str) -> bool + Send + Sync + 'a;

/// Evaluates every review on `pr`, resolving each reviewer's role at the
/// time they reviewed.
pub async fn evaluate(
    census: &dyn CensusStore,
    project: &str,
    pr: &PullRequest,
    accept_simple_merges: bool,
    is_simple_merge_since: &SimpleMergeProbe<'_>,
) -> Result<Vec<EvaluatedReview>, jcheck_platforms::errors::Error> {
    let author_id = pr.author.as_ref().map(|a| a.id);
    let mut evaluated = Vec::with_capacity(pr.reviews.len());

    for review in &pr.reviews {
        evaluated.push(evaluate_one(census, project, pr, review, author_id, accept_simple_merges, is_simple_merge_since).await?);
    }

    Ok(evaluated)
}

async fn evaluate_one(
    census: &dyn CensusStore,
    project: &str,
    pr: &PullRequest,
    review: &Review,
    author_id: Option<u64>,
    accept_simple_merges: bool,
    is_simple_merge_since: &SimpleMergeProbe<'_>,
) -> Result<EvaluatedReview, jcheck_platforms::errors::Error> {
    let is_self_review = author_id == Some(review.user.id);

    let role: Role = census
        .role_of(project, &review.user, review.submitted_at_epoch_ms)
        .await?
        .into();

    let head_matches = review.commit_sha == pr.head_sha;
    let target_matches = review.target_ref == pr.base_ref;

    let stale_but_accepted = !head_matches
        && target_matches
        && accept_simple_merges
        && is_simple_merge_since(&review.commit_sha, &pr.head_sha);

    let active = !is_self_review && target_matches && (head_matches || stale_but_accepted);

    Ok(EvaluatedReview {
        user_id: review.user.id,
        login: review.user.login.clone(),
        role,
        verdict: to_verdict(&review.state),
        active,
        is_self_review,
    })
}

/// Counts *active* approvals per role.
pub fn active_counts_by_role(reviews: &[EvaluatedReview]) -> BTreeMap<Role, u32> {
    let mut counts = BTreeMap::new();
    for review in reviews {
        if review.active && review.verdict == Verdict::Approved {
            *counts.entry(review.role).or_insert(0) += 1;
        }
    }
    counts
}

/// Whether `self_review_present` should fail the check regardless of
/// other approvals.
pub fn self_review_blocks(reviews: &[EvaluatedReview]) -> bool {
    reviews
        .iter()
        .any(|r| r.is_self_review && r.verdict == Verdict::Approved)
}

/// Whether every role threshold in `requirement` is met by `counts`
///.
pub fn requirement_satisfied(
    requirement: &crate::models::ReviewerRequirement,
    counts: &BTreeMap<Role, u32>,
) -> bool {
    requirement
        .0
        .iter()
        .all(|(role, minimum)| counts.get(role).copied().unwrap_or(0) >= *minimum)
}
