//! # Models
//!
//! Raw data exchanged with the external collaborators of the CheckRun engine:
//! the forge (pull requests, comments, labels, reviews, checks) and the
//! webhook envelope it arrives in. These are the "observed" shapes described
//! by spec §6 — the core crate never constructs them, only reads them back
//! from a [`crate::ForgeAdapter`] implementation.

use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "models_tests.rs"]
mod tests;

/// A user known to the forge.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub struct User {
    pub id: u64,
    pub login: String,
}

/// A label as applied to or available on a pull request.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub struct Label {
    pub name: String,
}

/// A comment on a pull request, as observed from the forge.
///
/// `created_at_epoch_ms` lets the Command Dispatcher process
/// comments in strict chronological order when replaying a PR's full history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    /// The unique identifier of the comment
    pub id: u64,

    /// The text content of the comment
    pub body: String,

    /// The user who made the comment
    pub user: User,

    /// Milliseconds since the epoch.
    pub created_at_epoch_ms: i64,
}

/// The verdict a reviewer cast on a pull request.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum ReviewState {
    Approved,
    Disapproved,
    Comment,
}

/// A review as observed from the forge. Role resolution against the census
/// and staleness classification happen in `jcheck_core::review_evaluator`;
/// this type only carries what the forge itself reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub user: User,
    pub state: ReviewState,
    /// The commit the review verdict applies to.
    pub commit_sha: String,
    /// The target branch name at the time the review was submitted.
    pub target_ref: String,
    pub submitted_at_epoch_ms: i64,
}

/// A single file changed by a pull request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequestFile {
    pub filename: String,
    pub additions: u64,
    pub deletions: u64,
}

/// The status the bot's `jcheck` status check currently reports.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum CheckStatus {
    InProgress,
    Success,
    Failure,
    Cancelled,
}

/// The `jcheck` status check as last written to the forge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusCheck {
    pub status: CheckStatus,
    pub title: String,
    pub summary: String,
    /// Opaque fingerprint used to skip redundant runs.
    pub metadata: String,
}

/// Represents a pull request from a Git provider.
///
/// This struct contains the essential information about a pull request
/// that is needed for validation and processing. It corresponds to the
/// `PullRequest` entity of spec §3 as surfaced through the `listOpenPRs`/
/// `get_pull_request` calls of the `ForgeAdapter` contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequest {
    /// The pull request number
    pub number: u64,

    /// The title of the pull request
    pub title: String,

    /// The description/body of the pull request, if any
    pub body: Option<String>,

    /// Indicates if the pull request is a draft or not
    pub draft: bool,

    /// The current head commit hash.
    pub head_sha: String,

    /// The branch this PR targets.
    pub base_ref: String,

    /// The user who created the pull request, if available
    pub author: Option<User>,

    pub labels: Vec<Label>,
    pub comments: Vec<Comment>,
    pub reviews: Vec<Review>,
    pub check: Option<StatusCheck>,

    /// Set when the head commit was produced by a force-push rather than a
    /// fast-forward; drives the Mergeability Prober's force-push remediation
    /// comment and the Review Evaluator's staleness rules.
    pub last_force_push_epoch_ms: Option<i64>,
}

impl PullRequest {
    /// Labels currently applied, as plain strings, for convenient set
    /// comparison in the Reconciler.
    pub fn label_names(&self) -> Vec<String> {
        self.labels.iter().map(|l| l.name.clone()).collect()
    }
}

#[derive(Deserialize)]
pub struct Installation {
    pub id: u64,
    pub slug: Option<String>,
    pub client_id: Option<String>,
    pub node_id: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    /// The name of the organization
    pub name: String,
}

#[derive(Deserialize)]
pub struct Repository {
    pub full_name: String,
    pub name: String,
    pub node_id: String,
    pub private: bool,
}

/// The lifecycle state of an issue in the issue tracker.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum IssueState {
    Open,
    InProgress,
    Resolved,
    Closed,
}

/// An issue as observed from the issue tracker, referenced from a pull
/// request body via the Issue Linker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub id: String,
    pub title: String,
    pub state: IssueState,
    pub labels: Vec<Label>,
}

/// The commit a VCS ref currently resolves to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VcsCommit {
    pub hash: String,
    pub short_id: String,
    /// The commit message, consulted by the Mergeability Prober to extract
    /// the original issue id a backport references.
    pub message: String,
}

/// The result of a dry-run rebase, merge, or cherry-pick probe performed by
/// a [`crate::VCSAdapter`], without mutating any ref.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum MergeProbeOutcome {
    Clean { resulting_tree_hash: String },
    Conflict { conflicting_paths: Vec<String> },
}

/// The severity of a single jcheck finding.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum FindingSeverity {
    Error,
    Warning,
}

/// One problem reported by running jcheck over a commit range under a
/// configuration blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JCheckFinding {
    pub check_name: String,
    pub severity: FindingSeverity,
    pub message: String,
    pub path: Option<String>,
}
