//! # jcheck platforms
//!
//! The external contracts the CheckRun engine in `jcheck_core` is built
//! against: the forge, the issue tracker, the version control system, the
//! contributor census, and the jcheck engine itself. Only the
//! forge adapter ships a concrete, network-backed implementation
//! ([`github::GitHubForgeAdapter`]) — the rest are traits whose real
//! implementations are explicitly out of scope. [`fakes`] provides
//! in-memory implementations of all five, used by `jcheck_core`'s own tests
//! and by the `jcheck-integration-tests` crate.

use async_trait::async_trait;

pub mod auth;
pub mod errors;
pub mod fakes;
pub mod github;
pub mod models;

use errors::Error;
use models::{
    Comment, Issue, Label, MergeProbeOutcome, PullRequest, PullRequestFile, Review, StatusCheck,
    User, VcsCommit,
};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

/// Read/write access to pull request metadata, labels, comments, status
/// checks, reviews, and files.
#[async_trait]
pub trait ForgeAdapter: Send + Sync {
    /// Lists every open pull request on the watched repository.
    async fn list_open_pull_requests(
        &self,
        repo_owner: &str,
        repo_name: &str,
    ) -> Result<Vec<PullRequest>, Error>;

    /// Retrieves a single pull request, including its comments, reviews, and
    /// current label set.
    async fn get_pull_request(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
    ) -> Result<PullRequest, Error>;

    async fn set_title(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
        title: &str,
    ) -> Result<(), Error>;

    async fn set_body(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
        body: &str,
    ) -> Result<(), Error>;

    async fn add_label(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
        label: &str,
    ) -> Result<(), Error>;

    async fn remove_label(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
        label: &str,
    ) -> Result<(), Error>;

    async fn list_applied_labels(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
    ) -> Result<Vec<Label>, Error>;

    async fn add_comment(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
        body: &str,
    ) -> Result<u64, Error>;

    async fn update_comment(
        &self,
        repo_owner: &str,
        repo_name: &str,
        comment_id: u64,
        body: &str,
    ) -> Result<(), Error>;

    async fn list_comments(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
    ) -> Result<Vec<Comment>, Error>;

    async fn create_check(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
        check: &StatusCheck,
    ) -> Result<(), Error>;

    async fn update_check(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
        check: &StatusCheck,
    ) -> Result<(), Error>;

    async fn list_files(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
    ) -> Result<Vec<PullRequestFile>, Error>;

    async fn list_reviews(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
    ) -> Result<Vec<Review>, Error>;

    /// Fetches the raw content of `path` at `git_ref` in the given
    /// repository, e.g. `.jcheck/conf`. `Ok(None)` means the path does not
    /// exist at that ref.
    async fn fetch_file(
        &self,
        repo_owner: &str,
        repo_name: &str,
        git_ref: &str,
        path: &str,
    ) -> Result<Option<String>, Error>;
}

/// Read/write access to issues, links, labels, and properties.
#[async_trait]
pub trait IssueTrackerAdapter: Send + Sync {
    async fn get_issue(&self, id: &str) -> Result<Issue, Error>;

    async fn set_title(&self, id: &str, title: &str) -> Result<(), Error>;

    async fn set_state(&self, id: &str, state: models::IssueState) -> Result<(), Error>;

    async fn set_property(&self, id: &str, key: &str, value: &str) -> Result<(), Error>;

    async fn add_label(&self, id: &str, label: &str) -> Result<(), Error>;

    async fn remove_label(&self, id: &str, label: &str) -> Result<(), Error>;

    async fn add_comment(&self, id: &str, body: &str) -> Result<(), Error>;

    async fn add_link(&self, id: &str, relation: &str, target_id: &str) -> Result<(), Error>;
}

/// Clone/fetch, ref resolution, diff, dry-run merge/rebase, cherry-pick, and
/// tagging against the watched repository's version-control system (spec
/// §6, "VCS contract").
#[async_trait]
pub trait VCSAdapter: Send + Sync {
    /// Resolves a ref (branch, tag, or commit-ish) to its current commit
    /// hash, scoped to `repo_owner/repo_name`. Returns `Err(Error::NotFound)`
    /// if the ref does not exist in any branch.
    async fn resolve_ref(
        &self,
        repo_owner: &str,
        repo_name: &str,
        git_ref: &str,
    ) -> Result<VcsCommit, Error>;

    /// Finds a commit by hash or short id across all branches of the
    /// repository, used by the Mergeability Prober to locate a backport's
    /// referenced commit.
    async fn find_commit_on_any_branch(
        &self,
        repo_owner: &str,
        repo_name: &str,
        hash_or_id: &str,
    ) -> Result<VcsCommit, Error>;

    /// `true` iff `ancestor` is an ancestor of `descendant`.
    async fn is_ancestor(
        &self,
        repo_owner: &str,
        repo_name: &str,
        ancestor: &str,
        descendant: &str,
    ) -> Result<bool, Error>;

    /// Dry-run rebase of `source` onto `target`; does not mutate any ref.
    async fn dry_run_rebase(
        &self,
        repo_owner: &str,
        repo_name: &str,
        source: &str,
        target: &str,
    ) -> Result<MergeProbeOutcome, Error>;

    /// `true` iff the commits introduced between `base` and `head` are
    /// exclusively a merge of `target` into `head` with no other file
    /// changes — the predicate `acceptSimpleMerges` needs without the
    /// projector re-deriving it.
    async fn is_simple_merge_of_target(
        &self,
        repo_owner: &str,
        repo_name: &str,
        base: &str,
        head: &str,
        target: &str,
    ) -> Result<bool, Error>;

    /// Dry-run cherry-pick of `commit` onto `onto`, optionally using a fuzzy
    /// three-way merge when `fuzzy` is set.
    async fn dry_run_cherry_pick(
        &self,
        repo_owner: &str,
        repo_name: &str,
        commit: &str,
        onto: &str,
        fuzzy: bool,
    ) -> Result<MergeProbeOutcome, Error>;

    async fn diff_is_empty(
        &self,
        repo_owner: &str,
        repo_name: &str,
        from: &str,
        to: &str,
    ) -> Result<bool, Error>;

    /// Lists every tag name that currently exists in the repository, used
    /// by the Command Dispatcher to reject a `/tag` duplicate.
    async fn list_tags(&self, repo_owner: &str, repo_name: &str) -> Result<Vec<String>, Error>;

    /// Creates an annotated tag `name` pointing at `target_sha`.
    async fn create_tag(
        &self,
        repo_owner: &str,
        repo_name: &str,
        name: &str,
        target_sha: &str,
    ) -> Result<(), Error>;
}

/// Maps forge user identities to contributor roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CensusRole {
    Contributor,
    Author,
    Committer,
    Reviewer,
    Lead,
}

#[async_trait]
pub trait CensusStore: Send + Sync {
    /// Looks up `user`'s role in `project` as of `at_epoch_ms` — the Review
    /// Evaluator resolves roles at the time of the review, not at
    /// reconciliation time.
    async fn role_of(
        &self,
        project: &str,
        user: &User,
        at_epoch_ms: i64,
    ) -> Result<CensusRole, Error>;
}

/// A typed finding produced by running jcheck over a commit range under a
/// configuration blob. Treated as a pure function: the same
/// `(repo-snapshot, config-blob)` always yields the same findings, which is
/// what makes the Check Executor's fingerprint cache sound.
#[async_trait]
pub trait JCheckEngine: Send + Sync {
    async fn run(
        &self,
        repo_owner: &str,
        repo_name: &str,
        commit_range: (&str, &str),
        config_blob: &str,
    ) -> Result<Vec<crate::models::JCheckFinding>, Error>;
}
