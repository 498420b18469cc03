//! Mergeability Prober.
//!
//! Determines whether a PR can cleanly rebase onto its target, classifies
//! merge-style and backport-style PRs, and extracts the original issue
//! ids from a backport's referenced commit for the Issue Linker to seed.

use jcheck_platforms::models::MergeProbeOutcome;
use jcheck_platforms::VCSAdapter;

use crate::config::{BACKPORT_TITLE_REGEX, MERGE_TITLE_REGEX};
use crate::errors::CheckRunError;

#[cfg(test)]
#[path = "mergeability_tests.rs"]
mod tests;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebaseStatus {
    Clean,
    Conflict { conflicting_paths: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeClassification {
    /// Not a `Merge [<source>:]<branch>` title.
    NotAMergePr,
    Permitted { source: Option<String>, branch: String },
    Refused { source: Option<String>, branch: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackportClassification {
    NotABackportPr,
    Clean {
        referenced_commit: String,
        /// The `<id>: <title>` header recovered from the referenced
        /// commit's message, used to seed the Issue Linker in
        /// place of the `Backport <hash>` PR title.
        original_title: Option<String>,
    },
    Dirty {
        referenced_commit: String,
        original_title: Option<String>,
    },
    MissingCommit { reference: String },
    ReferencedCommitIsAncestor { referenced_commit: String },
}

/// Dry-run rebases `pr_head` onto `target_head`.
pub async fn probe_rebase(
    vcs: &dyn VCSAdapter,
    repo_owner: &str,
    repo_name: &str,
    pr_head: &str,
    target_head: &str,
) -> Result<RebaseStatus, CheckRunError> {
    let outcome = vcs
        .dry_run_rebase(repo_owner, repo_name, pr_head, target_head)
        .await?;
    Ok(match outcome {
        MergeProbeOutcome::Clean { .. } => RebaseStatus::Clean,
        MergeProbeOutcome::Conflict { conflicting_paths } => {
            RebaseStatus::Conflict { conflicting_paths }
        }
    })
}

/// Classifies a `Merge [<source>:]<branch>` PR title. A merge
/// is permitted only when `enable_merge` is set; the merge parents are
/// assumed to have already been validated by the caller via
/// [`jcheck_platforms::VCSAdapter::is_ancestor`].
pub fn classify_merge_title(title: &str, enable_merge: bool) -> MergeClassification {
    let Some(captures) = MERGE_TITLE_REGEX.captures(title.trim()) else {
        return MergeClassification::NotAMergePr;
    };
    let source = captures.get(1).map(|m| m.as_str().to_string());
    let branch = captures[2].to_string();
    if enable_merge {
        MergeClassification::Permitted { source, branch }
    } else {
        MergeClassification::Refused { source, branch }
    }
}

/// Classifies a `Backport <hash-or-id>` PR title: locates the
/// referenced commit across all branches, rejects it if missing or
/// already an ancestor of the PR head, and otherwise dry-run
/// cherry-picks it to decide clean vs dirty.
pub async fn classify_backport_title(
    vcs: &dyn VCSAdapter,
    repo_owner: &str,
    repo_name: &str,
    title: &str,
    pr_head: &str,
    fuzzy: bool,
) -> Result<BackportClassification, CheckRunError> {
    let Some(captures) = BACKPORT_TITLE_REGEX.captures(title.trim()) else {
        return Ok(BackportClassification::NotABackportPr);
    };
    let reference = captures[1].to_string();

    let commit = match vcs
        .find_commit_on_any_branch(repo_owner, repo_name, &reference)
        .await
    {
        Ok(commit) => commit,
        Err(e) if matches!(e, jcheck_platforms::errors::Error::NotFound(_)) => {
            return Ok(BackportClassification::MissingCommit { reference });
        }
        Err(e) => return Err(e.into()),
    };

    if vcs
        .is_ancestor(repo_owner, repo_name, &commit.hash, pr_head)
        .await?
    {
        return Ok(BackportClassification::ReferencedCommitIsAncestor {
            referenced_commit: commit.hash,
        });
    }

    let outcome = vcs
        .dry_run_cherry_pick(repo_owner, repo_name, &commit.hash, pr_head, fuzzy)
        .await?;

    let original_title = crate::issue_linker::extract_backport_title(&commit.message);

    Ok(match outcome {
        MergeProbeOutcome::Clean { .. } => BackportClassification::Clean {
            referenced_commit: commit.hash,
            original_title,
        },
        MergeProbeOutcome::Conflict { .. } => BackportClassification::Dirty {
            referenced_commit: commit.hash,
            original_title,
        },
    })
}
