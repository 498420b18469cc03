//! Reconciler.
//!
//! Diffs the State Projector's [`DesiredState`] against what the forge
//! currently reports and emits the minimal set of mutations through a
//! [`ForgeAdapter`]. Comments are located and updated in place by their
//! hidden marker; labels and the status check are written only when they
//! actually differ, so a repeated run with unchanged inputs is a no-op
//!.

use std::collections::BTreeSet;

use jcheck_platforms::models::{PullRequest, StatusCheck};
use jcheck_platforms::ForgeAdapter;

use crate::errors::CheckRunError;
use crate::models::DesiredState;

#[cfg(test)]
#[path = "reconciler_tests.rs"]
mod tests;

/// What a reconciliation pass actually did, for logging and tests.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileActions {
    pub labels_added: Vec<String>,
    pub labels_removed: Vec<String>,
    pub body_updated: bool,
    pub check_updated: bool,
    pub comments_posted: u32,
    pub comments_updated: u32,
}

impl ReconcileActions {
    pub fn is_noop(&self) -> bool {
        self.labels_added.is_empty()
            && self.labels_removed.is_empty()
            && !self.body_updated
            && !self.check_updated
            && self.comments_posted == 0
            && self.comments_updated == 0
    }
}

/// Applies `desired` against the forge state observed in `pr`
///. `check_metadata` is the fingerprint string computed by the
/// Check Executor, compared alongside status and summary before rewriting
/// the status check.
pub async fn reconcile(
    forge: &dyn ForgeAdapter,
    repo_owner: &str,
    repo_name: &str,
    pr: &PullRequest,
    desired: &DesiredState,
    check_metadata: &str,
) -> Result<ReconcileActions, CheckRunError> {
    let mut actions = ReconcileActions::default();

    reconcile_labels(forge, repo_owner, repo_name, pr, desired, &mut actions).await?;
    reconcile_body(forge, repo_owner, repo_name, pr, desired, &mut actions).await?;
    reconcile_check(forge, repo_owner, repo_name, pr, desired, check_metadata, &mut actions).await?;
    reconcile_comments(forge, repo_owner, repo_name, pr, desired, &mut actions).await?;

    Ok(actions)
}

async fn reconcile_labels(
    forge: &dyn ForgeAdapter,
    repo_owner: &str,
    repo_name: &str,
    pr: &PullRequest,
    desired: &DesiredState,
    actions: &mut ReconcileActions,
) -> Result<(), CheckRunError> {
    let current: BTreeSet<String> = pr.label_names().into_iter().collect();

    for label in desired.labels.difference(&current) {
        forge.add_label(repo_owner, repo_name, pr.number, label).await?;
        actions.labels_added.push(label.clone());
    }
    for label in current.difference(&desired.labels) {
        forge.remove_label(repo_owner, repo_name, pr.number, label).await?;
        actions.labels_removed.push(label.clone());
    }
    Ok(())
}

async fn reconcile_body(
    forge: &dyn ForgeAdapter,
    repo_owner: &str,
    repo_name: &str,
    pr: &PullRequest,
    desired: &DesiredState,
    actions: &mut ReconcileActions,
) -> Result<(), CheckRunError> {
    if pr.body.as_deref().unwrap_or("") != desired.body {
        forge.set_body(repo_owner, repo_name, pr.number, &desired.body).await?;
        actions.body_updated = true;
    }
    Ok(())
}

async fn reconcile_check(
    forge: &dyn ForgeAdapter,
    repo_owner: &str,
    repo_name: &str,
    pr: &PullRequest,
    desired: &DesiredState,
    check_metadata: &str,
    actions: &mut ReconcileActions,
) -> Result<(), CheckRunError> {
    let desired_status: jcheck_platforms::models::CheckStatus = desired.check_status.into();

    let differs = match &pr.check {
        Some(existing) => {
            existing.status != desired_status
                || existing.title != desired.check_title
                || existing.summary != desired.check_summary
                || existing.metadata != check_metadata
        }
        None => true,
    };
    if !differs {
        return Ok(());
    }

    let check = StatusCheck {
        status: desired_status,
        title: desired.check_title.clone(),
        summary: desired.check_summary.clone(),
        metadata: check_metadata.to_string(),
    };
    match &pr.check {
        Some(_) => forge.update_check(repo_owner, repo_name, pr.number, &check).await?,
        None => forge.create_check(repo_owner, repo_name, pr.number, &check).await?,
    }
    actions.check_updated = true;
    Ok(())
}

/// Locates each desired comment by its marker among `pr.comments`: appends
/// if absent, updates in place if content differs and the comment is not
/// one-shot, otherwise leaves it untouched.
async fn reconcile_comments(
    forge: &dyn ForgeAdapter,
    repo_owner: &str,
    repo_name: &str,
    pr: &PullRequest,
    desired: &DesiredState,
    actions: &mut ReconcileActions,
) -> Result<(), CheckRunError> {
    for comment in &desired.outbound_comments {
        let marker_str = comment.marker.as_str();
        match pr.comments.iter().find(|c| c.body.contains(marker_str)) {
            Some(existing) => {
                if !comment.one_shot && existing.body != comment.body {
                    forge
                        .update_comment(repo_owner, repo_name, existing.id, &comment.body)
                        .await?;
                    actions.comments_updated += 1;
                }
            }
            None => {
                forge.add_comment(repo_owner, repo_name, pr.number, &comment.body).await?;
                actions.comments_posted += 1;
            }
        }
    }
    Ok(())
}
