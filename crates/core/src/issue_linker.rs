//! Issue Linker.
//!
//! Canonicalizes the PR title, resolves the primary issue, and discovers
//! related issues (CSRs, JEPs, backport chains) referenced from the body
//! or `/issue` commands.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Mutex;

use jcheck_platforms::models::{Issue, IssueState};
use jcheck_platforms::IssueTrackerAdapter;
use tokio::sync::broadcast;

use crate::config::{BARE_NUMERIC_ID_REGEX, PROJECT_PREFIXED_ID_REGEX, TITLE_SEPARATOR_REGEX};
use crate::models::{IssueKind, IssueLifecycle, IssueRef};

#[cfg(test)]
#[path = "issue_linker_tests.rs"]
mod tests;

/// What the PR title looked like before canonicalization.
#[derive(Debug, PartialEq, Eq)]
pub enum TitleForm {
    Bare(u64),
    ProjectPrefixed(String, u64),
    Canonical(u64, String),
    Unrecognized,
}

/// A reason the PR cannot integrate even though jcheck itself may be
/// green.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrationBlocker {
    WrongProject { expected: String, found: String },
    FailedToRetrieve { id: String },
    TitleMismatch { pr_title: String, issue_title: String },
}

impl IntegrationBlocker {
    pub fn message(&self) -> String {
        match self {
            IntegrationBlocker::WrongProject { expected, found } => format!(
                "Issue `{found}` does not belong to the `{expected}` project"
            ),
            IntegrationBlocker::FailedToRetrieve { id } => {
                format!("Failed to retrieve issue `{id}`")
            }
            IntegrationBlocker::TitleMismatch { issue_title, .. } => {
                format!("PR title does not match the referenced issue's title (\"{issue_title}\")")
            }
        }
    }
}

/// Classifies the raw PR title.
pub fn classify_title(title: &str) -> TitleForm {
    let trimmed = title.trim().replace('\u{00A0}', " ");

    if let Some(captures) = BARE_NUMERIC_ID_REGEX.captures(&trimmed) {
        return TitleForm::Bare(captures[1].parse().unwrap_or(0));
    }
    if let Some(captures) = TITLE_SEPARATOR_REGEX.captures(&trimmed) {
        if let Ok(id) = captures[1].parse() {
            return TitleForm::Canonical(id, captures[2].to_string());
        }
    }
    if let Some(captures) = PROJECT_PREFIXED_ID_REGEX.captures(&trimmed) {
        if let Ok(id) = captures[2].parse() {
            return TitleForm::ProjectPrefixed(captures[1].to_string(), id);
        }
    }
    TitleForm::Unrecognized
}

/// Rewrites a bare-numeric or `<project>-<id>` title (or one truncated by
/// the forge to `…`) into the canonical `<numeric-id>: <issue-title>`
/// form.
pub fn canonicalize_title(title: &str, issue_title: &str, numeric_id: u64) -> String {
    let truncated = title.trim_end().ends_with('…') || title.trim_end().ends_with("...");
    match classify_title(title) {
        TitleForm::Canonical(_, _) if !truncated => title.to_string(),
        _ => format!("{numeric_id}: {issue_title}"),
    }
}

fn to_kind(issue: &Issue) -> IssueKind {
    let lower = issue.title.to_lowercase();
    if lower.contains("jep") {
        IssueKind::Jep
    } else if lower.contains("csr") || lower.contains("compatibility") {
        IssueKind::Csr
    } else {
        IssueKind::Bug
    }
}

fn to_lifecycle(state: IssueState) -> IssueLifecycle {
    match state {
        IssueState::Open => IssueLifecycle::Open,
        IssueState::InProgress => IssueLifecycle::InProgress,
        IssueState::Resolved => IssueLifecycle::Resolved,
        IssueState::Closed => IssueLifecycle::Closed,
    }
}

/// Resolves the primary issue for a PR per the ordered rules of spec
/// §4.2: numeric prefix, explicit project-qualified id, nonexistent id,
/// title mismatch. A title carrying no id at all (`Unrecognized`) has no
/// primary issue to resolve — `Ok(None)`, not a blocker: the project may
/// simply not require one.
pub async fn primary_issue(
    issue_tracker: &dyn IssueTrackerAdapter,
    configured_project: &str,
    pr_title: &str,
    pr_body: Option<&str>,
) -> Result<Option<IssueRef>, IntegrationBlocker> {
    let (project, numeric_id) = match classify_title(pr_title) {
        TitleForm::Bare(id) => (configured_project.to_string(), id),
        TitleForm::Canonical(id, _) => (configured_project.to_string(), id),
        TitleForm::ProjectPrefixed(project, id) => {
            if project != configured_project {
                return Err(IntegrationBlocker::WrongProject {
                    expected: configured_project.to_string(),
                    found: format!("{project}-{id}"),
                });
            }
            (project, id)
        }
        TitleForm::Unrecognized => return Ok(None),
    };

    let qualified_id = format!("{project}-{numeric_id}");
    let issue = issue_tracker
        .get_issue(&qualified_id)
        .await
        .map_err(|_| IntegrationBlocker::FailedToRetrieve {
            id: qualified_id.clone(),
        })?;

    if let Some(body) = pr_body {
        if !body.contains(&issue.title) && !matches!(classify_title(pr_title), TitleForm::Bare(_)) {
            return Err(IntegrationBlocker::TitleMismatch {
                pr_title: pr_title.to_string(),
                issue_title: issue.title.clone(),
            });
        }
    }

    Ok(Some(IssueRef {
        project,
        numeric_id,
        canonical_title: issue.title.clone(),
        kind: to_kind(&issue),
        state: to_lifecycle(issue.state),
        properties: BTreeMap::new(),
    }))
}

/// Extracts the original `<id>: <title>` (or bare numeric id) header from
/// a backported commit's message, used to seed the Issue Linker for
/// `Backport <hash>` PRs.
pub fn extract_backport_title(commit_message: &str) -> Option<String> {
    let first_line = commit_message.lines().next()?.trim();
    match classify_title(first_line) {
        TitleForm::Canonical(id, title) => Some(format!("{id}: {title}")),
        TitleForm::Bare(id) => Some(id.to_string()),
        _ => None,
    }
}

/// Whether a `jep` label should be applied for the referenced JEP issue
///.
pub fn jep_label_applies(jep_status: &str, jep_lifecycle: IssueLifecycle) -> bool {
    let delivered_after_closed = jep_status.eq_ignore_ascii_case("delivered")
        && jep_lifecycle == IssueLifecycle::Closed;
    !(jep_status.eq_ignore_ascii_case("targeted") || delivered_after_closed)
}

/// Parses `/issue add <PROJECT-id>` commands and `### Issue(s)` body
/// sections into additional issue references. Resolution of
/// each id against the tracker is left to the caller so failures can be
/// surfaced per id.
pub fn discover_related_ids(body: &str) -> Vec<String> {
    let mut ids = Vec::new();
    for line in body.lines() {
        let trimmed = line.trim();
        if let Some(rest) = trimmed.strip_prefix("/issue add ") {
            ids.push(rest.trim().to_string());
        } else if let Some(rest) = trimmed.strip_prefix("- ") {
            if PROJECT_PREFIXED_ID_REGEX.is_match(rest) {
                if let Some(captures) = PROJECT_PREFIXED_ID_REGEX.captures(rest) {
                    ids.push(format!("{}-{}", &captures[1], &captures[2]));
                }
            }
        }
    }
    ids
}

fn split_qualified_id(id: &str) -> Option<(String, u64)> {
    let (project, numeric) = id.split_once('-')?;
    Some((project.to_string(), numeric.parse().ok()?))
}

/// Resolves every related-issue id discovered via [`discover_related_ids`]
/// or a dispatched `/issue add` command against the tracker, skipping the
/// primary issue's own qualified id. An id that fails to parse or resolve
/// is reported back rather than silently dropped — the caller surfaces it
/// as a warning finding, since only the *primary* issue can block
/// integration (spec §4.2).
pub async fn resolve_related_issues(
    issue_tracker: &dyn IssueTrackerAdapter,
    ids: &[String],
    primary_qualified_id: Option<&str>,
) -> (Vec<IssueRef>, Vec<String>) {
    let mut resolved = Vec::new();
    let mut failed = Vec::new();

    for id in ids {
        if Some(id.as_str()) == primary_qualified_id {
            continue;
        }
        let Some((project, numeric_id)) = split_qualified_id(id) else {
            failed.push(id.clone());
            continue;
        };
        match issue_tracker.get_issue(id).await {
            Ok(issue) => resolved.push(IssueRef {
                project,
                numeric_id,
                canonical_title: issue.title.clone(),
                kind: to_kind(&issue),
                state: to_lifecycle(issue.state),
                properties: BTreeMap::new(),
            }),
            Err(_) => failed.push(id.clone()),
        }
    }

    resolved.sort_by(|a, b| (a.project.as_str(), a.numeric_id).cmp(&(b.project.as_str(), b.numeric_id)));
    (resolved, failed)
}

/// A watched repository and PR number, the unit an issue is linked
/// against.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct PrKey {
    pub repo_owner: String,
    pub repo_name: String,
    pub pr_number: u64,
}

/// Whether an issue/PR link was just established or torn down.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkEvent {
    Linked,
    Unlinked,
}

/// One change published to [`IssuePrMap`]'s subscribers.
#[derive(Clone, Debug)]
pub struct IssuePrLinkChange {
    pub issue_id: String,
    pub pr: PrKey,
    pub event: LinkEvent,
}

/// The issue→PR map (spec §5, §9): a single writer per issue id records
/// which PRs currently reference it, and every change is published to a
/// broadcast queue so a multi-bot host sharing one map can react without
/// polling. A `CheckRun` links a PR to its primary and related issues each
/// tick; a separate consumer (e.g. the issue tracker side of the
/// reconciliation, out of scope for this crate) subscribes to learn when a
/// PR it cares about appears or disappears.
pub struct IssuePrMap {
    links: Mutex<HashMap<String, BTreeSet<PrKey>>>,
    changes: broadcast::Sender<IssuePrLinkChange>,
}

impl IssuePrMap {
    /// `capacity` bounds the broadcast queue; a subscriber that falls more
    /// than `capacity` events behind loses the oldest ones rather than
    /// blocking the writer.
    pub fn new(capacity: usize) -> Self {
        let (changes, _receiver) = broadcast::channel(capacity.max(1));
        Self {
            links: Mutex::new(HashMap::new()),
            changes,
        }
    }

    /// Subscribes to every future link/unlink event.
    pub fn subscribe(&self) -> broadcast::Receiver<IssuePrLinkChange> {
        self.changes.subscribe()
    }

    /// Records that `pr` references `issue_id`. A no-op, and no event
    /// published, if already recorded.
    pub fn link(&self, issue_id: &str, pr: PrKey) {
        let mut links = self.links.lock().unwrap();
        let prs = links.entry(issue_id.to_string()).or_default();
        if prs.insert(pr.clone()) {
            let _ = self.changes.send(IssuePrLinkChange {
                issue_id: issue_id.to_string(),
                pr,
                event: LinkEvent::Linked,
            });
        }
    }

    /// Removes the `pr` → `issue_id` link, if present.
    pub fn unlink(&self, issue_id: &str, pr: &PrKey) {
        let mut links = self.links.lock().unwrap();
        if let Some(prs) = links.get_mut(issue_id) {
            if prs.remove(pr) {
                let _ = self.changes.send(IssuePrLinkChange {
                    issue_id: issue_id.to_string(),
                    pr: pr.clone(),
                    event: LinkEvent::Unlinked,
                });
            }
        }
    }

    /// Replaces every link recorded for `pr` with exactly `issue_ids`,
    /// publishing an `Unlinked`/`Linked` event for each id that left or
    /// joined the set. Called once per `CheckRun` tick with the primary
    /// plus related issue ids so a PR's links never accumulate stale
    /// entries from an earlier tick.
    pub fn set_links_for_pr(&self, pr: PrKey, issue_ids: &[String]) {
        let wanted: BTreeSet<String> = issue_ids.iter().cloned().collect();
        let currently_linked: Vec<String> = {
            let links = self.links.lock().unwrap();
            links
                .iter()
                .filter(|(_, prs)| prs.contains(&pr))
                .map(|(issue_id, _)| issue_id.clone())
                .collect()
        };
        for issue_id in &currently_linked {
            if !wanted.contains(issue_id) {
                self.unlink(issue_id, &pr);
            }
        }
        for issue_id in &wanted {
            self.link(issue_id, pr.clone());
        }
    }

    /// Every PR currently linked to `issue_id`.
    pub fn prs_for(&self, issue_id: &str) -> Vec<PrKey> {
        self.links
            .lock()
            .unwrap()
            .get(issue_id)
            .map(|prs| prs.iter().cloned().collect())
            .unwrap_or_default()
    }
}
