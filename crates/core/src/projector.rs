//! State Projector.
//!
//! A pure function from every other component's output to the single
//! `DesiredState` tuple the Reconciler applies. Never consults prior runs:
//! the same inputs always produce the same labels, body, check status, and
//! outbound comments.

use std::collections::BTreeSet;

use jcheck_platforms::models::PullRequest;

use crate::check_executor::render_summary;
use crate::config::AUTO_SECTION_MARKER;
use crate::issue_linker::IntegrationBlocker;
use crate::mergeability::{BackportClassification, RebaseStatus};
use crate::models::{
    CheckStatus, CommentMarker, ConfigOrigin, DesiredState, Finding, IssueRef, JCheckConfig,
    OutboundComment, ReviewerRequirement, Severity, DEFAULT_CHECK_TITLE, LABEL_BACKPORT,
    LABEL_BLOCK, LABEL_CLEAN, LABEL_INTEGRATED, LABEL_JEP, LABEL_MERGE_CONFLICT, LABEL_READY,
    LABEL_RFR, LABEL_SPONSOR, MERGE_CONFLICT_MARKER, READY_MARKER,
};
use crate::review_evaluator::{active_counts_by_role, requirement_satisfied, self_review_blocks, EvaluatedReview};

#[cfg(test)]
#[path = "projector_tests.rs"]
mod tests;

/// What the Command Dispatcher contributes to a projection, beyond the
/// reviewer requirement (already folded into [`ReviewerRequirement`] before
/// this struct is built, spec §4.8's `/reviewers` rule).
#[derive(Clone, Debug, Default)]
pub struct CommandEffects {
    pub reply_comments: Vec<OutboundComment>,
    pub sponsor_requested: bool,
    pub mark_integrated: bool,
    pub approved: Option<bool>,
    /// Set when a `/csr` command was acknowledged against an
    /// `enableCsr`-configured project.
    pub csr_requested: bool,
    /// Set when a `/jep` command was acknowledged against an
    /// `enableJep`-configured project.
    pub jep_requested: bool,
}

/// Every input the State Projector's pure function reasons over (spec
/// §4.6's `(PR, Config, ReviewerReq, ActiveReviews, Findings, MergeStatus,
/// BackportInfo, Commands)` tuple, plus the Issue Linker output needed to
/// render the body's Issue/Integration-blocker sections).
pub struct ProjectorInput<'a> {
    pub pr: &'a PullRequest,
    pub config: &'a JCheckConfig,
    pub reviewer_requirement: &'a ReviewerRequirement,
    pub active_reviews: &'a [EvaluatedReview],
    pub findings: &'a [Finding],
    pub rebase_status: &'a RebaseStatus,
    pub backport_classification: &'a BackportClassification,
    pub primary_issue: Option<&'a IssueRef>,
    /// Issues discovered via `Fixes`/`Related`/`/issue add`, distinct from
    /// the primary issue that drives integration blocking (spec §4.2).
    pub related_issues: &'a [IssueRef],
    pub integration_blocker: Option<&'a IntegrationBlocker>,
    pub config_problem: Option<&'a str>,
    pub command_effects: &'a CommandEffects,
    pub check_summary_cap_bytes: usize,
}

fn blocking_findings(findings: &[Finding]) -> bool {
    findings
        .iter()
        .any(|f| f.origin == ConfigOrigin::TargetConf && f.severity == Severity::Error)
}

fn is_jep_satisfied(issue: &IssueRef) -> bool {
    use crate::issue_linker::jep_label_applies;
    use crate::models::IssueKind;
    if issue.kind != IssueKind::Jep {
        return false;
    }
    let status = issue.properties.get("status").map(|s| s.as_str()).unwrap_or("");
    jep_label_applies(status, issue.state)
}

/// Computes the desired labels.
fn derive_labels(input: &ProjectorInput<'_>, ready: bool, rfr: bool) -> BTreeSet<String> {
    let mut labels = BTreeSet::new();

    if rfr {
        labels.insert(LABEL_RFR.to_string());
    }
    if ready {
        labels.insert(LABEL_READY.to_string());
    }
    if matches!(input.rebase_status, RebaseStatus::Conflict { .. }) {
        labels.insert(LABEL_MERGE_CONFLICT.to_string());
    }
    match input.backport_classification {
        BackportClassification::Clean { .. } => {
            labels.insert(LABEL_CLEAN.to_string());
            labels.insert(LABEL_BACKPORT.to_string());
        }
        BackportClassification::Dirty { .. } => {
            labels.insert(LABEL_BACKPORT.to_string());
        }
        BackportClassification::MissingCommit { .. } | BackportClassification::ReferencedCommitIsAncestor { .. } => {
            labels.insert(LABEL_BACKPORT.to_string());
        }
        BackportClassification::NotABackportPr => {}
    }
    let jep_satisfied = input.primary_issue.is_some_and(is_jep_satisfied)
        || input.related_issues.iter().any(is_jep_satisfied);
    if jep_satisfied {
        labels.insert(LABEL_JEP.to_string());
    }
    // `/sponsor` and `/integrate` are intent signals, not unconditional
    // mutations: both require the change to already be ready for
    // integration (which subsumes reviewer-requirement satisfaction and
    // merge-conflict absence) and, when the project configures an
    // approval label, a recorded `/approve yes` verdict.
    let approval_required = input.config.approval.label.is_some();
    let approval_satisfied =
        !approval_required || input.command_effects.approved == Some(true);
    let integration_gate = ready && approval_satisfied;
    if integration_gate && input.command_effects.sponsor_requested {
        labels.insert(LABEL_SPONSOR.to_string());
    }
    if integration_gate && input.command_effects.mark_integrated {
        labels.insert(LABEL_INTEGRATED.to_string());
    }
    if input.integration_blocker.is_some() {
        labels.insert(LABEL_BLOCK.to_string());
    }
    if input.findings.iter().any(|f| f.kind == "blockedByLabel") {
        labels.insert(LABEL_BLOCK.to_string());
    }
    if input.command_effects.approved == Some(true) {
        if let Some(label) = &input.config.approval.label {
            labels.insert(label.clone());
        }
    }

    labels
}

fn render_progress(rfr: bool, ready: bool, is_conflict: bool, is_blocked: bool) -> String {
    let state = if is_conflict {
        "cannot be merged due to conflicts with the target branch"
    } else if is_blocked {
        "blocked from integration by a policy issue"
    } else if ready {
        "ready for integration"
    } else if rfr {
        "ready for review"
    } else {
        "not yet ready for review"
    };
    format!("### Progress\n\nThis change is {state}.\n")
}

fn issue_annotation(issue: &IssueRef) -> &'static str {
    use crate::models::IssueKind;
    match issue.kind {
        IssueKind::Csr => " (**CSR**)",
        IssueKind::Jep => " (**JEP**)",
        IssueKind::Bug | IssueKind::Backport => "",
    }
}

fn render_issue_row(issue: &IssueRef) -> String {
    format!(
        "- [{qid}]: {title}{annotation}\n",
        qid = issue.qualified_id(),
        title = issue.canonical_title,
        annotation = issue_annotation(issue)
    )
}

fn render_issue_section(primary: Option<&IssueRef>, related: &[IssueRef]) -> Option<String> {
    if primary.is_none() && related.is_empty() {
        return None;
    }
    let heading = if related.is_empty() { "### Issue" } else { "### Issues" };
    let mut section = format!("{heading}\n\n");
    if let Some(issue) = primary {
        section.push_str(&render_issue_row(issue));
    }
    for issue in related {
        section.push_str(&render_issue_row(issue));
    }
    Some(section)
}

fn render_reviewers_section(
    requirement: &ReviewerRequirement,
    counts: &std::collections::BTreeMap<crate::models::Role, u32>,
) -> String {
    let mut section = String::from("### Reviewers\n\n");
    if requirement.0.is_empty() {
        section.push_str("- no reviews required\n");
        return section;
    }
    for (role, minimum) in &requirement.0 {
        let have = counts.get(role).copied().unwrap_or(0);
        section.push_str(&format!("- {have}/{minimum} required {role:?} review(s)\n"));
    }
    section
}

fn render_integration_blockers(blocker: Option<&IntegrationBlocker>) -> Option<String> {
    blocker.map(|b| format!("### Integration blocker\n\n{}\n", b.message()))
}

fn render_warnings(findings: &[Finding]) -> Option<String> {
    let warnings: Vec<&Finding> = findings.iter().filter(|f| f.severity == Severity::Warning).collect();
    if warnings.is_empty() {
        return None;
    }
    let mut section = String::from("### Warnings\n\n");
    for finding in warnings {
        section.push_str(&format!("- {}\n", finding.message));
    }
    Some(section)
}

fn render_errors(findings: &[Finding], self_review_blocked: bool, config_problem: Option<&str>) -> Option<String> {
    let errors: Vec<&Finding> = findings.iter().filter(|f| f.severity == Severity::Error).collect();
    if errors.is_empty() && !self_review_blocked && config_problem.is_none() {
        return None;
    }
    let mut section = String::from("### Error\n\n");
    for finding in errors {
        section.push_str(&format!("- {}\n", finding.message));
    }
    if self_review_blocked {
        section.push_str("- The pull request author may not approve their own change.\n");
    }
    if let Some(problem) = config_problem {
        section.push_str(&format!("- {problem}\n"));
    }
    Some(section)
}

fn preamble(existing_body: Option<&str>) -> String {
    match existing_body {
        Some(body) => match body.split_once(AUTO_SECTION_MARKER) {
            Some((prose, _)) => prose.trim_end().to_string(),
            None => body.trim_end().to_string(),
        },
        None => String::new(),
    }
}

fn render_body(input: &ProjectorInput<'_>, rfr: bool, ready: bool, self_review_blocked: bool) -> String {
    let is_conflict = matches!(input.rebase_status, RebaseStatus::Conflict { .. });
    let is_blocked = input.integration_blocker.is_some();
    let counts = active_counts_by_role(input.active_reviews);

    let mut body = preamble(input.pr.body.as_deref());
    body.push_str("\n\n");
    body.push_str(AUTO_SECTION_MARKER);
    body.push_str("\n\n");
    body.push_str(&render_progress(rfr, ready, is_conflict, is_blocked));

    if let Some(section) = render_issue_section(input.primary_issue, input.related_issues) {
        body.push('\n');
        body.push_str(&section);
    }

    body.push('\n');
    body.push_str(&render_reviewers_section(input.reviewer_requirement, &counts));

    if let Some(section) = render_integration_blockers(input.integration_blocker) {
        body.push('\n');
        body.push_str(&section);
    }
    if let Some(section) = render_warnings(input.findings) {
        body.push('\n');
        body.push_str(&section);
    }
    if let Some(section) = render_errors(input.findings, self_review_blocked, input.config_problem) {
        body.push('\n');
        body.push_str(&section);
    }

    body
}

/// The one-shot congratulatory comment posted the first time this PR
/// becomes ready for review: a fixed
/// message plus any project-configured extras, each keyed so a later
/// merge-conflict/ready flip-flop never reposts them.
fn ready_comments(rfr: bool, extra: &[String]) -> Vec<OutboundComment> {
    if !rfr {
        return Vec::new();
    }
    let marker = CommentMarker::new(READY_MARKER);
    let mut comments = vec![OutboundComment {
        body: format!(
            "This change now passes all *automated* pre-integration checks.\n\n{}",
            marker.as_str()
        ),
        marker,
        one_shot: true,
    }];
    for (index, text) in extra.iter().enumerate() {
        let marker = CommentMarker::keyed(READY_MARKER, &index.to_string());
        comments.push(OutboundComment {
            body: format!("{text}\n\n{}", marker.as_str()),
            marker,
            one_shot: true,
        });
    }
    comments
}

fn merge_conflict_comment(rebase_status: &RebaseStatus) -> Option<OutboundComment> {
    match rebase_status {
        RebaseStatus::Conflict { conflicting_paths } => {
            let marker = CommentMarker::new(MERGE_CONFLICT_MARKER);
            Some(OutboundComment {
                body: format!(
                    "To resolve these merge conflicts, rebase onto the target branch. Conflicting paths: {}.\n\n{}",
                    conflicting_paths.join(", "),
                    marker.as_str()
                ),
                marker,
                one_shot: true,
            })
        }
        RebaseStatus::Clean => None,
    }
}

/// Computes the full [`DesiredState`] for one reconciliation tick (spec
/// §4.6).
pub fn project(input: &ProjectorInput<'_>) -> DesiredState {
    let self_review_blocked = self_review_blocks(input.active_reviews);
    let has_errors = blocking_findings(input.findings) || self_review_blocked;
    let is_conflict = matches!(input.rebase_status, RebaseStatus::Conflict { .. });
    let is_blocked = input.integration_blocker.is_some();

    let rfr = !input.pr.draft && !has_errors && !is_conflict && !is_blocked;
    let counts = active_counts_by_role(input.active_reviews);
    let reviewers_satisfied = requirement_satisfied(input.reviewer_requirement, &counts);
    let ready = rfr && reviewers_satisfied;

    let labels = derive_labels(input, ready, rfr);
    let body = render_body(input, rfr, ready, self_review_blocked);
    let check_status = if has_errors { CheckStatus::Failure } else { CheckStatus::Success };
    let check_summary = render_summary(input.findings, input.check_summary_cap_bytes);

    let mut outbound_comments = input.command_effects.reply_comments.clone();
    if let Some(comment) = merge_conflict_comment(input.rebase_status) {
        outbound_comments.push(comment);
    }
    outbound_comments.extend(ready_comments(rfr, &input.config.checks.ready_comments));

    DesiredState {
        labels,
        body,
        check_status,
        check_title: DEFAULT_CHECK_TITLE.to_string(),
        check_summary,
        outbound_comments,
    }
}
