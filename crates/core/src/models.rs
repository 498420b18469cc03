//! # Models
//!
//! The data model a `CheckRun` computes over. These types are
//! derived from forge/issue-tracker/VCS observations by the component
//! modules; the engine itself never persists them between ticks — every
//! run starts from a fresh snapshot passed in by the caller.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "models_tests.rs"]
mod tests;

/// The kind of issue an [`IssueRef`] points at.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum IssueKind {
    Bug,
    Csr,
    Jep,
    Backport,
}

/// The lifecycle state of a referenced issue, as understood by the Issue
/// Linker independent of the issue tracker's own vocabulary.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum IssueLifecycle {
    Open,
    InProgress,
    Resolved,
    Closed,
}

/// A reference to an issue discovered from the PR title, body, or a
/// `/issue` command.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct IssueRef {
    pub project: String,
    pub numeric_id: u64,
    pub canonical_title: String,
    pub kind: IssueKind,
    pub state: IssueLifecycle,
    pub properties: BTreeMap<String, String>,
}

impl IssueRef {
    /// The `<project>-<id>` form used in issue-tracker lookups.
    pub fn qualified_id(&self) -> String {
        format!("{}-{}", self.project, self.numeric_id)
    }
}

/// A contributor role, ordered weakest to strongest, mirroring
/// `jcheck_platforms::CensusRole` but scoped to what the reviewer
/// requirement vector reasons about.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Role {
    Contributor,
    Author,
    Committer,
    Reviewer,
    Lead,
}

impl From<jcheck_platforms::CensusRole> for Role {
    fn from(role: jcheck_platforms::CensusRole) -> Self {
        match role {
            jcheck_platforms::CensusRole::Contributor => Role::Contributor,
            jcheck_platforms::CensusRole::Author => Role::Author,
            jcheck_platforms::CensusRole::Committer => Role::Committer,
            jcheck_platforms::CensusRole::Reviewer => Role::Reviewer,
            jcheck_platforms::CensusRole::Lead => Role::Lead,
        }
    }
}

/// `role → minimum count`, computed as `max(configVector, commandVector)`
/// element-wise. Roles absent from the map carry
/// an implicit requirement of zero.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ReviewerRequirement(pub BTreeMap<Role, u32>);

impl ReviewerRequirement {
    pub fn get(&self, role: Role) -> u32 {
        self.0.get(&role).copied().unwrap_or(0)
    }

    /// Element-wise maximum of two requirement vectors.
    pub fn merged_with(&self, other: &ReviewerRequirement) -> ReviewerRequirement {
        let mut merged = self.0.clone();
        for (role, count) in &other.0 {
            let entry = merged.entry(*role).or_insert(0);
            if *count > *entry {
                *entry = *count;
            }
        }
        ReviewerRequirement(merged)
    }
}

/// The `.jcheck/conf` blob resolved by the Configuration Resolver (spec
/// §3, §4.1, §6 "Configuration knobs").
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct JCheckConfig {
    pub general: GeneralSection,
    pub checks: CheckSection,
    pub census: CensusSection,
    pub repository: RepositorySection,
    #[serde(default)]
    pub approval: ApprovalSection,
}

/// The `/approve` command's wording and label.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct ApprovalSection {
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub request_suffix: Option<String>,
    #[serde(default)]
    pub approved_suffix: Option<String>,
    #[serde(default)]
    pub rejected_suffix: Option<String>,
    #[serde(default)]
    pub documentation_url: Option<String>,
    #[serde(default)]
    pub generated_approval: bool,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct GeneralSection {
    pub project: String,
    #[serde(default)]
    pub jbs: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct CheckSection {
    #[serde(default)]
    pub enable_csr: bool,
    #[serde(default)]
    pub enable_jep: bool,
    #[serde(default)]
    pub enable_merge: bool,
    #[serde(default)]
    pub enable_backport: bool,
    #[serde(default)]
    pub use_stale_reviews: bool,
    #[serde(default)]
    pub accept_simple_merges: bool,
    #[serde(default)]
    pub allowed_target_branches: Vec<String>,
    #[serde(default)]
    pub ready_labels: Vec<String>,
    #[serde(default)]
    pub ready_comments: Vec<String>,
    #[serde(default)]
    pub blocking_check_labels: Vec<String>,
    #[serde(default)]
    pub version_mismatch_warning: bool,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct CensusSection {
    pub census_repo: String,
    #[serde(default)]
    pub census_link: Option<String>,
    pub issue_project: String,
    #[serde(default)]
    pub issue_pr_map: Option<String>,
    #[serde(default)]
    pub integrators: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct RepositorySection {
    #[serde(default)]
    pub reviewers: BTreeMap<Role, u32>,
    #[serde(default)]
    pub ignore: Vec<String>,
    #[serde(default)]
    pub conf_override_repo: Option<String>,
    #[serde(default)]
    pub conf_override_name: Option<String>,
    #[serde(default)]
    pub conf_override_ref: Option<String>,
    #[serde(default)]
    pub tag_pattern: Option<String>,
}

impl JCheckConfig {
    pub fn reviewer_requirement(&self) -> ReviewerRequirement {
        ReviewerRequirement(self.repository.reviewers.clone())
    }
}

/// Which configuration a [`Finding`] or check pass originated from (spec
/// §3, §4.4).
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum ConfigOrigin {
    TargetConf,
    SourceConf,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// A single problem surfaced by the Check Executor — the sole bridge
/// between check execution and the State Projector.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Finding {
    pub severity: Severity,
    pub kind: String,
    pub message: String,
    pub origin: ConfigOrigin,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum Verdict {
    Approved,
    Disapproved,
    Comment,
}

/// A forge review mapped onto a census role and a verdict. The
/// Review Evaluator decides `active` vs `stale`; this type only carries
/// what was cast.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ReviewVerdict {
    pub user_id: u64,
    pub verdict: Verdict,
    /// The PR head hash the verdict was cast against.
    pub hash: String,
    pub target_ref: String,
    pub timestamp_epoch_ms: i64,
    pub role: Role,
}

/// The finite lifecycle states of spec §3. Transitions are derived purely
/// from reconciliation inputs; the projector never consults prior states
///.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum PrState {
    Draft,
    NotReady,
    Rfr,
    Ready,
    MergeConflict,
    Blocked,
    Integrating,
    Sponsor,
    Integrated,
}

/// A hidden marker line embedded in bot-authored comments/body sections,
/// used by the Reconciler to locate and update its own output
/// idempotently.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CommentMarker(pub String);

impl CommentMarker {
    pub fn new(kind: &str) -> Self {
        CommentMarker(format!("<!-- {kind} -->"))
    }

    pub fn keyed(kind: &str, key: &str) -> Self {
        CommentMarker(format!("<!-- {kind}:{key} -->"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub const FORCE_PUSH_MARKER: &str = "force-push marker";
pub const MERGE_CONFLICT_MARKER: &str = "merge-conflict";
pub const CONFIG_INVALID_MARKER: &str = "config-invalid";
pub const BACKPORT_ERROR_MARKER: &str = "backport error";
pub const WEBREV_MARKER: &str = "webrev";
pub const APPROVAL_MARKER: &str = "approval";
/// Posted once the change first becomes ready for review; one-shot so it survives a later
/// merge-conflict/ready flip-flop without duplicating.
pub const READY_MARKER: &str = "ready";

/// One queued reply the Reconciler must ensure exists, keyed by marker so
/// repeated runs converge rather than append.
#[derive(Clone, Debug)]
pub struct OutboundComment {
    pub marker: CommentMarker,
    pub body: String,
    /// One-shot comments are posted only while their
    /// precondition holds and are never re-posted once dismissed.
    pub one_shot: bool,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum CheckStatus {
    InProgress,
    Success,
    Failure,
    Cancelled,
}

impl From<CheckStatus> for jcheck_platforms::models::CheckStatus {
    fn from(status: CheckStatus) -> Self {
        match status {
            CheckStatus::InProgress => jcheck_platforms::models::CheckStatus::InProgress,
            CheckStatus::Success => jcheck_platforms::models::CheckStatus::Success,
            CheckStatus::Failure => jcheck_platforms::models::CheckStatus::Failure,
            CheckStatus::Cancelled => jcheck_platforms::models::CheckStatus::Cancelled,
        }
    }
}

/// The status check's title under ordinary operation.
pub const DEFAULT_CHECK_TITLE: &str = "jcheck";

/// The output of the State Projector's pure function:
/// `(PR, Config, ReviewerReq, ActiveReviews, Findings, MergeStatus,
/// BackportInfo, Commands) → DesiredState`.
#[derive(Clone, Debug)]
pub struct DesiredState {
    pub labels: std::collections::BTreeSet<String>,
    pub body: String,
    pub check_status: CheckStatus,
    /// The status check's title. Ordinarily [`DEFAULT_CHECK_TITLE`];
    /// replaced with an exception title when a recoverable adapter fault
    /// interrupted the tick, so the forge-visible check names the stage
    /// that failed rather than reporting stale findings.
    pub check_title: String,
    pub check_summary: String,
    pub outbound_comments: Vec<OutboundComment>,
}

/// Reserved label vocabulary.
pub const LABEL_RFR: &str = "rfr";
pub const LABEL_READY: &str = "ready";
pub const LABEL_MERGE_CONFLICT: &str = "merge-conflict";
pub const LABEL_CLEAN: &str = "clean";
pub const LABEL_BACKPORT: &str = "backport";
pub const LABEL_JEP: &str = "jep";
pub const LABEL_SPONSOR: &str = "sponsor";
pub const LABEL_INTEGRATED: &str = "integrated";
pub const LABEL_BLOCK: &str = "block";

/// The opaque fingerprint the Check Executor uses to skip redundant runs
///. Two fingerprints are equal iff a rerun would produce
/// identical findings.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub struct CheckFingerprint {
    pub target_head: String,
    pub source_head: String,
    pub config_hash: u64,
    pub body_hash: u64,
    pub command_generation: u64,
}

impl CheckFingerprint {
    pub fn encode(&self) -> String {
        format!(
            "{}:{}:{:x}:{:x}:{}",
            self.target_head, self.source_head, self.config_hash, self.body_hash, self.command_generation
        )
    }
}
