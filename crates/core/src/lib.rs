#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

//! # jcheck core
//!
//! The per-PR reconciliation engine described in spec §2 — the *CheckRun*.
//! Given a snapshot of a pull request and its collaborators (a forge, an
//! issue tracker, a version-control system, a contributor census, and a
//! jcheck engine), [`CheckRun::run_once`] computes the desired (labels,
//! body, status check, reply comments) tuple and reconciles it against
//! forge state in a single idempotent pass.
//!
//! ## Example
//!
//! ```rust,no_run
//! use jcheck_core::CheckRun;
//! use jcheck_platforms::fakes::{FakeCensus, FakeForge, FakeIssueTracker, FakeJCheckEngine, FakeVcs};
//! use jcheck_platforms::CensusRole;
//!
//! # async fn example() -> Result<(), jcheck_core::errors::CheckRunError> {
//! let check_run = CheckRun::new(
//!     FakeForge::new(),
//!     FakeIssueTracker::new(),
//!     FakeVcs::new(),
//!     FakeCensus::new(CensusRole::Contributor),
//!     FakeJCheckEngine::new(),
//! );
//!
//! let report = check_run.run_once("acme", "widgets", 42, 0).await?;
//! println!("check status: {:?}", report.desired.check_status);
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;

use jcheck_platforms::models::PullRequest;
use jcheck_platforms::{CensusStore, ForgeAdapter, IssueTrackerAdapter, JCheckEngine, VCSAdapter};
use tracing::warn;

pub mod check_executor;
pub mod commands;
pub mod config;
pub mod config_resolver;

/// Error types for a single `CheckRun` tick.
pub mod errors;
pub mod issue_linker;
pub mod mergeability;
pub mod models;
pub mod projector;
pub mod reconciler;
pub mod review_evaluator;

use check_executor::{FingerprintCache, PassFailure};
use config_resolver::{ConfigOverride, Resolution};
use errors::CheckRunError;
use mergeability::{BackportClassification, RebaseStatus};
use models::{
    CheckStatus, CommentMarker, ConfigOrigin, DesiredState, Finding, Role, Severity,
    CONFIG_INVALID_MARKER, DEFAULT_CHECK_TITLE,
};
use projector::{CommandEffects, ProjectorInput};
use reconciler::ReconcileActions;

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

/// What one `run_once` tick actually observed and did, for logging and
/// tests. The authoritative output is [`DesiredState`]; this also carries
/// the fingerprint used for the Check Executor's cache and
/// whether the tick was skipped as a cache hit.
#[derive(Debug, Clone)]
pub struct ReconcileReport {
    /// The pull request this tick reconciled.
    pub pr_number: u64,
    /// The computed desired state.
    pub desired: DesiredState,
    /// The mutations the Reconciler actually applied.
    pub actions: ReconcileActions,
    /// The fingerprint stored for this tick.
    pub fingerprint: models::CheckFingerprint,
    /// Whether `findings`/body/labels were recomputed, or skipped because
    /// the fingerprint matched the previous tick.
    pub cache_hit: bool,
}

/// The per-PR reconciliation engine, generic over
/// the five external collaborators it never owns an implementation of
///. A `CheckRun` is a synchronous (single work item at a time)
/// function from "snapshot of inputs" to "mutations" — it holds
/// no PR state between ticks beyond the jcheck result cache, which exists
/// precisely to make repeated, unchanged ticks cheap.
pub struct CheckRun<F, I, V, C, J>
where
    F: ForgeAdapter,
    I: IssueTrackerAdapter,
    V: VCSAdapter,
    C: CensusStore,
    J: JCheckEngine,
{
    forge: F,
    issue_tracker: I,
    vcs: V,
    census: C,
    jcheck_engine: J,
    /// The bot/repository-level configuration override. This is deliberately *not* read from
    /// the `.jcheck/conf` blob the Configuration Resolver produces —
    /// resolving it from there would make the resolver depend on its own
    /// output (see DESIGN.md, Open Questions).
    override_location: Option<ConfigOverride>,
    fingerprint_cache: FingerprintCache,
    /// The shared issue→PR map, when this `CheckRun` is configured to
    /// publish its links (see [`Self::with_issue_pr_map`]). `None` by
    /// default: maintaining it costs a lock per tick that a single-bot
    /// deployment with no external subscriber has no use for.
    issue_pr_map: Option<std::sync::Arc<issue_linker::IssuePrMap>>,
}

/// A Check Executor fault, tagged with the forge-read or jcheck-engine
/// stage that produced it (spec §5/§7's recoverable-fault taxonomy).
#[derive(Debug)]
enum RunChecksFailure {
    ForgeRead(CheckRunError),
    TargetJCheck(CheckRunError),
    SourceJCheck(CheckRunError),
}

/// Default capacity of the jcheck result cache.
const DEFAULT_FINGERPRINT_CACHE_CAPACITY: usize = 4096;

/// Default cap on a forge status check's summary text.
const DEFAULT_CHECK_SUMMARY_CAP_BYTES: usize = config::DEFAULT_CHECK_SUMMARY_CAP_BYTES;

/// Path of the jcheck configuration blob inside a repository.
const JCHECK_CONFIG_PATH: &str = ".jcheck/conf";

impl<F, I, V, C, J> CheckRun<F, I, V, C, J>
where
    F: ForgeAdapter,
    I: IssueTrackerAdapter,
    V: VCSAdapter,
    C: CensusStore,
    J: JCheckEngine,
{
    /// Builds a `CheckRun` with no configuration override: the
    /// Configuration Resolver always uses the PR's target branch
    /// `.jcheck/conf`.
    pub fn new(forge: F, issue_tracker: I, vcs: V, census: C, jcheck_engine: J) -> Self {
        Self {
            forge,
            issue_tracker,
            vcs,
            census,
            jcheck_engine,
            override_location: None,
            fingerprint_cache: FingerprintCache::new(DEFAULT_FINGERPRINT_CACHE_CAPACITY),
            issue_pr_map: None,
        }
    }

    /// Builds a `CheckRun` whose Configuration Resolver treats `override_location`
    /// as authoritative over every watched repository.
    pub fn with_override(
        forge: F,
        issue_tracker: I,
        vcs: V,
        census: C,
        jcheck_engine: J,
        override_location: ConfigOverride,
    ) -> Self {
        let mut check_run = Self::new(forge, issue_tracker, vcs, census, jcheck_engine);
        check_run.override_location = Some(override_location);
        check_run
    }

    /// Shares `issue_pr_map` across every tick this `CheckRun` performs —
    /// each tick replaces the PR's recorded links with the issue ids it
    /// resolved this run, so a multi-bot host can subscribe to
    /// [`issue_linker::IssuePrMap::subscribe`] rather than re-deriving
    /// links itself.
    pub fn with_issue_pr_map(mut self, issue_pr_map: std::sync::Arc<issue_linker::IssuePrMap>) -> Self {
        self.issue_pr_map = Some(issue_pr_map);
        self
    }

    /// Forces the next tick for `pr_number` to recompute regardless of
    /// fingerprint equality — the effect of a `/touch` or `/keepalive`
    /// command.
    pub fn invalidate_cache(&self, pr_number: u64) {
        self.fingerprint_cache.invalidate(pr_number);
    }

    /// Schedules a future time at which the cache will stop honoring the
    /// currently stored fingerprint for `pr_number`.
    pub fn schedule_recheck_at(&self, pr_number: u64, at_epoch_ms: i64) {
        self.fingerprint_cache.schedule_recheck_at(pr_number, at_epoch_ms);
    }

    /// The forge adapter this `CheckRun` was built with. Exposed so a test
    /// or CLI driver can seed/observe forge state between ticks without the
    /// engine needing to hand out a second owned handle to it.
    pub fn forge(&self) -> &F {
        &self.forge
    }

    /// The issue-tracker adapter this `CheckRun` was built with.
    pub fn issue_tracker(&self) -> &I {
        &self.issue_tracker
    }

    /// The VCS adapter this `CheckRun` was built with.
    pub fn vcs(&self) -> &V {
        &self.vcs
    }

    /// The census store this `CheckRun` was built with.
    pub fn census(&self) -> &C {
        &self.census
    }

    /// The jcheck engine this `CheckRun` was built with.
    pub fn jcheck_engine(&self) -> &J {
        &self.jcheck_engine
    }

    /// Runs one full reconciliation pass over `(repo_owner, repo_name,
    /// pr_number)`: Configuration Resolver → Issue
    /// Linker & Check Executor & Mergeability Prober → Review Evaluator →
    /// State Projector ← Command Dispatcher → Reconciler.
    ///
    /// Recoverable failures are folded into the returned
    /// [`DesiredState`] rather than propagated; only adapter errors that
    /// the calling adapter itself classifies as unrecoverable reach the
    /// `Err` branch, so the host scheduler can retry the whole work item
    ///.
    pub async fn run_once(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
        now_epoch_ms: i64,
    ) -> Result<ReconcileReport, CheckRunError> {
        let pr = self
            .forge
            .get_pull_request(repo_owner, repo_name, pr_number)
            .await?;

        let resolution = config_resolver::resolve_for(
            &self.forge,
            repo_owner,
            repo_name,
            &pr,
            self.override_location.as_ref(),
        )
        .await?;

        let (desired, fingerprint) = match resolution {
            Resolution::Ok { config, source: _ } => {
                self.run_with_config(repo_owner, repo_name, &pr, &config, now_epoch_ms)
                    .await?
            }
            Resolution::Missing(_) => {
                let desired = config_problem_state(
                    "No `.jcheck/conf` was found for this repository.",
                    CheckStatus::Failure,
                );
                let fingerprint = check_executor::compute_fingerprint(
                    &pr.head_sha,
                    &pr.head_sha,
                    "missing",
                    pr.body.as_deref(),
                    0,
                );
                (desired, fingerprint)
            }
            Resolution::Invalid(_, diagnostic) => {
                let desired = config_problem_state(
                    &format!("The jcheck configuration is invalid: {diagnostic}"),
                    CheckStatus::Failure,
                );
                let fingerprint = check_executor::compute_fingerprint(
                    &pr.head_sha,
                    &pr.head_sha,
                    &diagnostic,
                    pr.body.as_deref(),
                    0,
                );
                (desired, fingerprint)
            }
        };

        let cache_hit = self
            .fingerprint_cache
            .is_cache_hit(pr_number, &fingerprint, now_epoch_ms);
        if cache_hit {
            return Ok(ReconcileReport {
                pr_number,
                desired,
                actions: ReconcileActions::default(),
                fingerprint,
                cache_hit: true,
            });
        }
        self.fingerprint_cache.store(pr_number, fingerprint.clone());

        let check_metadata = fingerprint.encode();
        let actions = reconciler::reconcile(
            &self.forge,
            repo_owner,
            repo_name,
            &pr,
            &desired,
            &check_metadata,
        )
        .await?;

        Ok(ReconcileReport {
            pr_number,
            desired,
            actions,
            fingerprint,
            cache_hit: false,
        })
    }

    /// The body of [`Self::run_once`] once a [`models::JCheckConfig`] has
    /// been resolved: runs every remaining component and projects the
    /// [`DesiredState`].
    async fn run_with_config(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr: &PullRequest,
        config: &models::JCheckConfig,
        now_epoch_ms: i64,
    ) -> Result<(DesiredState, models::CheckFingerprint), CheckRunError> {
        let dispatched = commands::collect_commands(pr);
        for dispatched_command in &dispatched {
            if matches!(
                dispatched_command.command,
                commands::Command::Touch | commands::Command::Keepalive
            ) {
                self.fingerprint_cache.invalidate(pr.number);
            }
        }

        let mut issuer_roles: HashMap<u64, Role> = HashMap::new();
        for dispatched_command in &dispatched {
            let issuer = &dispatched_command.issuer;
            if issuer_roles.contains_key(&issuer.id) {
                continue;
            }
            let role: Role = match self
                .census
                .role_of(&config.general.project, issuer, now_epoch_ms)
                .await
            {
                Ok(role) => role.into(),
                Err(err) => {
                    return self.fold_recoverable("census lookup", err.into(), now_epoch_ms)
                }
            };
            issuer_roles.insert(issuer.id, role);
        }

        let (reviewer_requirement, mut reply_comments) = commands::apply_reviewer_commands(
            &config.reviewer_requirement(),
            &dispatched,
            &issuer_roles,
        );

        if let Err(err) = self
            .apply_tag_commands(repo_owner, repo_name, pr, config, &dispatched, &mut reply_comments)
            .await
        {
            return self.fold_recoverable("tag command", err, now_epoch_ms);
        }

        let command_effects =
            self.fold_command_effects(config, &dispatched, &issuer_roles, &mut reply_comments);

        let target_head = match self
            .vcs
            .resolve_ref(repo_owner, repo_name, &pr.base_ref)
            .await
        {
            Ok(head) => head,
            Err(err) => return self.fold_recoverable("target ref resolution", err.into(), now_epoch_ms),
        };

        let rebase_status = match mergeability::probe_rebase(
            &self.vcs,
            repo_owner,
            repo_name,
            &pr.head_sha,
            &target_head.hash,
        )
        .await
        {
            Ok(status) => status,
            Err(err) => return self.fold_recoverable("mergeability probe", err, now_epoch_ms),
        };

        let _merge_classification =
            mergeability::classify_merge_title(&pr.title, config.checks.enable_merge);

        let backport_classification = if config.checks.enable_backport {
            match mergeability::classify_backport_title(
                &self.vcs,
                repo_owner,
                repo_name,
                &pr.title,
                &pr.head_sha,
                true,
            )
            .await
            {
                Ok(classification) => classification,
                Err(err) => return self.fold_recoverable("backport classification", err, now_epoch_ms),
            }
        } else {
            BackportClassification::NotABackportPr
        };

        // A `Backport <hash>` title carries no issue id of its own (spec
        // §4.5: "Extract the original issue ids from the referenced commit
        // message to seed the Issue Linker"); substitute the commit's own
        // `<id>: <title>` header so the Issue Linker resolves the same
        // primary issue the original change did.
        let title_for_issue_linking = match &backport_classification {
            BackportClassification::Clean { original_title: Some(title), .. }
            | BackportClassification::Dirty { original_title: Some(title), .. } => title.clone(),
            _ => pr.title.clone(),
        };

        let (primary_issue, integration_blocker) = match issue_linker::primary_issue(
            &self.issue_tracker,
            &config.general.project,
            &title_for_issue_linking,
            pr.body.as_deref(),
        )
        .await
        {
            Ok(issue) => (issue, None),
            Err(blocker) => (None, Some(blocker)),
        };

        if let Some(issue) = &primary_issue {
            let canonical_title =
                issue_linker::canonicalize_title(&title_for_issue_linking, &issue.canonical_title, issue.numeric_id);
            if canonical_title != pr.title {
                self.forge
                    .set_title(repo_owner, repo_name, pr.number, &canonical_title)
                    .await?;
            }
        }

        let mut related_ids: Vec<String> = pr
            .body
            .as_deref()
            .map(issue_linker::discover_related_ids)
            .unwrap_or_default();
        for dispatched_command in &dispatched {
            if let commands::Command::IssueAdd { id } = &dispatched_command.command {
                related_ids.push(id.clone());
            }
        }
        related_ids.sort();
        related_ids.dedup();

        let primary_qualified_id = primary_issue.as_ref().map(|issue| issue.qualified_id());
        let (related_issues, unresolved_related_ids) = issue_linker::resolve_related_issues(
            &self.issue_tracker,
            &related_ids,
            primary_qualified_id.as_deref(),
        )
        .await;

        if let Some(issue_pr_map) = &self.issue_pr_map {
            let mut linked_ids: Vec<String> =
                related_issues.iter().map(|issue| issue.qualified_id()).collect();
            linked_ids.extend(primary_qualified_id.clone());
            issue_pr_map.set_links_for_pr(
                issue_linker::PrKey {
                    repo_owner: repo_owner.to_string(),
                    repo_name: repo_name.to_string(),
                    pr_number: pr.number,
                },
                &linked_ids,
            );
        }

        let active_reviews = match self.evaluate_reviews(repo_owner, repo_name, config, pr).await {
            Ok(reviews) => reviews,
            Err(err) => return self.fold_recoverable("review evaluation", err, now_epoch_ms),
        };

        let mut findings = match self
            .run_checks(repo_owner, repo_name, pr, config, &target_head.hash)
            .await
        {
            Ok(findings) => findings,
            Err(RunChecksFailure::ForgeRead(err)) => {
                return self.fold_recoverable("pull request file listing", err, now_epoch_ms)
            }
            Err(RunChecksFailure::TargetJCheck(err)) => {
                return self.fold_recoverable("target jcheck", err, now_epoch_ms)
            }
            Err(RunChecksFailure::SourceJCheck(err)) => {
                return self.fold_recoverable("source jcheck", err, now_epoch_ms)
            }
        };
        for unresolved_id in &unresolved_related_ids {
            findings.push(Finding {
                severity: Severity::Warning,
                kind: "relatedIssueUnresolved".to_string(),
                message: format!("Related issue `{unresolved_id}` could not be resolved."),
                origin: ConfigOrigin::TargetConf,
            });
        }

        let check_summary_cap_bytes = DEFAULT_CHECK_SUMMARY_CAP_BYTES;
        let config_text = toml::to_string(config).unwrap_or_default();

        let input = ProjectorInput {
            pr,
            config,
            reviewer_requirement: &reviewer_requirement,
            active_reviews: &active_reviews,
            findings: &findings,
            rebase_status: &rebase_status,
            backport_classification: &backport_classification,
            primary_issue: primary_issue.as_ref(),
            related_issues: &related_issues,
            integration_blocker: integration_blocker.as_ref(),
            config_problem: None,
            command_effects: &command_effects,
            check_summary_cap_bytes,
        };

        let desired = projector::project(&input);

        let command_generation = dispatched.len() as u64;
        let fingerprint = check_executor::compute_fingerprint(
            &target_head.hash,
            &pr.head_sha,
            &config_text,
            pr.body.as_deref(),
            command_generation,
        );

        Ok((desired, fingerprint))
    }

    /// Runs the Review Evaluator, pre-computing the
    /// `acceptSimpleMerges` predicate for every distinct review commit so
    /// the evaluator itself can stay a synchronous function of its inputs.
    async fn evaluate_reviews(
        &self,
        repo_owner: &str,
        repo_name: &str,
        config: &models::JCheckConfig,
        pr: &PullRequest,
    ) -> Result<Vec<review_evaluator::EvaluatedReview>, CheckRunError> {
        let mut simple_merge_cache: HashMap<String, bool> = HashMap::new();
        if config.checks.accept_simple_merges {
            for review in &pr.reviews {
                if review.commit_sha == pr.head_sha {
                    continue;
                }
                if simple_merge_cache.contains_key(&review.commit_sha) {
                    continue;
                }
                let is_simple = self
                    .vcs
                    .is_simple_merge_of_target(
                        repo_owner,
                        repo_name,
                        &review.commit_sha,
                        &pr.head_sha,
                        &pr.base_ref,
                    )
                    .await?;
                simple_merge_cache.insert(review.commit_sha.clone(), is_simple);
            }
        }

        let probe = move |commit_sha: &str, _head: &str| -> bool {
            simple_merge_cache.get(commit_sha).copied().unwrap_or(false)
        };

        Ok(review_evaluator::evaluate(
            &self.census,
            &config.general.project,
            pr,
            config.checks.accept_simple_merges,
            &probe,
        )
        .await?)
    }

    /// Runs the Check Executor: the special-case errors that
    /// bypass configured checks, then the target pass and, when the PR's
    /// diff touches `.jcheck/conf`, the advisory source pass.
    async fn run_checks(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr: &PullRequest,
        config: &models::JCheckConfig,
        target_head: &str,
    ) -> Result<Vec<Finding>, RunChecksFailure> {
        let mut findings = Vec::new();
        if let Some(finding) = check_executor::check_empty_body(pr.body.as_deref()) {
            findings.push(finding);
        }

        let files = self
            .forge
            .list_files(repo_owner, repo_name, pr.number)
            .await
            .map_err(|e| RunChecksFailure::ForgeRead(e.into()))?;
        let changed_paths: Vec<String> = files.iter().map(|f| f.filename.clone()).collect();
        if let Some(finding) = check_executor::check_no_changes(&changed_paths) {
            findings.push(finding);
        }
        // The target branch's own changes since the merge base are not
        // exposed by the `VCSAdapter` contract; this check can only fire
        // when they are supplied out of band (see DESIGN.md).
        if let Some(finding) =
            check_executor::check_changes_subset_of_target(&changed_paths, &[])
        {
            findings.push(finding);
        }
        if let Some(finding) =
            check_executor::check_blocked_labels(&pr.label_names(), &config.checks.blocking_check_labels)
        {
            findings.push(finding);
        }

        let target_config_blob = toml::to_string(config).unwrap_or_default();
        let touches_jcheck_conf = changed_paths.iter().any(|p| p == JCHECK_CONFIG_PATH);
        let source_config_blob = if touches_jcheck_conf {
            self.forge
                .fetch_file(repo_owner, repo_name, &pr.head_sha, JCHECK_CONFIG_PATH)
                .await
                .map_err(|e| RunChecksFailure::ForgeRead(e.into()))?
        } else {
            None
        };

        let checked = check_executor::run_checks(
            &self.jcheck_engine,
            repo_owner,
            repo_name,
            target_head,
            &pr.head_sha,
            &target_config_blob,
            source_config_blob.as_deref(),
        )
        .await
        .map_err(|failure| match failure {
            PassFailure::Target(e) => RunChecksFailure::TargetJCheck(e),
            PassFailure::Source(e) => RunChecksFailure::SourceJCheck(e),
        })?;
        findings.extend(checked);

        Ok(findings)
    }

    /// Folds a recoverable adapter fault from `stage` into a failing
    /// exception check rather than propagating it: the work item is left
    /// in a state that will be retried next tick instead of aborting the
    /// whole run. Faults an adapter itself classifies as unrecoverable
    /// (see [`CheckRunError::is_recoverable`]) still propagate.
    fn fold_recoverable(
        &self,
        stage: &str,
        error: CheckRunError,
        now_epoch_ms: i64,
    ) -> Result<(DesiredState, models::CheckFingerprint), CheckRunError> {
        if !error.is_recoverable() {
            return Err(error);
        }
        warn!(stage, error = %error, "recoverable adapter fault; deferring to next tick");
        Ok(exception_state(stage, now_epoch_ms))
    }

    /// Folds every non-`/reviewers` command into [`CommandEffects`] (spec
    /// §4.8): `/approve` against the configured integrator list, `/sponsor`
    /// and `/integrate` as intent signals the projector turns into labels,
    /// and denial replies for commands an issuer was not authorized to run.
    fn fold_command_effects(
        &self,
        config: &models::JCheckConfig,
        dispatched: &[commands::DispatchedCommand],
        issuer_roles: &HashMap<u64, Role>,
        reply_comments: &mut Vec<models::OutboundComment>,
    ) -> CommandEffects {
        let mut effects = CommandEffects {
            reply_comments: Vec::new(),
            sponsor_requested: false,
            mark_integrated: false,
            approved: None,
            csr_requested: false,
            jep_requested: false,
        };

        for dispatched_command in dispatched {
            match &dispatched_command.command {
                commands::Command::Approve { verdict, .. } => {
                    if commands::is_integrator(&dispatched_command.issuer, &config.census.integrators)
                    {
                        effects.approved = Some(*verdict);
                    } else {
                        let marker = CommentMarker::keyed(
                            "approval-command",
                            &dispatched_command.generation.to_string(),
                        );
                        reply_comments.push(models::OutboundComment {
                            body: format!(
                                "Only configured integrators may record an approval verdict.\n\n{}",
                                marker.as_str()
                            ),
                            marker,
                            one_shot: false,
                        });
                    }
                }
                commands::Command::Sponsor => {
                    let issuer_role = issuer_roles
                        .get(&dispatched_command.issuer.id)
                        .copied()
                        .unwrap_or(Role::Contributor);
                    if issuer_role < Role::Committer {
                        effects.sponsor_requested = true;
                    }
                }
                commands::Command::Integrate => {
                    if commands::is_integrator(&dispatched_command.issuer, &config.census.integrators)
                    {
                        effects.mark_integrated = true;
                    } else {
                        let marker = CommentMarker::keyed(
                            "integrate-command",
                            &dispatched_command.generation.to_string(),
                        );
                        reply_comments.push(models::OutboundComment {
                            body: format!(
                                "Only configured integrators may integrate this pull request.\n\n{}",
                                marker.as_str()
                            ),
                            marker,
                            one_shot: false,
                        });
                    }
                }
                commands::Command::Csr => {
                    let marker = CommentMarker::keyed("csr-command", &dispatched_command.generation.to_string());
                    let body = if config.checks.enable_csr {
                        effects.csr_requested = true;
                        "A CSR is required for this change and will be tracked as an integration blocker until filed."
                    } else {
                        "CSR tracking is not enabled for this project."
                    };
                    reply_comments.push(models::OutboundComment {
                        body: format!("{body}\n\n{}", marker.as_str()),
                        marker,
                        one_shot: false,
                    });
                }
                commands::Command::Jep => {
                    let marker = CommentMarker::keyed("jep-command", &dispatched_command.generation.to_string());
                    let body = if config.checks.enable_jep {
                        effects.jep_requested = true;
                        "A JEP is required for this change and will be tracked as an integration blocker until filed."
                    } else {
                        "JEP tracking is not enabled for this project."
                    };
                    reply_comments.push(models::OutboundComment {
                        body: format!("{body}\n\n{}", marker.as_str()),
                        marker,
                        one_shot: false,
                    });
                }
                commands::Command::Reviewers { .. }
                | commands::Command::Tag { .. }
                | commands::Command::Touch
                | commands::Command::Keepalive
                | commands::Command::IssueAdd { .. }
                | commands::Command::Unrecognized { .. } => {}
            }
        }

        effects.reply_comments = std::mem::take(reply_comments);
        effects
    }

    /// Authorizes and applies every `/tag` command against the VCS
    /// (spec §4.8): only a configured integrator may create a tag, it must
    /// match the repository's tag pattern, and it must not already exist.
    /// `/reviewers` is folded earlier by
    /// [`commands::apply_reviewer_commands`]; every other command is
    /// handled by [`Self::fold_command_effects`].
    async fn apply_tag_commands(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr: &PullRequest,
        config: &models::JCheckConfig,
        dispatched: &[commands::DispatchedCommand],
        reply_comments: &mut Vec<models::OutboundComment>,
    ) -> Result<(), CheckRunError> {
        let tag_pattern = match config.repository.tag_pattern.as_deref() {
            Some(pattern) => Some(regex::Regex::new(pattern)?),
            None => None,
        };

        for dispatched_command in dispatched {
            let commands::Command::Tag { name } = &dispatched_command.command else {
                continue;
            };
            let existing_tags = self.vcs.list_tags(repo_owner, repo_name).await?;
            let marker = CommentMarker::keyed("tag-command", &dispatched_command.generation.to_string());
            let body = match commands::authorize_tag(
                name,
                &dispatched_command.issuer,
                &config.census.integrators,
                tag_pattern.as_ref(),
                &existing_tags,
            ) {
                Ok(()) => {
                    self.vcs
                        .create_tag(repo_owner, repo_name, name, &pr.head_sha)
                        .await?;
                    format!("Created tag `{name}`.")
                }
                Err(message) => message,
            };
            reply_comments.push(models::OutboundComment {
                body: format!("{body}\n\n{}", marker.as_str()),
                marker,
                one_shot: false,
            });
        }
        Ok(())
    }
}

/// A minimal [`DesiredState`] used while a configuration problem blocks
/// further check work. The one-shot config-invalid comment is the only
/// outbound mutation; no labels are touched so previously posted labels
/// are not lost.
fn config_problem_state(message: &str, check_status: CheckStatus) -> DesiredState {
    let marker = CommentMarker::new(CONFIG_INVALID_MARKER);
    DesiredState {
        labels: std::collections::BTreeSet::new(),
        body: format!("### Error\n\n- {message}\n"),
        check_status,
        check_title: DEFAULT_CHECK_TITLE.to_string(),
        check_summary: message.to_string(),
        outbound_comments: vec![models::OutboundComment {
            body: format!("{message}\n\n{}", marker.as_str()),
            marker,
            one_shot: true,
        }],
    }
}

/// The literal title a recoverable adapter fault in `stage` is reported
/// under.
fn exception_title(stage: &str) -> String {
    format!("Exception occurred during {stage} — the operation will be retried")
}

/// A failing [`DesiredState`] for a recoverable adapter fault, and a
/// fingerprint that never collides with a previously stored one: folding
/// `now_epoch_ms` into the config hash guarantees the next tick — even one
/// with an otherwise identical PR snapshot — is not treated as a cache hit,
/// so the promised retry actually happens.
fn exception_state(stage: &str, now_epoch_ms: i64) -> (DesiredState, models::CheckFingerprint) {
    let title = exception_title(stage);
    let desired = DesiredState {
        labels: std::collections::BTreeSet::new(),
        body: format!("### Error\n\n- {title}\n"),
        check_status: CheckStatus::Failure,
        check_title: title.clone(),
        check_summary: title.clone(),
        outbound_comments: Vec::new(),
    };
    let fingerprint = check_executor::compute_fingerprint(
        "exception",
        "exception",
        &format!("{title}:{now_epoch_ms}"),
        None,
        0,
    );
    (desired, fingerprint)
}
