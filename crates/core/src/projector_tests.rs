use std::collections::BTreeMap;

use proptest::prelude::*;

use super::*;
use crate::models::{CensusSection, CheckSection, GeneralSection, RepositorySection, Role, Verdict};
use crate::review_evaluator::EvaluatedReview;

fn sample_pr(draft: bool) -> PullRequest {
    PullRequest {
        number: 1,
        title: "1: fix the thing".to_string(),
        body: Some(format!("hand-written prose\n\n{AUTO_SECTION_MARKER}\n\nstale content")),
        draft,
        head_sha: "h1".to_string(),
        base_ref: "main".to_string(),
        author: None,
        labels: Vec::new(),
        comments: Vec::new(),
        reviews: Vec::new(),
        check: None,
        last_force_push_epoch_ms: None,
    }
}

fn sample_config() -> JCheckConfig {
    JCheckConfig {
        general: GeneralSection {
            project: "TEST".to_string(),
            jbs: None,
        },
        checks: CheckSection::default(),
        census: CensusSection::default(),
        repository: RepositorySection::default(),
        approval: Default::default(),
    }
}

fn reviewer_requirement(count: u32) -> ReviewerRequirement {
    let mut map = BTreeMap::new();
    map.insert(Role::Reviewer, count);
    ReviewerRequirement(map)
}

fn active_review(active: bool, is_self: bool) -> EvaluatedReview {
    EvaluatedReview {
        user_id: 2,
        login: "r".to_string(),
        role: Role::Reviewer,
        verdict: Verdict::Approved,
        active,
        is_self_review: is_self,
    }
}

fn build_input<'a>(
    pr: &'a PullRequest,
    config: &'a JCheckConfig,
    requirement: &'a ReviewerRequirement,
    reviews: &'a [EvaluatedReview],
    findings: &'a [Finding],
    rebase_status: &'a RebaseStatus,
    backport: &'a BackportClassification,
    effects: &'a CommandEffects,
) -> ProjectorInput<'a> {
    ProjectorInput {
        pr,
        config,
        reviewer_requirement: requirement,
        active_reviews: reviews,
        findings,
        rebase_status,
        backport_classification: backport,
        primary_issue: None,
        related_issues: &[],
        integration_blocker: None,
        config_problem: None,
        command_effects: effects,
        check_summary_cap_bytes: 65 * 1024,
    }
}

#[test]
fn test_ready_implies_rfr() {
    let pr = sample_pr(false);
    let config = sample_config();
    let requirement = reviewer_requirement(1);
    let reviews = vec![active_review(true, false)];
    let findings = vec![];
    let rebase_status = RebaseStatus::Clean;
    let backport = BackportClassification::NotABackportPr;
    let effects = CommandEffects::default();

    let input = build_input(&pr, &config, &requirement, &reviews, &findings, &rebase_status, &backport, &effects);
    let desired = project(&input);

    assert!(desired.labels.contains(LABEL_READY));
    assert!(desired.labels.contains(LABEL_RFR));
}

#[test]
fn test_draft_excludes_rfr_and_ready() {
    let pr = sample_pr(true);
    let config = sample_config();
    let requirement = reviewer_requirement(0);
    let reviews = vec![];
    let findings = vec![];
    let rebase_status = RebaseStatus::Clean;
    let backport = BackportClassification::NotABackportPr;
    let effects = CommandEffects::default();

    let input = build_input(&pr, &config, &requirement, &reviews, &findings, &rebase_status, &backport, &effects);
    let desired = project(&input);

    assert!(!desired.labels.contains(LABEL_RFR));
    assert!(!desired.labels.contains(LABEL_READY));
}

#[test]
fn test_merge_conflict_excludes_ready() {
    let pr = sample_pr(false);
    let config = sample_config();
    let requirement = reviewer_requirement(0);
    let reviews = vec![];
    let findings = vec![];
    let rebase_status = RebaseStatus::Conflict {
        conflicting_paths: vec!["a.rs".to_string()],
    };
    let backport = BackportClassification::NotABackportPr;
    let effects = CommandEffects::default();

    let input = build_input(&pr, &config, &requirement, &reviews, &findings, &rebase_status, &backport, &effects);
    let desired = project(&input);

    assert!(desired.labels.contains(LABEL_MERGE_CONFLICT));
    assert!(!desired.labels.contains(LABEL_READY));
    assert_eq!(desired.outbound_comments.len(), 1);
    assert!(desired.outbound_comments[0].body.contains("merge conflicts"));
}

#[test]
fn test_clean_backport_gets_clean_label() {
    let pr = sample_pr(false);
    let config = sample_config();
    let requirement = reviewer_requirement(0);
    let reviews = vec![];
    let findings = vec![];
    let rebase_status = RebaseStatus::Clean;
    let backport = BackportClassification::Clean {
        referenced_commit: "deadbeef".to_string(),
        original_title: None,
    };
    let effects = CommandEffects::default();

    let input = build_input(&pr, &config, &requirement, &reviews, &findings, &rebase_status, &backport, &effects);
    let desired = project(&input);

    assert!(desired.labels.contains(LABEL_CLEAN));
    assert!(desired.labels.contains(LABEL_BACKPORT));
}

#[test]
fn test_self_review_blocks_check_and_excludes_rfr() {
    let pr = sample_pr(false);
    let config = sample_config();
    let requirement = reviewer_requirement(0);
    let reviews = vec![active_review(false, true)];
    let findings = vec![];
    let rebase_status = RebaseStatus::Clean;
    let backport = BackportClassification::NotABackportPr;
    let effects = CommandEffects::default();

    let input = build_input(&pr, &config, &requirement, &reviews, &findings, &rebase_status, &backport, &effects);
    let desired = project(&input);

    assert_eq!(desired.check_status, CheckStatus::Failure);
    assert!(!desired.labels.contains(LABEL_RFR));
}

#[test]
fn test_preamble_preserved_and_stale_content_dropped() {
    let pr = sample_pr(false);
    let config = sample_config();
    let requirement = reviewer_requirement(0);
    let reviews = vec![];
    let findings = vec![];
    let rebase_status = RebaseStatus::Clean;
    let backport = BackportClassification::NotABackportPr;
    let effects = CommandEffects::default();

    let input = build_input(&pr, &config, &requirement, &reviews, &findings, &rebase_status, &backport, &effects);
    let desired = project(&input);

    assert!(desired.body.starts_with("hand-written prose"));
    assert!(!desired.body.contains("stale content"));
}

proptest! {
    #[test]
    fn test_projection_is_deterministic(
        draft in any::<bool>(),
        has_finding in any::<bool>(),
        reviewer_active in any::<bool>(),
        conflict in any::<bool>(),
    ) {
        let pr = sample_pr(draft);
        let config = sample_config();
        let requirement = reviewer_requirement(1);
        let reviews = vec![active_review(reviewer_active, false)];
        let findings = if has_finding {
            vec![Finding {
                severity: Severity::Error,
                kind: "whitespace".to_string(),
                message: "trailing whitespace".to_string(),
                origin: ConfigOrigin::TargetConf,
            }]
        } else {
            vec![]
        };
        let rebase_status = if conflict {
            RebaseStatus::Conflict { conflicting_paths: vec!["a.rs".to_string()] }
        } else {
            RebaseStatus::Clean
        };
        let backport = BackportClassification::NotABackportPr;
        let effects = CommandEffects::default();

        let input = build_input(&pr, &config, &requirement, &reviews, &findings, &rebase_status, &backport, &effects);
        let first = project(&input);
        let second = project(&input);

        prop_assert_eq!(first.labels, second.labels);
        prop_assert_eq!(first.check_status, second.check_status);
        prop_assert_eq!(first.body, second.body);

        if first.labels.contains(LABEL_READY) {
            prop_assert!(first.labels.contains(LABEL_RFR));
        }
        if draft {
            prop_assert!(!first.labels.contains(LABEL_RFR));
            prop_assert!(!first.labels.contains(LABEL_READY));
        }
        if conflict {
            prop_assert!(!first.labels.contains(LABEL_READY));
        }
    }
}
