use super::*;

#[test]
fn test_issue_ref_qualified_id() {
    let issue_ref = IssueRef {
        project: "TEST".to_string(),
        numeric_id: 1,
        canonical_title: "My first issue".to_string(),
        kind: IssueKind::Bug,
        state: IssueLifecycle::Open,
        properties: BTreeMap::new(),
    };

    assert_eq!(issue_ref.qualified_id(), "TEST-1");
}

#[test]
fn test_reviewer_requirement_merge_takes_elementwise_max() {
    let mut config_vector = BTreeMap::new();
    config_vector.insert(Role::Reviewer, 1);
    config_vector.insert(Role::Committer, 0);
    let config = ReviewerRequirement(config_vector);

    let mut command_vector = BTreeMap::new();
    command_vector.insert(Role::Reviewer, 2);
    let command = ReviewerRequirement(command_vector);

    let merged = config.merged_with(&command);
    assert_eq!(merged.get(Role::Reviewer), 2);
    assert_eq!(merged.get(Role::Committer), 0);
}

#[test]
fn test_reviewer_requirement_missing_role_is_zero() {
    let requirement = ReviewerRequirement::default();
    assert_eq!(requirement.get(Role::Lead), 0);
}

#[test]
fn test_comment_marker_keyed_round_trip() {
    let marker = CommentMarker::keyed("backport", "abc123");
    assert_eq!(marker.as_str(), "<!-- backport:abc123 -->");
}

#[test]
fn test_check_fingerprint_encoding_is_stable() {
    let fingerprint = CheckFingerprint {
        target_head: "t1".to_string(),
        source_head: "s1".to_string(),
        config_hash: 42,
        body_hash: 7,
        command_generation: 3,
    };

    assert_eq!(fingerprint.encode(), fingerprint.encode());
}

#[test]
fn test_role_from_census_role() {
    assert_eq!(Role::from(jcheck_platforms::CensusRole::Lead), Role::Lead);
}
