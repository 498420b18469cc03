use super::*;
use jcheck_platforms::fakes::FakeJCheckEngine;
use jcheck_platforms::models::{FindingSeverity as AdapterSeverity, JCheckFinding};

fn finding(check_name: &str, message: &str) -> JCheckFinding {
    JCheckFinding {
        check_name: check_name.to_string(),
        severity: AdapterSeverity::Error,
        message: message.to_string(),
        path: None,
    }
}

#[tokio::test]
async fn test_run_checks_target_only() {
    let engine = FakeJCheckEngine::new();
    engine.set_findings(("t1", "s1"), "target-conf", vec![finding("noTabs", "tabs found")]);

    let findings = run_checks(&engine, "o", "r", "t1", "s1", "target-conf", None)
        .await
        .unwrap();

    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].origin, ConfigOrigin::TargetConf);
}

#[tokio::test]
async fn test_run_checks_dedups_findings_reported_by_both_passes() {
    let engine = FakeJCheckEngine::new();
    engine.set_findings(("t1", "s1"), "target-conf", vec![finding("noTabs", "tabs found")]);
    engine.set_findings(("t1", "s1"), "source-conf", vec![finding("noTabs", "tabs found")]);

    let findings = run_checks(&engine, "o", "r", "t1", "s1", "target-conf", Some("source-conf"))
        .await
        .unwrap();

    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].origin, ConfigOrigin::TargetConf);
}

#[tokio::test]
async fn test_run_checks_source_only_finding_is_advisory() {
    let engine = FakeJCheckEngine::new();
    engine.set_findings(("t1", "s1"), "target-conf", vec![]);
    engine.set_findings(("t1", "s1"), "source-conf", vec![finding("lineLength", "line too long")]);

    let findings = run_checks(&engine, "o", "r", "t1", "s1", "target-conf", Some("source-conf"))
        .await
        .unwrap();

    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].origin, ConfigOrigin::SourceConf);
    assert!(findings[0].message.contains("updated jcheck configuration"));
}

#[test]
fn test_check_empty_body() {
    assert!(check_empty_body(None).is_some());
    assert!(check_empty_body(Some("   ")).is_some());
    assert!(check_empty_body(Some("has content")).is_none());
}

#[test]
fn test_check_no_changes() {
    assert!(check_no_changes(&[]).is_some());
    assert!(check_no_changes(&["a.rs".to_string()]).is_none());
}

#[test]
fn test_check_changes_subset_of_target() {
    let target = vec!["a.rs".to_string(), "b.rs".to_string()];
    assert!(check_changes_subset_of_target(&["a.rs".to_string()], &target).is_some());
    assert!(check_changes_subset_of_target(&["c.rs".to_string()], &target).is_none());
    assert!(check_changes_subset_of_target(&[], &target).is_none());
}

#[test]
fn test_check_blocked_labels() {
    let applied = vec!["do-not-merge".to_string(), "feature".to_string()];
    let blocking = vec!["do-not-merge".to_string()];
    let found = check_blocked_labels(&applied, &blocking).unwrap();
    assert!(found.message.contains("do-not-merge"));
    assert!(check_blocked_labels(&["feature".to_string()], &blocking).is_none());
}

#[test]
fn test_render_summary_truncates_with_ellipsis() {
    let findings: Vec<Finding> = (0..100)
        .map(|i| Finding {
            severity: Severity::Error,
            kind: "x".to_string(),
            message: format!("finding number {i}"),
            origin: ConfigOrigin::TargetConf,
        })
        .collect();

    let summary = render_summary(&findings, 100);
    assert!(summary.len() <= 101);
    assert!(summary.ends_with('…'));
}

#[test]
fn test_render_summary_under_cap_is_untouched() {
    let findings = vec![Finding {
        severity: Severity::Error,
        kind: "x".to_string(),
        message: "short".to_string(),
        origin: ConfigOrigin::TargetConf,
    }];
    let summary = render_summary(&findings, 65 * 1024);
    assert_eq!(summary, "- short\n");
}

fn fp(body_hash_seed: &str) -> CheckFingerprint {
    compute_fingerprint("t1", "s1", "cfg", Some(body_hash_seed), 0)
}

#[test]
fn test_fingerprint_cache_hit_and_miss() {
    let cache = FingerprintCache::new(16);
    let fingerprint = fp("body");

    assert!(!cache.is_cache_hit(1, &fingerprint, 0));

    cache.store(1, fingerprint.clone());
    assert!(cache.is_cache_hit(1, &fingerprint, 0));

    let changed = fp("different body");
    assert!(!cache.is_cache_hit(1, &changed, 0));
}

#[test]
fn test_fingerprint_cache_invalidate_forces_miss() {
    let cache = FingerprintCache::new(16);
    let fingerprint = fp("body");
    cache.store(1, fingerprint.clone());
    assert!(cache.is_cache_hit(1, &fingerprint, 0));

    cache.invalidate(1);
    assert!(!cache.is_cache_hit(1, &fingerprint, 0));
}

#[test]
fn test_fingerprint_cache_scheduled_recheck_expires() {
    let cache = FingerprintCache::new(16);
    let fingerprint = fp("body");
    cache.store(1, fingerprint.clone());
    cache.schedule_recheck_at(1, 1000);

    assert!(cache.is_cache_hit(1, &fingerprint, 500));
    assert!(!cache.is_cache_hit(1, &fingerprint, 1500));
}

#[test]
fn test_fingerprint_cache_evicts_oldest_beyond_capacity() {
    let cache = FingerprintCache::new(1);
    cache.store(1, fp("a"));
    cache.store(2, fp("b"));

    assert!(!cache.is_cache_hit(1, &fp("a"), 0));
    assert!(cache.is_cache_hit(2, &fp("b"), 0));
}
