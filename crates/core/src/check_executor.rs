//! Check Executor.
//!
//! Runs jcheck over the target configuration (authoritative) and, when the
//! PR touches `.jcheck/conf`, a second advisory pass over the modified
//! configuration. Also owns the fingerprint cache that lets a `CheckRun`
//! skip redundant work on an unchanged PR.

use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::Mutex;

use jcheck_platforms::models::{FindingSeverity as AdapterSeverity, JCheckFinding};
use jcheck_platforms::JCheckEngine;

use crate::errors::CheckRunError;
use crate::models::{CheckFingerprint, ConfigOrigin, Finding, Severity};

#[cfg(test)]
#[path = "check_executor_tests.rs"]
mod tests;

fn to_severity(severity: AdapterSeverity) -> Severity {
    match severity {
        AdapterSeverity::Error => Severity::Error,
        AdapterSeverity::Warning => Severity::Warning,
    }
}

fn to_finding(raw: JCheckFinding, origin: ConfigOrigin, advisory_suffix: bool) -> Finding {
    let message = if advisory_suffix {
        format!(
            "{} (failed with updated jcheck configuration in pull request)",
            raw.message
        )
    } else {
        raw.message
    };
    Finding {
        severity: to_severity(raw.severity),
        kind: raw.check_name,
        message,
        origin,
    }
}

/// A jcheck engine fault, tagged with which pass produced it so the caller
/// can report an exception title naming the failed stage rather than a
/// generic one (spec §5/§7: a fault in the advisory source pass is
/// reported as "Exception occurred during source jcheck").
#[derive(Debug)]
pub enum PassFailure {
    Target(CheckRunError),
    Source(CheckRunError),
}

/// Runs the target pass, and the source pass when `source_config_blob` is
/// supplied (i.e. the PR's diff modifies `.jcheck/conf`), deduplicating
/// findings reported by both so the target pass wins.
pub async fn run_checks(
    engine: &dyn JCheckEngine,
    repo_owner: &str,
    repo_name: &str,
    target_head: &str,
    source_head: &str,
    target_config_blob: &str,
    source_config_blob: Option<&str>,
) -> Result<Vec<Finding>, PassFailure> {
    let target_raw = engine
        .run(repo_owner, repo_name, (target_head, source_head), target_config_blob)
        .await
        .map_err(|e| PassFailure::Target(e.into()))?;
    let mut findings: Vec<Finding> = target_raw
        .into_iter()
        .map(|f| to_finding(f, ConfigOrigin::TargetConf, false))
        .collect();

    if let Some(source_blob) = source_config_blob {
        let source_raw = engine
            .run(repo_owner, repo_name, (target_head, source_head), source_blob)
            .await
            .map_err(|e| PassFailure::Source(e.into()))?;
        for raw in source_raw {
            let already_reported = findings
                .iter()
                .any(|f| f.kind == raw.check_name && raw_message_matches(&f.message, &raw.message));
            if !already_reported {
                findings.push(to_finding(raw, ConfigOrigin::SourceConf, true));
            }
        }
    }

    Ok(findings)
}

fn raw_message_matches(existing: &str, candidate: &str) -> bool {
    existing == candidate
}

/// A special-case error emitted directly rather than via a configured
/// check.
pub fn check_empty_body(body: Option<&str>) -> Option<Finding> {
    let is_empty = body.map(|b| b.trim().is_empty()).unwrap_or(true);
    is_empty.then(|| Finding {
        severity: Severity::Error,
        kind: "emptyBody".to_string(),
        message: "The pull request description is empty.".to_string(),
        origin: ConfigOrigin::TargetConf,
    })
}

pub fn check_no_changes(changed_paths: &[String]) -> Option<Finding> {
    changed_paths.is_empty().then(|| Finding {
        severity: Severity::Error,
        kind: "noChanges".to_string(),
        message: "The pull request contains no changes.".to_string(),
        origin: ConfigOrigin::TargetConf,
    })
}

/// The PR's changes are a (non-empty) strict subset of what the target
/// branch already changed since the merge base.
pub fn check_changes_subset_of_target(
    changed_paths: &[String],
    target_changed_paths: &[String],
) -> Option<Finding> {
    let is_strict_subset = !changed_paths.is_empty()
        && changed_paths
            .iter()
            .all(|p| target_changed_paths.contains(p));
    is_strict_subset.then(|| Finding {
        severity: Severity::Error,
        kind: "changesSubsetOfTarget".to_string(),
        message: "Every change in this pull request is already present on the target branch."
            .to_string(),
        origin: ConfigOrigin::TargetConf,
    })
}

pub fn check_blocked_labels(applied_labels: &[String], blocking_check_labels: &[String]) -> Option<Finding> {
    let blocked: Vec<&str> = applied_labels
        .iter()
        .filter(|l| blocking_check_labels.iter().any(|b| b == *l))
        .map(|s| s.as_str())
        .collect();
    (!blocked.is_empty()).then(|| Finding {
        severity: Severity::Error,
        kind: "blockedByLabel".to_string(),
        message: format!("Blocked by label(s): {}.", blocked.join(", ")),
        origin: ConfigOrigin::TargetConf,
    })
}

fn hash_str(s: &str) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    s.hash(&mut hasher);
    hasher.finish()
}

/// Computes the opaque fingerprint carried in the status check's metadata
/// field.
pub fn compute_fingerprint(
    target_head: &str,
    source_head: &str,
    config_text: &str,
    body: Option<&str>,
    command_generation: u64,
) -> CheckFingerprint {
    CheckFingerprint {
        target_head: target_head.to_string(),
        source_head: source_head.to_string(),
        config_hash: hash_str(config_text),
        body_hash: hash_str(body.unwrap_or("")),
        command_generation,
    }
}

/// Renders the status check summary as a bullet list, truncated with an
/// ellipsis if it would exceed the forge's summary cap.
pub fn render_summary(findings: &[Finding], cap_bytes: usize) -> String {
    let mut summary = String::new();
    for finding in findings {
        summary.push_str("- ");
        summary.push_str(&finding.message);
        summary.push('\n');
    }
    if summary.len() <= cap_bytes {
        return summary;
    }

    let mut truncated = summary.as_bytes()[..cap_bytes.min(summary.len())].to_vec();
    while !truncated.is_empty() && std::str::from_utf8(&truncated).is_err() {
        truncated.pop();
    }
    let mut clipped = String::from_utf8(truncated).unwrap_or_default();
    clipped.push('…');
    clipped
}

#[derive(Clone, Debug)]
struct CacheEntry {
    fingerprint: CheckFingerprint,
    recheck_after_epoch_ms: Option<i64>,
}

#[derive(Default)]
struct FingerprintCacheInner {
    entries: HashMap<u64, CacheEntry>,
    insertion_order: VecDeque<u64>,
}

/// Bounded, thread-safe, single-writer-per-key cache of the last
/// fingerprint a `CheckRun` computed per PR. Eviction is
/// FIFO once `capacity` is reached.
pub struct FingerprintCache {
    capacity: usize,
    inner: Mutex<FingerprintCacheInner>,
}

impl FingerprintCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(FingerprintCacheInner::default()),
        }
    }

    /// True when `candidate` matches the stored fingerprint for `pr_number`
    /// and no expiration has elapsed, i.e. the run would be a no-op.
    pub fn is_cache_hit(&self, pr_number: u64, candidate: &CheckFingerprint, now_epoch_ms: i64) -> bool {
        let inner = self.inner.lock().unwrap();
        match inner.entries.get(&pr_number) {
            Some(entry) => {
                entry.fingerprint == *candidate
                    && entry
                        .recheck_after_epoch_ms
                        .map(|t| now_epoch_ms < t)
                        .unwrap_or(true)
            }
            None => false,
        }
    }

    pub fn store(&self, pr_number: u64, fingerprint: CheckFingerprint) {
        let mut inner = self.inner.lock().unwrap();
        if !inner.entries.contains_key(&pr_number) {
            if inner.insertion_order.len() >= self.capacity {
                if let Some(oldest) = inner.insertion_order.pop_front() {
                    inner.entries.remove(&oldest);
                }
            }
            inner.insertion_order.push_back(pr_number);
        }
        inner.entries.insert(
            pr_number,
            CacheEntry {
                fingerprint,
                recheck_after_epoch_ms: None,
            },
        );
    }

    /// Forces the next check on `pr_number` to miss regardless of
    /// fingerprint equality (`/touch`, `/keepalive`, spec §4.4).
    pub fn invalidate(&self, pr_number: u64) {
        let mut inner = self.inner.lock().unwrap();
        inner.entries.remove(&pr_number);
        inner.insertion_order.retain(|n| *n != pr_number);
    }

    /// Schedules a future time at which the cache will stop honoring the
    /// currently stored fingerprint (`scheduleRecheckAt`, spec §4.4).
    pub fn schedule_recheck_at(&self, pr_number: u64, at_epoch_ms: i64) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(entry) = inner.entries.get_mut(&pr_number) {
            entry.recheck_after_epoch_ms = Some(at_epoch_ms);
        }
    }
}
