use super::*;
use jcheck_platforms::fakes::FakeForge;

fn sample_pr() -> PullRequest {
    PullRequest {
        number: 1,
        title: "feat: add widget".to_string(),
        body: None,
        draft: false,
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

const VALID_CONFIG: &str = r#"
[general]
project = "TEST"

[checks]
enable_backport = true

[census]
census_repo = "acme/census"
issue_project = "TEST"

[repository]
"#;

#[tokio::test]
async fn test_resolve_for_missing_target_config() {
    let forge = FakeForge::new();
    let pr = sample_pr();

    let resolution = resolve_for(&forge, "acme", "widgets", &pr, None).await.unwrap();
    assert!(matches!(resolution, Resolution::Missing(ConfigSource::TargetBranch)));
}

#[tokio::test]
async fn test_resolve_for_ok_target_config() {
    let forge = FakeForge::new();
    forge.insert_file("main", ".jcheck/conf", VALID_CONFIG);
    let pr = sample_pr();

    let resolution = resolve_for(&forge, "acme", "widgets", &pr, None).await.unwrap();
    match resolution {
        Resolution::Ok { config, source } => {
            assert_eq!(config.general.project, "TEST");
            assert_eq!(source, ConfigSource::TargetBranch);
        }
        other => panic!("expected Ok resolution, got {other:?}"),
    }
}

#[tokio::test]
async fn test_resolve_for_invalid_config() {
    let forge = FakeForge::new();
    forge.insert_file("main", ".jcheck/conf", "not valid toml {{{");
    let pr = sample_pr();

    let resolution = resolve_for(&forge, "acme", "widgets", &pr, None).await.unwrap();
    assert!(matches!(resolution, Resolution::Invalid(ConfigSource::TargetBranch, _)));
}

#[tokio::test]
async fn test_resolve_for_override_takes_precedence() {
    let forge = FakeForge::new();
    forge.insert_file("main", ".jcheck/conf", VALID_CONFIG);
    forge.insert_file("override-ref", "conf/override", VALID_CONFIG);
    let pr = sample_pr();

    let over = ConfigOverride {
        repo: "acme/overrides".to_string(),
        git_ref: "override-ref".to_string(),
        path: "conf/override".to_string(),
    };

    let resolution = resolve_for(&forge, "acme", "widgets", &pr, Some(&over)).await.unwrap();
    assert!(matches!(
        resolution,
        Resolution::Ok {
            source: ConfigSource::Override { .. },
            ..
        }
    ));
}

#[tokio::test]
async fn test_resolve_for_override_missing_is_not_silent_fallback() {
    let forge = FakeForge::new();
    forge.insert_file("main", ".jcheck/conf", VALID_CONFIG);
    let pr = sample_pr();

    let over = ConfigOverride {
        repo: "acme/overrides".to_string(),
        git_ref: "override-ref".to_string(),
        path: "conf/override".to_string(),
    };

    let resolution = resolve_for(&forge, "acme", "widgets", &pr, Some(&over)).await.unwrap();
    assert!(matches!(resolution, Resolution::Missing(ConfigSource::Override { .. })));
}
