//! Tests for the configuration system.

use comicsmith_error::ComicsmithErrorKind;
use comicsmith_rate_limit::{ComicsmithConfig, ProviderConfig, Tier};
use std::time::Duration;

#[test]
fn test_load_bundled_defaults() {
    let config = ComicsmithConfig::load().unwrap();

    assert!(config.providers.contains_key("openai"));
    assert!(config.providers.contains_key("stability"));

    let openai = config.provider("openai").unwrap();
    assert_eq!(openai.name, "openai");
    assert_eq!(openai.retry_budget, 3);
    assert_eq!(openai.requests_per_window, Some(5));

    assert_eq!(config.generation.fallback_order, vec!["openai", "stability"]);
    assert_eq!(config.layout.max_panels_per_page, 6);
}

#[test]
fn test_provider_config_implements_tier_trait() {
    let provider = ProviderConfig {
        name: "test".to_string(),
        requests_per_window: Some(10),
        window_secs: 30,
        max_concurrent: Some(2),
        ..ProviderConfig::default()
    };

    assert_eq!(provider.requests_per_window(), Some(10));
    assert_eq!(provider.window(), Duration::from_secs(30));
    assert_eq!(provider.max_concurrent(), Some(2));
    assert_eq!(Tier::name(&provider), "test");
}

#[test]
fn test_fallback_providers_follow_configured_order() {
    let config = ComicsmithConfig::from_toml_str(
        r#"
        [generation]
        fallback_order = ["backup", "primary"]

        [providers.primary]
        retry_budget = 2

        [providers.backup]
        retry_budget = 5
        "#,
    )
    .unwrap();

    let chain = config.fallback_providers().unwrap();
    let names: Vec<_> = chain.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["backup", "primary"]);
    assert_eq!(chain[0].retry_budget, 5);
}

#[test]
fn test_fallback_order_naming_unknown_provider_is_rejected() {
    let config = ComicsmithConfig::from_toml_str(
        r#"
        [generation]
        fallback_order = ["ghost"]
        "#,
    )
    .unwrap();

    let err = config.fallback_providers().unwrap_err();
    assert_eq!(err.setting.as_deref(), Some("generation.fallback_order"));
    assert!(err.message.contains("ghost"));
}

#[test]
fn test_invalid_values_fail_validation() {
    let zero_pool = ComicsmithConfig::from_toml_str(
        r#"
        [generation]
        worker_pool_size = 0
        "#,
    );
    assert!(zero_pool.is_err());

    let zero_budget = ComicsmithConfig::from_toml_str(
        r#"
        [providers.flaky]
        retry_budget = 0
        "#,
    );
    assert!(zero_budget.is_err());

    let bad_marker = ComicsmithConfig::from_toml_str(
        r#"
        [planner]
        location_markers = ["(unclosed"]
        "#,
    );
    assert!(bad_marker.is_err());

    let bad_threshold = ComicsmithConfig::from_toml_str(
        r#"
        [planner]
        cast_change_threshold = 1.5
        "#,
    );
    assert!(bad_threshold.is_err());
}

#[test]
fn test_zero_scene_break_gap_is_rejected() {
    let err = ComicsmithConfig::from_toml_str(
        r#"
        [planner]
        scene_break_gap_secs = 0
        "#,
    )
    .unwrap_err();
    assert!(err.to_string().contains("scene_break_gap_secs"));

    let mut config = ComicsmithConfig::default();
    config.planner.scene_break_gap_secs = 0;
    assert!(config.validate().is_err());
    config.planner.scene_break_gap_secs = 1;
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_from_file() {
    use std::io::Write;
    use tempfile::Builder;

    let mut temp_file = Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(
        temp_file,
        r#"
[planner]
max_events_per_scene = 3
max_panels_per_scene = 2

[layout]
max_panels_per_page = 1
keep_scenes_together = false

[providers.local]
requests_per_window = 100
window_secs = 1
max_concurrent = 4
"#
    )
    .unwrap();

    let config = ComicsmithConfig::from_file(temp_file.path()).unwrap();

    assert_eq!(config.planner.max_events_per_scene, 3);
    assert_eq!(config.planner.max_panels_per_scene, 2);
    // unset planner values keep their defaults
    assert_eq!(config.planner.max_events_per_panel, 4);
    assert_eq!(config.layout.max_panels_per_page, 1);
    assert!(!config.layout.keep_scenes_together);

    let local = config.provider("local").unwrap();
    assert_eq!(local.name, "local");
    assert_eq!(local.max_concurrent, Some(4));
    assert_eq!(local.retry_budget, 3);
}

#[test]
fn test_missing_file_is_an_error() {
    let result = ComicsmithConfig::from_file("/nonexistent/comicsmith.toml");
    assert!(result.is_err());
}

#[test]
fn test_validation_errors_name_the_offending_setting() {
    let mut config = ComicsmithConfig::default();
    config.planner.cast_window = 0;
    let err = config.validate().unwrap_err();
    assert_eq!(err.setting.as_deref(), Some("planner.cast_window"));
    assert!(err
        .to_string()
        .starts_with("Configuration Error: planner.cast_window must be at least 1"));

    let load_err = ComicsmithConfig::from_toml_str("[planner\n").unwrap_err();
    match load_err.kind() {
        ComicsmithErrorKind::Config(config_err) => assert!(config_err.setting.is_none()),
        other => panic!("expected a configuration error, got {other}"),
    }
}
