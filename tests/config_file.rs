//! Integration tests for loading configuration files.
//!
//! Exercises the flow: TOML file -> parsed Config -> environment overrides ->
//! provider registration with resolved credentials. Environment access goes
//! through lookup closures so tests never touch the process environment.

use std::collections::HashMap;
use std::io::Write;

use tempfile::NamedTempFile;

use ai_adapter::config::{Config, ConfigError, KeySource};
use ai_adapter::provider::{Provider, ProviderRegistry, Registration};

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp config");
    file.write_all(content.as_bytes()).expect("write temp config");
    file
}

fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |name| vars.get(name).cloned()
}

#[test]
fn test_file_with_env_expanded_key() {
    let file = write_config(
        r#"
[server]
listen = "127.0.0.1:18000"

[routing]
max_units_per_day = 5000
cost_threshold_usd = 0.02

[providers.cloud]
model = "gemini-1.5-pro"
api_key = "${CLOUD_KEY_FOR_TEST}"

[providers.local]
url = "http://127.0.0.1:9090"
"#,
    );

    let config = Config::from_file(file.path()).unwrap();
    assert_eq!(config.server.listen, "127.0.0.1:18000");
    assert_eq!(config.routing.max_units_per_day, 5000);
    assert_eq!(config.routing.cost_threshold_usd, 0.02);

    let client = reqwest::Client::new();
    let (registry, registrations) = ProviderRegistry::from_config_with(
        &config.providers,
        &client,
        env(&[("CLOUD_KEY_FOR_TEST", "resolved-key")]),
    );

    assert_eq!(registry.len(), 2);
    match &registrations[0] {
        Registration::Registered { name, key_source, .. } => {
            assert_eq!(name, "gemini");
            assert_eq!(key_source.as_ref(), Some(&KeySource::EnvExpanded));
        }
        other => panic!("unexpected registration: {other:?}"),
    }

    let gemini = registry.get("gemini").unwrap();
    assert_eq!(gemini.model(), "gemini-1.5-pro");
    assert_eq!(gemini.price_table().input_per_million, 3.50);
}

#[test]
fn test_missing_key_leaves_cloud_unregistered() {
    let file = write_config("[providers.local]\nurl = \"http://127.0.0.1:9090\"\n");
    let config = Config::from_file(file.path()).unwrap();

    let (registry, registrations) =
        ProviderRegistry::from_config_with(&config.providers, &reqwest::Client::new(), env(&[]));

    assert_eq!(registry.names(), vec!["whisper"]);
    assert!(matches!(
        &registrations[0],
        Registration::Unavailable {
            error: ConfigError::MissingCredential { .. },
            ..
        }
    ));
}

#[test]
fn test_placeholder_key_counts_as_missing() {
    let file = write_config("[providers.cloud]\napi_key = \"your-gemini-api-key-here\"\n");
    let config = Config::from_file(file.path()).unwrap();

    let (registry, _) =
        ProviderRegistry::from_config_with(&config.providers, &reqwest::Client::new(), env(&[]));

    assert!(registry.get("gemini").is_none());
}

#[test]
fn test_disabled_provider_reported() {
    let file = write_config("[providers.local]\nenabled = false\n");
    let config = Config::from_file(file.path()).unwrap();

    let (registry, registrations) = ProviderRegistry::from_config_with(
        &config.providers,
        &reqwest::Client::new(),
        env(&[("GEMINI_API_KEY", "k")]),
    );

    assert_eq!(registry.names(), vec!["gemini"]);
    assert!(matches!(&registrations[1], Registration::Disabled { name } if name == "whisper"));
}

#[test]
fn test_local_url_from_environment() {
    let config = Config::default();

    let (registry, _) = ProviderRegistry::from_config_with(
        &config.providers,
        &reqwest::Client::new(),
        env(&[("WHISPER_LIVE_URL", "not a url")]),
    );

    assert!(registry.get("whisper").is_none());
}

#[test]
fn test_env_overrides_win_over_file() {
    let file = write_config(
        r#"
[routing]
enable_cost_optimization = true
max_units_per_day = 5000
fallback_to_local = true
"#,
    );
    let mut config = Config::from_file(file.path()).unwrap();

    config
        .apply_env_overrides_with(env(&[
            ("ENABLE_COST_OPTIMIZATION", "false"),
            ("MAX_GEMINI_TOKENS_PER_DAY", "250"),
            ("FALLBACK_TO_LOCAL", "no"),
            ("PORT", "9001"),
        ]))
        .unwrap();

    assert!(!config.routing.enable_cost_optimization);
    assert_eq!(config.routing.max_units_per_day, 250);
    assert!(!config.routing.fallback_to_local);
    assert_eq!(config.server.listen, "0.0.0.0:9001");
}

#[test]
fn test_invalid_file_is_parse_error() {
    let file = write_config("[routing\nmax_units_per_day = ");
    let err = Config::from_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)), "unexpected error: {err:?}");
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");

    let err = Config::load(Some(path.as_path())).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }), "unexpected error: {err:?}");
}
