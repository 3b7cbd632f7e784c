//! Integration tests for configuration module

use smartblock_core::config::{Config, DEFAULT_DIRECTORY_URL};
use smartblock_core::rules::ResourceTypes;
use smartblock_core::{DiffStrategy, Error};
use std::io::Write;

#[test]
fn test_defaults_are_valid() {
    let config = Config::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.updates.directory_url, DEFAULT_DIRECTORY_URL);
    assert_eq!(config.updates.update_interval_minutes, 1440);
    assert_eq!(config.updates.stats_interval_minutes, 30);
    assert_eq!(config.host.max_rules, 5000);
    assert_eq!(config.reconcile.diff, DiffStrategy::Positional);
    assert!(!config.reconcile.single_flight);
    assert_eq!(config.trackers.frequent_threshold, 10);
    assert_eq!(config.trackers.data_saved_per_block_kb, 50);
    assert_eq!(config.shortener.hash_length, 8);
}

#[test]
fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[blocking]
extra_domains = ["ads.example"]
resource_types = ["script", "image", "media"]

[reconcile]
diff = "by-id"
single_flight = true

[shortener]
base_url = "https://s.example"
default_expiration_days = 30
"#
    )
    .unwrap();

    let config = Config::load(file.path()).unwrap();
    assert!(config.validate().is_ok());
    assert_eq!(config.blocking.extra_domains, vec!["ads.example"]);
    assert_eq!(
        config.blocking.resource_types,
        ResourceTypes::SCRIPT | ResourceTypes::IMAGE | ResourceTypes::MEDIA
    );
    assert_eq!(config.reconcile.diff, DiffStrategy::ById);
    assert!(config.reconcile.single_flight);
    assert_eq!(config.shortener.base_url, "https://s.example");
    assert_eq!(config.shortener.default_expiration_days, 30);
    // untouched sections keep their defaults
    assert_eq!(config.host.max_rules, 5000);
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = Config::load(dir.path().join("absent.toml"));
    assert!(matches!(result, Err(Error::ConfigNotFound { .. })));
}

#[test]
fn test_unknown_resource_type_rejected() {
    let result = Config::from_toml("[blocking]\nresource_types = [\"telepathy\"]\n");
    assert!(result.is_err());
}

#[test]
fn test_validation_failures() {
    let mut config = Config::default();
    config.host.max_rules = 0;
    assert!(matches!(config.validate(), Err(Error::ConfigValue { ref key, .. }) if key == "host.max_rules"));

    let mut config = Config::default();
    config.shortener.hash_length = 12;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.updates.directory_url = "not a url".into();
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.blocking.resource_types = ResourceTypes::empty();
    assert!(config.validate().is_err());
}

#[test]
fn test_generated_config_round_trips() {
    let mut config = Config::default();
    config.blocking.extra_domains = vec!["one.example".into()];
    config.reconcile.diff = DiffStrategy::ById;

    let text = config.to_toml().unwrap();
    let parsed = Config::from_toml(&text).unwrap();
    assert_eq!(parsed.blocking.extra_domains, config.blocking.extra_domains);
    assert_eq!(parsed.reconcile.diff, DiffStrategy::ById);
    assert_eq!(parsed.blocking.resource_types, ResourceTypes::default());
}
