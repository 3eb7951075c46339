use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use tempfile::TempDir;
use tracelink_core::config::{
    ConfigError, DEFAULT_CACHE_MAX_ENTRIES, DEFAULT_CACHE_TTL_SECS, DEFAULT_EXCLUDE_DIRS,
    DEFAULT_MAX_LINE_LENGTH,
};
use tracelink_core::Config;

#[test]
fn test_default_config() {
    let config = Config::default();
    assert_eq!(config.cache.max_entries, DEFAULT_CACHE_MAX_ENTRIES);
    assert_eq!(config.cache.ttl(), Duration::from_secs(DEFAULT_CACHE_TTL_SECS));
    assert_eq!(config.scan.max_line_length, DEFAULT_MAX_LINE_LENGTH);
    assert!(config.scan.highlight_call_sites);
    assert!(config.index.source_roots.is_empty());
    assert_eq!(config.index.exclude_dirs.len(), DEFAULT_EXCLUDE_DIRS.len());
}

#[test]
fn test_config_to_toml() {
    let config = Config::default();
    let toml_str = toml::to_string_pretty(&config).unwrap();
    assert!(toml_str.contains("[cache]"));
    assert!(toml_str.contains("[scan]"));
    assert!(toml_str.contains("[index]"));

    let parsed: Config = toml::from_str(&toml_str).unwrap();
    assert_eq!(parsed, config);
}

#[test]
fn test_config_from_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("tracelink.toml");

    let mut file = File::create(&path).unwrap();
    writeln!(
        file,
        r#"
[cache]
max_entries = 50

[index]
source_roots = ["app/src/main/java"]
library_roots = ["~/.m2/sources"]
extensions = ["java", "jav"]
"#
    )
    .unwrap();

    let config = Config::from_file(&path).unwrap();
    assert_eq!(config.cache.max_entries, 50);
    assert_eq!(config.index.source_roots, vec![PathBuf::from("app/src/main/java")]);
    assert_eq!(config.index.library_roots, vec![PathBuf::from("~/.m2/sources")]);
    assert_eq!(config.index.extensions, vec!["java".to_string(), "jav".to_string()]);
}

#[test]
fn test_invalid_values_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("tracelink.toml");

    let mut file = File::create(&path).unwrap();
    writeln!(file, "[index]\nextensions = []").unwrap();

    let err = Config::from_file(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn test_malformed_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("tracelink.toml");

    let mut file = File::create(&path).unwrap();
    writeln!(file, "[cache\nmax_entries = ").unwrap();

    assert!(matches!(Config::from_file(&path), Err(ConfigError::ParseError(_))));
    assert!(matches!(
        Config::from_file(temp_dir.path().join("missing.toml")),
        Err(ConfigError::ReadError(_))
    ));
}

#[test]
fn test_env_override() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("tracelink.toml");
    File::create(&path).unwrap();

    std::env::set_var("TRACELINK_CACHE_TTL_SECS", "5");
    let config = Config::from_file(&path);
    std::env::remove_var("TRACELINK_CACHE_TTL_SECS");

    assert_eq!(config.unwrap().cache.ttl(), Duration::from_secs(5));
}
