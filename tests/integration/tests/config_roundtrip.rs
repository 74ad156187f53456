//! Config save/load roundtrip integration tests.
//!
//! These tests verify that configuration can be serialized, written to disk,
//! and loaded back with identical field values.

use coursehub_core::config::{BindMode, Config, ConfigBuilder};
use std::path::Path;
use tempfile::TempDir;

#[test]
fn test_config_save_and_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json5");

    let config = Config::default();
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded.gateway.port, config.gateway.port);
    assert_eq!(loaded.gateway.bind, config.gateway.bind);
    assert_eq!(loaded.gateway.history_limit, config.gateway.history_limit);
    assert_eq!(loaded.auth.cookie_name, config.auth.cookie_name);
    loaded.validate().unwrap();
}

#[test]
fn test_config_modify_and_reload() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json5");

    let config = ConfigBuilder::new()
        .port(9090)
        .bind(BindMode::Lan)
        .database(dir.path().join("chat.db"))
        .build();
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded.gateway.port, 9090);
    assert_eq!(loaded.gateway.bind, BindMode::Lan);
    assert_eq!(loaded.database_path().unwrap(), dir.path().join("chat.db"));
}

#[test]
fn test_partial_json5_fills_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json5");
    std::fs::write(
        &path,
        "// local overrides\n{ gateway: { port: 8700, allowed_origins: ['https://courses.example.edu'], }, }",
    )
    .unwrap();

    let loaded = Config::load(&path).unwrap();
    let defaults = Config::default();
    assert_eq!(loaded.gateway.port, 8700);
    assert_eq!(loaded.gateway.allowed_origins, vec!["https://courses.example.edu"]);
    assert_eq!(loaded.gateway.max_connections, defaults.gateway.max_connections);
    loaded.validate().unwrap();
}

#[test]
fn test_load_or_default_without_file() {
    let dir = TempDir::new().unwrap();
    let config = Config::load_or_default(Some(&dir.path().join("absent.json5"))).unwrap();
    assert_eq!(config.gateway.port, Config::default().gateway.port);
}

#[test]
fn test_config_load_nonexistent() {
    let result = Config::load(Path::new("/nonexistent/config.json5"));
    assert!(result.is_err());
}

#[test]
fn test_config_parse_invalid() {
    let result = Config::parse("not valid json");
    assert!(result.is_err());
}
