use std::fs;
use std::path::Path;

use serde::Deserialize;
use tempfile::tempdir;
use toml::Table;

use crate::{Config, ConfigKind, ErrorKind, merge_overlay};

#[derive(Deserialize, Debug, PartialEq)]
struct TestConfig {
    name: String,
    rate: f32,
    nested: NestedConfig,
}

#[derive(Deserialize, Debug, PartialEq)]
struct NestedConfig {
    enabled: bool,
    threshold: i32,
}

impl Config for TestConfig {
    const PATH: &'static str = "test_config.toml";
}

const MAIN: &str = r#"
    name = "main"
    rate = 0.5

    [nested]
    enabled = true
    threshold = 100
"#;

fn write_config(dir: &Path, contents: &str) {
    fs::write(dir.join(TestConfig::PATH), contents).expect("failed to write test config");
}

#[test]
fn load_reads_main_config() {
    let dir = tempdir().unwrap();
    write_config(dir.path(), MAIN);

    let config = TestConfig::load(dir.path()).unwrap();

    assert_eq!(config.name, "main");
    assert!((config.rate - 0.5).abs() < f32::EPSILON);
    assert!(config.nested.enabled);
    assert_eq!(config.nested.threshold, 100);
}

#[test]
fn overlay_overrides_nested_values_only() {
    let main = tempdir().unwrap();
    let overlay = tempdir().unwrap();
    write_config(main.path(), MAIN);
    write_config(
        overlay.path(),
        r"
        [nested]
        threshold = 7
        ",
    );

    let config = TestConfig::load_with_overlay(main.path(), overlay.path()).unwrap();

    assert_eq!(config.name, "main");
    assert!(config.nested.enabled);
    assert_eq!(config.nested.threshold, 7);
}

#[test]
fn missing_overlay_is_reported_as_overlay_error() {
    let main = tempdir().unwrap();
    let overlay = tempdir().unwrap();
    write_config(main.path(), MAIN);

    let error = TestConfig::load_with_overlay(main.path(), overlay.path()).unwrap_err();

    assert!(matches!(
        error.kind,
        ErrorKind::Load {
            config_kind: ConfigKind::Overlay,
            ..
        }
    ));
}

#[test]
fn missing_optional_overlay_falls_back_to_main() {
    let main = tempdir().unwrap();
    let overlay = tempdir().unwrap();
    write_config(main.path(), MAIN);

    let config = TestConfig::load_with_optional_overlay(main.path(), overlay.path()).unwrap();

    assert_eq!(config.nested.threshold, 100);
}

#[test]
fn missing_main_config_fails() {
    let dir = tempdir().unwrap();

    let error = TestConfig::load(dir.path()).unwrap_err();

    assert!(matches!(
        error.kind,
        ErrorKind::Load {
            config_kind: ConfigKind::Main,
            ..
        }
    ));
}

#[test]
fn invalid_toml_is_a_parse_error() {
    let dir = tempdir().unwrap();
    write_config(dir.path(), "name = ");

    let error = TestConfig::load(dir.path()).unwrap_err();

    assert!(matches!(error.kind, ErrorKind::Parse { .. }));
}

#[test]
fn wrong_layout_is_a_deserialize_error() {
    let dir = tempdir().unwrap();
    write_config(dir.path(), "name = 3");

    let error = TestConfig::load(dir.path()).unwrap_err();

    assert!(matches!(error.kind, ErrorKind::Deserialize(_)));
}

#[test]
fn merge_replaces_non_table_values() {
    let mut main: Table = "a = 1\n[b]\nc = [1, 2]\nd = 'x'".parse().unwrap();
    let overlay: Table = "[b]\nc = [3]".parse().unwrap();

    merge_overlay(&mut main, overlay);

    let expected: Table = "a = 1\n[b]\nc = [3]\nd = 'x'".parse().unwrap();
    assert_eq!(main, expected);
}
