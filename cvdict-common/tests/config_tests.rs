//! Configuration and root folder resolution tests
//!
//! Tests touching CVDICT_ROOT are marked #[serial] so they never race on the
//! process environment.

use cvdict_common::config::{resolve_root_folder, StorePaths, TomlConfig, ROOT_FOLDER_ENV};
use cvdict_common::Error;
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[test]
#[serial]
fn test_cli_argument_beats_env_and_toml() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/cvdict-env-root");
    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/cvdict-toml-root")),
        ..Default::default()
    };

    let root = resolve_root_folder(Some(Path::new("/tmp/cvdict-cli-root")), &config);

    env::remove_var(ROOT_FOLDER_ENV);
    assert_eq!(root, PathBuf::from("/tmp/cvdict-cli-root"));
}

#[test]
#[serial]
fn test_env_beats_toml() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/cvdict-env-root");
    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/cvdict-toml-root")),
        ..Default::default()
    };

    let root = resolve_root_folder(None, &config);

    env::remove_var(ROOT_FOLDER_ENV);
    assert_eq!(root, PathBuf::from("/tmp/cvdict-env-root"));
}

#[test]
#[serial]
fn test_blank_env_is_ignored() {
    env::set_var(ROOT_FOLDER_ENV, "  ");
    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/cvdict-toml-root")),
        ..Default::default()
    };

    let root = resolve_root_folder(None, &config);

    env::remove_var(ROOT_FOLDER_ENV);
    assert_eq!(root, PathBuf::from("/tmp/cvdict-toml-root"));
}

#[test]
#[serial]
fn test_default_root_when_nothing_configured() {
    env::remove_var(ROOT_FOLDER_ENV);

    let root = resolve_root_folder(None, &TomlConfig::default());

    assert!(!root.as_os_str().is_empty());
    assert!(root.ends_with("cvdict") || root.ends_with("cvdict_data"));
}

#[test]
fn test_load_explicit_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
root_folder = "/data/dict"
source_db = "sources/cedict.db"

[logging]
level = "debug"

[enrichment]
model = "deepseek-reasoner"
"#,
    )
    .unwrap();

    let config = TomlConfig::load(Some(&path)).unwrap();
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.enrichment.model, "deepseek-reasoner");

    let paths = StorePaths::resolve(PathBuf::from("/data/dict"), &config, None, None);
    assert_eq!(paths.source_db, PathBuf::from("/data/dict/sources/cedict.db"));
    assert_eq!(paths.primary_db, PathBuf::from("/data/dict/chinese_vietnamese_dict.db"));
}

#[test]
fn test_invalid_toml_is_config_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "root_folder = [not valid").unwrap();

    let result = TomlConfig::load(Some(&path));
    assert!(matches!(result, Err(Error::Config(_))));
}
