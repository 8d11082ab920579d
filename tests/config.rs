use std::fs;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use xero_explorer::config::{Config, ConfigLoader, DATABASE_FILE_NAME, DEFAULT_COMMIT_BATCH_SIZE};
use xero_explorer::error::XeroError;

#[test]
fn defaults_point_at_data_dir() {
    let resolved = ConfigLoader::resolve_config(Config::default()).unwrap();
    assert_eq!(resolved.schema_version, 1);
    assert_eq!(resolved.commit_batch_size, DEFAULT_COMMIT_BATCH_SIZE);
    assert!(resolved.database.ends_with(DATABASE_FILE_NAME));
    assert!(resolved.database.to_string().contains("xero-explorer"));
}

#[test]
fn resolve_reads_explicit_file() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("xero-explorer.json");
    fs::write(
        &path,
        r#"{
            "schema_version": 1,
            "database": "/srv/xero/xerophyta_db.sqlite",
            "default_species": " X. elegans ",
            "commit_batch_size": 250
        }"#,
    )
    .unwrap();

    let resolved = ConfigLoader::resolve(path.to_str()).unwrap();
    assert_eq!(
        resolved.database,
        Utf8PathBuf::from("/srv/xero/xerophyta_db.sqlite")
    );
    assert_eq!(resolved.default_species.as_deref(), Some("X. elegans"));
    assert_eq!(resolved.commit_batch_size, 250);
}

#[test]
fn explicit_missing_file_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("absent.json");
    let err = ConfigLoader::resolve(path.to_str()).unwrap_err();
    assert_matches!(err, XeroError::ConfigRead(_));
}

#[test]
fn invalid_json_is_a_parse_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("xero-explorer.json");
    fs::write(&path, "{ not json").unwrap();
    let err = ConfigLoader::resolve(path.to_str()).unwrap_err();
    assert_matches!(err, XeroError::ConfigParse(_));
}

#[test]
fn zero_batch_size_is_rejected() {
    let config = Config {
        commit_batch_size: Some(0),
        ..Config::default()
    };
    assert_matches!(
        ConfigLoader::resolve_config(config),
        Err(XeroError::ConfigParse(_))
    );
}

#[test]
fn unsupported_schema_version_is_rejected() {
    let config = Config {
        schema_version: Some(2),
        ..Config::default()
    };
    assert_matches!(
        ConfigLoader::resolve_config(config),
        Err(XeroError::ConfigParse(_))
    );
}
