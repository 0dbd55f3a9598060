use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use dax_manager::config::{Config, ConfigLoader, ConfigOverrides};
use dax_manager::error::DaxError;
use dax_manager::location::PersistMode;

fn file_config() -> Config {
    Config {
        prefix: Some("/data/projects".to_string()),
        group: Some("lcls".to_string()),
        platform: Some("fah".to_string()),
        projid: Some(10009),
        scratch_dir: Some("/scratch/dax".to_string()),
        fetch_command: Some("/opt/cctools/bin/chirp_get".to_string()),
        persist_mode: Some(PersistMode::Pointer),
        force: Some(false),
    }
}

#[test]
fn overrides_win_over_file() {
    let overrides = ConfigOverrides {
        projid: Some(10010),
        persist_mode: Some(PersistMode::Symlink),
        force: Some(true),
        ..Default::default()
    };
    let resolved = ConfigLoader::resolve_config(file_config(), overrides).unwrap();
    assert_eq!(resolved.projid, 10010);
    assert_eq!(resolved.group, "lcls");
    assert_eq!(resolved.prefix, Utf8PathBuf::from("/data/projects"));
    assert_eq!(resolved.scratch_dir, Utf8PathBuf::from("/scratch/dax"));
    assert_eq!(resolved.fetch_command, "/opt/cctools/bin/chirp_get");
    assert_eq!(resolved.persist.mode, PersistMode::Symlink);
    assert!(resolved.persist.force);
}

#[test]
fn missing_identity_is_reported() {
    let config = Config {
        platform: None,
        ..file_config()
    };
    let err = ConfigLoader::resolve_config(config, ConfigOverrides::default()).unwrap_err();
    assert_matches!(err, DaxError::MissingSetting("platform"));
}

#[test]
fn load_explicit_path() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("dax.json");
    std::fs::write(
        &path,
        r#"{"group": "lcls", "platform": "fah", "projid": 10009}"#,
    )
    .unwrap();

    let resolved =
        ConfigLoader::resolve(path.to_str(), ConfigOverrides::default()).unwrap();
    assert_eq!(resolved.prefix, Utf8PathBuf::from("."));
    assert_eq!(resolved.persist.mode, PersistMode::Pointer);

    let err = ConfigLoader::load(temp.path().join("absent.json").to_str()).unwrap_err();
    assert_matches!(err, DaxError::ConfigRead(_));
}

#[test]
fn unknown_keys_are_rejected() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("dax.json");
    std::fs::write(&path, r#"{"group": "lcls", "colour": "blue"}"#).unwrap();
    let err = ConfigLoader::load(path.to_str()).unwrap_err();
    assert_matches!(err, DaxError::ConfigParse(_));
}
