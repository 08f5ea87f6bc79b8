use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use dirscan_config::{ConfigLoadError, ScanMode, ScannerConfig, ScannerConfigSource};
use tempfile::TempDir;

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key: &str| vars.get(key).cloned()
}

#[test]
fn defaults_when_nothing_is_configured() {
    let temp = TempDir::new().unwrap();
    let (config, source) = ScannerConfig::load_with(lookup(&[]), temp.path()).unwrap();

    assert_eq!(source, ScannerConfigSource::Default);
    assert_eq!(config, ScannerConfig::default());
}

#[test]
fn explicit_path_wins_over_inline_json_and_default_files() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("dirscan.toml"), "workers = 1\n").unwrap();
    let explicit = temp.path().join("custom.toml");
    fs::write(&explicit, "workers = 7\nmode = \"directories\"\n").unwrap();

    let (config, source) = ScannerConfig::load_with(
        lookup(&[
            ("DIRSCAN_CONFIG_PATH", explicit.to_str().unwrap()),
            ("DIRSCAN_CONFIG_JSON", r#"{"workers": 3}"#),
        ]),
        temp.path(),
    )
    .unwrap();

    assert_eq!(source, ScannerConfigSource::EnvPath(explicit));
    assert_eq!(config.workers, Some(7));
    assert_eq!(config.mode, ScanMode::Directories);
}

#[test]
fn inline_json_wins_over_default_files() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("dirscan.toml"), "workers = 1\n").unwrap();

    let (config, source) = ScannerConfig::load_with(
        lookup(&[("DIRSCAN_CONFIG_JSON", r#"{"workers": 3, "limit": 5}"#)]),
        temp.path(),
    )
    .unwrap();

    assert_eq!(source, ScannerConfigSource::EnvInline);
    assert_eq!(config.workers, Some(3));
    assert_eq!(config.limit, Some(5));
}

#[test]
fn default_file_candidates_are_searched_in_order() {
    let temp = TempDir::new().unwrap();
    fs::create_dir(temp.path().join("config")).unwrap();
    fs::write(
        temp.path().join("config/dirscan.json"),
        r#"{"recursive": false}"#,
    )
    .unwrap();

    let (config, source) = ScannerConfig::load_with(lookup(&[]), temp.path()).unwrap();
    assert_eq!(
        source,
        ScannerConfigSource::File(temp.path().join("config/dirscan.json"))
    );
    assert!(!config.recursive);

    fs::write(temp.path().join("dirscan.toml"), "buffer = 8\n").unwrap();
    let (config, source) = ScannerConfig::load_with(lookup(&[]), temp.path()).unwrap();
    assert_eq!(source, ScannerConfigSource::File(temp.path().join("dirscan.toml")));
    assert_eq!(config.buffer, 8);
    assert!(config.recursive);
}

#[test]
fn field_overrides_apply_on_top_of_the_file() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("dirscan.toml"),
        "workers = 2\nextensions = [\"gif\"]\n",
    )
    .unwrap();

    let (config, _) = ScannerConfig::load_with(
        lookup(&[
            ("DIRSCAN_WORKERS", "12"),
            ("DIRSCAN_RECURSIVE", "no"),
            ("DIRSCAN_EXTENSIONS", "jpg, png"),
            ("DIRSCAN_ROOTS", "/srv/a,/srv/b"),
            ("DIRSCAN_BUFFER", " "),
        ]),
        temp.path(),
    )
    .unwrap();

    assert_eq!(config.workers, Some(12));
    assert!(!config.recursive);
    assert_eq!(config.extensions, vec!["jpg", "png"]);
    assert_eq!(
        config.roots,
        vec![PathBuf::from("/srv/a"), PathBuf::from("/srv/b")]
    );
    // blank values are ignored
    assert_eq!(config.buffer, dirscan_core::DEFAULT_BUFFER);
}

#[test]
fn malformed_override_is_reported_with_its_key() {
    let temp = TempDir::new().unwrap();
    let err = ScannerConfig::load_with(lookup(&[("DIRSCAN_WORKERS", "many")]), temp.path())
        .unwrap_err();

    match err.downcast_ref::<ConfigLoadError>() {
        Some(ConfigLoadError::InvalidEnvValue { key, value }) => {
            assert_eq!(*key, "DIRSCAN_WORKERS");
            assert_eq!(value, "many");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn missing_explicit_file_is_an_error() {
    let temp = TempDir::new().unwrap();
    let missing = temp.path().join("nope.toml");
    let err = ScannerConfig::load_with(
        lookup(&[("DIRSCAN_CONFIG_PATH", missing.to_str().unwrap())]),
        temp.path(),
    )
    .unwrap_err();

    assert!(err.to_string().contains("failed to read scanner config"));
}

#[tokio::test]
async fn builder_from_config_scans_with_its_settings() {
    use futures::StreamExt;
    use tokio_util::sync::CancellationToken;

    let temp = TempDir::new().unwrap();
    fs::create_dir(temp.path().join("nested")).unwrap();
    fs::write(temp.path().join("a.jpg"), b"x").unwrap();
    fs::write(temp.path().join("b.txt"), b"x").unwrap();
    fs::write(temp.path().join("nested/c.JPG"), b"x").unwrap();

    let config = ScannerConfig {
        workers: Some(2),
        mode: ScanMode::Files,
        extensions: vec!["jpg".into()],
        roots: vec![temp.path().to_path_buf()],
        ..ScannerConfig::default()
    };
    config.validate().unwrap();

    let scanner = config.to_builder().build().unwrap();
    let mut names: Vec<String> = scanner
        .scan(CancellationToken::new())
        .unwrap()
        .map(|entry| entry.unwrap().name_lossy().into_owned())
        .collect()
        .await;
    names.sort();

    assert_eq!(names, vec!["a.jpg", "c.JPG"]);
}
