use std::fs;
use std::time::Duration;

use wavebuild::config::{load_and_validate, load_or_default};
use wavebuild::errors::WavebuildError;

fn write_config(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Wavebuild.toml");
    fs::write(&path, contents).unwrap();
    (dir, path)
}

fn config_error(contents: &str) -> String {
    let (_dir, path) = write_config(contents);
    match load_and_validate(&path) {
        Err(WavebuildError::ConfigError(msg)) => msg,
        other => panic!("expected a config error, got {other:?}"),
    }
}

#[test]
fn empty_file_gets_defaults_rooted_next_to_it() {
    let (dir, path) = write_config("");

    let cfg = load_and_validate(&path).unwrap();

    assert_eq!(cfg.root(), dir.path().canonicalize().unwrap());
    assert_eq!(cfg.project.definition_filename, "BUILD.toml");
    assert_eq!(cfg.debounce(), Duration::from_millis(200));
    assert!(!cfg.watch.use_hash);
    assert!(!cfg.graph.reject_cycles);
    assert_eq!(cfg.pools.effective_wave_workers(), 4);
    assert_eq!(cfg.toolchain.compiler, "clang++");
}

#[test]
fn sections_override_defaults() {
    let (dir, path) = write_config(
        r#"
[project]
root = "src"
definition_filename = "TARGETS.toml"

[watch]
debounce_ms = 50
use_hash = true

[pools]
default_workers = 2
source_workers = 16

[graph]
reject_cycles = true

[toolchain]
compiler = "g++"
"#,
    );
    fs::create_dir(dir.path().join("src")).unwrap();

    let cfg = load_and_validate(&path).unwrap();

    assert_eq!(cfg.root(), dir.path().join("src").canonicalize().unwrap());
    assert_eq!(cfg.project.definition_filename, "TARGETS.toml");
    assert_eq!(cfg.debounce(), Duration::from_millis(50));
    assert!(cfg.watch.use_hash);
    assert_eq!(cfg.pools.effective_wave_workers(), 2);
    assert_eq!(cfg.pools.effective_source_workers(), 16);
    assert!(cfg.graph.reject_cycles);
    assert_eq!(cfg.toolchain.compiler, "g++");
    assert_eq!(cfg.toolchain.archiver, "ar");
}

#[test]
fn invalid_values_are_rejected() {
    assert!(config_error("[watch]\ndebounce_ms = 0\n").contains("debounce_ms"));
    assert!(config_error("[pools]\ndefault_workers = 0\n").contains("default_workers"));
    assert!(config_error("[pools]\nsource_workers = 0\n").contains("source_workers"));
    assert!(config_error("[project]\ndefinition_filename = \"a/BUILD\"\n").contains("plain file name"));
    assert!(config_error("[project]\ndefinition_filename = \" \"\n").contains("must not be empty"));
}

#[test]
fn malformed_toml_is_a_toml_error() {
    let (_dir, path) = write_config("[watch\n");
    assert!(matches!(load_and_validate(&path), Err(WavebuildError::TomlError(_))));
}

#[test]
fn missing_files_fall_back_only_when_implicit() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Wavebuild.toml");

    let cfg = load_or_default(&path, false).unwrap();
    assert_eq!(cfg.root(), dir.path().canonicalize().unwrap());

    assert!(matches!(
        load_or_default(&path, true),
        Err(WavebuildError::ConfigError(_))
    ));
}
