use std::fs;
use std::sync::Arc;

use wavebuild::backend::expand_sources;
use wavebuild::backend::pkg_config::{PkgConfig, PkgFlags};
use wavebuild::build::{Artifact, BuildOutcome};
use wavebuild::config::DaemonConfig;
use wavebuild::engine::{Manager, NullSink};
use wavebuild::fs::RealFileSystem;
use wavebuild::fs::mock::MockFileSystem;
use wavebuild_test_utils::init_tracing;

const DEFS: &str = r#"
[target.gen]
kind = "command"
cmd = "echo generated > gen.out"

[target.broken]
kind = "command"
cmd = "echo 'something went wrong' >&2; exit 3"

[target.after]
kind = "command"
cmd = "test -f gen.out"
deps = ["tools/gen"]
"#;

fn project() -> (tempfile::TempDir, Manager) {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    fs::create_dir_all(root.join("tools")).unwrap();
    fs::write(root.join("tools/BUILD.toml"), DEFS).unwrap();

    let cfg = DaemonConfig::for_root(&root);
    let manager = Manager::from_config(&cfg, Arc::new(RealFileSystem), Arc::new(NullSink)).unwrap();
    (dir, manager)
}

#[test]
fn command_targets_run_in_their_directory() {
    let (dir, manager) = project();

    let outcome = manager.build_target("tools/after").unwrap();

    assert_eq!(
        outcome,
        BuildOutcome::Success {
            artifacts: vec![Artifact::Command {
                target: "tools/after".to_string()
            }]
        }
    );
    let written = fs::read_to_string(dir.path().join("tools/gen.out")).unwrap();
    assert_eq!(written.trim(), "generated");
}

#[test]
fn failing_commands_report_status_and_stderr() {
    let (_dir, manager) = project();

    let outcome = manager.build_target("tools/broken").unwrap();

    let BuildOutcome::Failure { message } = outcome else {
        panic!("expected a failure");
    };
    assert!(message.starts_with("cannot build tools/broken, because\n"), "{message}");
    assert!(message.contains("exited with status 3"), "{message}");
    assert!(message.contains("something went wrong"), "{message}");
}

#[test]
fn expand_sources_matches_relative_globs() {
    let fs = MockFileSystem::new();
    fs.add_file("/proj/lib/a.cc", "");
    fs.add_file("/proj/lib/b.cc", "");
    fs.add_file("/proj/lib/b.h", "");
    fs.add_file("/proj/lib/sub/c.cc", "");

    let base = std::path::Path::new("/proj/lib");
    let top = expand_sources(&fs, base, &["*.cc".to_string()]).unwrap();
    assert_eq!(top, vec![base.join("a.cc"), base.join("b.cc")]);

    let all = expand_sources(&fs, base, &["**/*.cc".to_string()]).unwrap();
    assert_eq!(
        all,
        vec![base.join("a.cc"), base.join("b.cc"), base.join("sub/c.cc")]
    );

    assert!(expand_sources(&fs, base, &[]).unwrap().is_empty());
    assert!(
        expand_sources(&fs, "/proj/none".as_ref(), &["*.cc".to_string()])
            .unwrap()
            .is_empty()
    );
}

#[test]
fn pkg_config_without_packages_never_runs_the_tool() {
    let pkg = PkgConfig::new("/definitely/not/a/pkg-config");
    assert!(pkg.flags(&Vec::<String>::new(), PkgFlags::Cflags).is_empty());
    // A missing tool degrades to no flags.
    assert!(pkg.flags(&["zlib".to_string()], PkgFlags::Libs).is_empty());
}
