use std::sync::Arc;

use wavebuild::definition::{Declaration, DefinitionLoader, TargetLoader};
use wavebuild::errors::WavebuildError;
use wavebuild::fs::mock::MockFileSystem;
use wavebuild::graph::DependencyGraph;
use wavebuild::types::BuildMode;
use wavebuild_test_utils::init_tracing;

const ROOT_DEFS: &str = r#"
[default]
cflags = ["-Wall"]
lflags = ["-pthread"]

[target.app]
kind = "cpp_binary"
deps = ["lib/strings"]
binary_name = "app"

[target.strings]
kind = "command"
cmd = "echo shadowed"

[target.other]
kind = "cpp_library"
"#;

const LIB_DEFS: &str = r#"
[default]
cflags = ["-O2"]
pkg_config = ["zlib"]

[target.strings]
kind = "cpp_library"
sources = ["strings/*.cc"]
deps = ["lib/base"]
cflags = ["-DSTRINGS"]
watch = ["strings/*.h"]

[target.gen]
kind = "command"
cmd = "protoc api.proto"
watch = ["*.proto"]
"#;

const BASE_DEFS: &str = r#"
[target.base]
kind = "cpp_library"
"#;

fn project() -> (MockFileSystem, DefinitionLoader) {
    let fs = MockFileSystem::new();
    fs.add_file("/proj/BUILD.toml", ROOT_DEFS);
    fs.add_file("/proj/lib/BUILD.toml", LIB_DEFS);
    let loader = DefinitionLoader::new("/proj", "BUILD.toml", Arc::new(fs.clone()));
    (fs, loader)
}

#[test]
fn innermost_declaration_wins_and_defaults_accumulate() {
    init_tracing();
    let (_fs, loader) = project();

    let target = loader.load_target("lib/strings").unwrap();
    assert_eq!(target.mode(), BuildMode::CppLibrary);
    assert_eq!(target.dir(), "lib");
    assert_eq!(target.local_name(), "strings");
    assert_eq!(target.deps(), ["lib/base"]);

    let Declaration::CppLibrary(decl) = target.declaration() else {
        panic!("expected a library, got {:?}", target.declaration());
    };
    assert_eq!(decl.cflags, ["-Wall", "-O2", "-DSTRINGS"]);
    assert_eq!(decl.lflags, ["-pthread"]);
    assert_eq!(decl.pkg_config, ["zlib"]);
}

#[test]
fn outer_files_declare_targets_for_nested_directories() {
    init_tracing();
    let (_fs, loader) = project();

    let target = loader.load_target("lib/other").unwrap();
    assert_eq!(target.mode(), BuildMode::CppLibrary);
    // Only the defaults of the directories on the way apply.
    let Declaration::CppLibrary(decl) = target.declaration() else {
        panic!("expected a library");
    };
    assert_eq!(decl.cflags, ["-Wall", "-O2"]);
}

#[test]
fn binaries_and_commands_keep_their_own_fields() {
    init_tracing();
    let (_fs, loader) = project();

    let app = loader.load_target("app").unwrap();
    let Declaration::CppBinary(decl) = app.declaration() else {
        panic!("expected a binary");
    };
    assert_eq!(decl.binary_name.as_deref(), Some("app"));
    assert_eq!(decl.lflags, ["-pthread"]);

    let gen_target = loader.load_target("lib/gen").unwrap();
    let Declaration::Command(decl) = gen_target.declaration() else {
        panic!("expected a command");
    };
    assert_eq!(decl.cmd, "protoc api.proto");
    assert!(gen_target.deps().is_empty());
}

#[test]
fn watch_globs_are_root_relative() {
    init_tracing();
    let (_fs, loader) = project();

    assert_eq!(
        loader.load_target("lib/strings").unwrap().watch_globs(),
        ["lib/strings/*.cc", "lib/strings/*.h"]
    );
    assert!(loader.load_target("app").unwrap().watch_globs().is_empty());
    assert_eq!(loader.load_target("other").unwrap().watch_globs(), ["other.*"]);
    assert_eq!(loader.load_target("lib/gen").unwrap().watch_globs(), ["lib/*.proto"]);
    assert_eq!(
        loader.load_target("lib/strings").unwrap().definition_dirs(),
        ["", "lib"]
    );
}

#[test]
fn unknown_targets_and_bad_names_are_not_found() {
    init_tracing();
    let (_fs, loader) = project();

    for name in ["lib/nope", "nowhere/ghost", "", "lib//strings", "../app", "lib/./strings"] {
        let err = loader.load_target(name).unwrap_err();
        assert!(
            matches!(err, WavebuildError::TargetNotFound(_)),
            "{name:?}: unexpected {err:?}"
        );
        assert!(err.is_resolution_error());
    }
}

#[test]
fn malformed_files_are_invalid_definitions() {
    init_tracing();
    let (fs, loader) = project();
    fs.add_file("/proj/bad/BUILD.toml", "[target.x]\nkind = \"rust_crate\"\n");
    fs.add_file("/proj/broken/BUILD.toml", "[target.x\n");
    fs.add_file("/proj/nocmd/BUILD.toml", "[target.x]\nkind = \"command\"\n");

    for name in ["bad/x", "broken/x", "nocmd/x"] {
        match loader.load_target(name) {
            Err(WavebuildError::InvalidDefinition { path, .. }) => {
                assert!(path.ends_with("BUILD.toml"), "{path:?}");
            }
            other => panic!("{name}: expected InvalidDefinition, got {other:?}"),
        }
    }

    // A broken root file poisons every target below it.
    fs.add_file("/proj/BUILD.toml", "not toml at all [");
    assert!(matches!(
        loader.load_target("lib/strings"),
        Err(WavebuildError::InvalidDefinition { .. })
    ));
}

#[test]
fn loader_drives_graph_discovery() {
    init_tracing();
    let (fs, loader) = project();
    fs.add_file("/proj/lib/BUILD.toml", format!("{LIB_DEFS}\n{BASE_DEFS}"));

    let mut graph = DependencyGraph::new();
    let changes = graph.add_top_level_target("app", &loader).unwrap();
    let tracked: Vec<&str> = changes.tracked.iter().map(String::as_str).collect();
    assert_eq!(tracked, ["app", "lib/base", "lib/strings"]);
}

#[test]
fn loader_reports_missing_dependencies() {
    init_tracing();
    let (_fs, loader) = project();

    // lib/strings depends on lib/base, which nobody declares.
    let mut graph = DependencyGraph::new();
    let err = graph.add_top_level_target("app", &loader).unwrap_err();
    assert!(matches!(err, WavebuildError::TargetNotFound(ref n) if n == "lib/base"));
    assert!(graph.tracked_targets().is_empty());
}
