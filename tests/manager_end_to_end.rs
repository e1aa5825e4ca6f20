use std::collections::BTreeSet;
use std::sync::Arc;

use wavebuild::build::BuildOutcome;
use wavebuild::errors::WavebuildError;
use wavebuild::watch::Modifications;
use wavebuild_test_utils::{
    FakeBackend, InMemoryLoader, RecordingSink, TargetBuilder, fake_manager, init_tracing,
};

fn set(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn changed_sources(names: &[&str]) -> Modifications {
    Modifications {
        targets_changed: set(names),
        ..Modifications::default()
    }
}

fn changed_definitions(names: &[&str]) -> Modifications {
    Modifications {
        definitions_changed: set(names),
        ..Modifications::default()
    }
}

struct Fixture {
    loader: Arc<InMemoryLoader>,
    backend: Arc<FakeBackend>,
    sink: Arc<RecordingSink>,
    manager: wavebuild::engine::Manager,
}

fn fixture(loader: InMemoryLoader) -> Fixture {
    init_tracing();
    let loader = Arc::new(loader);
    let backend = Arc::new(FakeBackend::new());
    let sink = Arc::new(RecordingSink::new());
    let manager = fake_manager(loader.clone(), backend.clone(), sink.clone());
    Fixture {
        loader,
        backend,
        sink,
        manager,
    }
}

fn lib_and_bin() -> InMemoryLoader {
    InMemoryLoader::new()
        .with(TargetBuilder::binary("bin").dep("lib"))
        .with(TargetBuilder::library("lib"))
}

#[test]
fn activating_a_binary_tracks_and_builds_its_library_first() {
    let f = fixture(lib_and_bin());

    let summary = f.manager.add_active_target("bin").unwrap();

    assert_eq!(summary.waves, 2);
    assert_eq!(summary.built, set(&["bin", "lib"]));
    assert_eq!(f.backend.calls(), vec!["lib", "bin"]);
    assert_eq!(f.sink.tracked(), vec!["bin", "lib"]);
    assert_eq!(f.manager.active_targets(), set(&["bin"]));
    assert_eq!(f.manager.tracked_targets(), set(&["bin", "lib"]));
    assert_eq!(f.manager.dependencies("bin"), Some(set(&["lib"])));
    assert!(f.manager.build_result("lib").is_some());
    assert_eq!(f.manager.target("lib").unwrap().name(), "lib");

    let registry = f.manager.registry().read().unwrap();
    assert!(registry.is_registered("bin"));
    assert!(registry.is_registered("lib"));
}

#[test]
fn a_changed_library_source_rebuilds_the_library_then_the_binary() {
    let f = fixture(lib_and_bin());
    f.manager.add_active_target("bin").unwrap();
    f.backend.clear();
    f.sink.clear();

    let summary = f.manager.on_modified_files(&changed_sources(&["lib"]));

    assert_eq!(summary.waves, 2);
    assert_eq!(f.backend.calls(), vec!["lib", "bin"]);
    assert_eq!(f.sink.refreshed(), vec!["bin", "lib"]);
    assert!(f.sink.tracked().is_empty());
    assert_eq!(f.backend.observed("bin").get("lib"), Some(&true));
}

#[test]
fn a_changed_binary_source_rebuilds_only_the_binary() {
    let f = fixture(lib_and_bin());
    f.manager.add_active_target("bin").unwrap();
    f.backend.clear();

    f.manager.on_modified_files(&changed_sources(&["bin"]));

    assert_eq!(f.backend.calls(), vec!["bin"]);
}

#[test]
fn an_edited_definition_tracks_new_dependencies() {
    let f = fixture(lib_and_bin());
    f.manager.add_active_target("bin").unwrap();
    f.backend.clear();
    f.sink.clear();

    f.loader.insert(TargetBuilder::library("lib").dep("base"));
    f.loader.insert(TargetBuilder::library("base"));
    let summary = f.manager.on_modified_files(&changed_definitions(&["lib"]));

    assert_eq!(summary.waves, 3);
    assert_eq!(f.backend.calls(), vec!["base", "lib", "bin"]);
    assert_eq!(f.sink.tracked(), vec!["base"]);
    assert_eq!(f.manager.dependencies("lib"), Some(set(&["base"])));
    assert!(f.manager.registry().read().unwrap().is_registered("base"));

    // And dropping it again untracks it.
    f.loader.insert(TargetBuilder::library("lib"));
    f.manager.on_modified_files(&changed_definitions(&["lib"]));
    assert_eq!(f.sink.untracked(), vec!["base"]);
    assert_eq!(f.manager.tracked_targets(), set(&["bin", "lib"]));
    assert!(!f.manager.registry().read().unwrap().is_registered("base"));
}

#[test]
fn a_broken_definition_keeps_the_previous_state() {
    let f = fixture(lib_and_bin());
    f.manager.add_active_target("bin").unwrap();
    f.backend.clear();

    f.loader.remove("lib");
    let summary = f.manager.on_modified_files(&changed_definitions(&["lib"]));

    assert_eq!(summary.waves, 0);
    assert!(f.backend.calls().is_empty());
    assert_eq!(f.manager.tracked_targets(), set(&["bin", "lib"]));
    assert!(f.manager.build_result("lib").is_some());
}

#[test]
fn modifications_for_untracked_targets_are_ignored() {
    let f = fixture(lib_and_bin());
    f.manager.add_active_target("bin").unwrap();
    f.backend.clear();

    let summary = f.manager.on_modified_files(&changed_sources(&["ghost"]));

    assert_eq!(summary.waves, 0);
    assert!(f.backend.calls().is_empty());
}

#[test]
fn removing_the_active_target_untracks_everything() {
    let f = fixture(lib_and_bin());
    f.manager.add_active_target("bin").unwrap();
    f.backend.clear();

    let summary = f.manager.remove_active_target("bin");

    assert_eq!(summary.waves, 0);
    assert!(f.manager.tracked_targets().is_empty());
    assert!(f.manager.active_targets().is_empty());
    assert!(f.manager.build_result("bin").is_none());
    assert_eq!(f.sink.untracked(), vec!["bin", "lib"]);
    let registry = f.manager.registry().read().unwrap();
    assert!(!registry.is_registered("lib"));
}

#[test]
fn build_target_reports_success_and_failure_trees() {
    let f = fixture(lib_and_bin());

    let outcome = f.manager.build_target("lib").unwrap();
    assert!(outcome.is_success());

    f.backend.fail("lib");
    f.manager.on_modified_files(&changed_sources(&["lib"]));
    let outcome = f.manager.build_target("bin").unwrap();

    match outcome {
        BuildOutcome::Failure { message } => {
            assert!(message.starts_with("cannot build bin, because\n"), "{message}");
            assert!(message.contains(&FakeBackend::failure_message("lib")), "{message}");
        }
        other => panic!("expected a failure, got {other:?}"),
    }
    assert_eq!(f.manager.active_targets(), set(&["bin", "lib"]));
}

#[test]
fn build_target_fails_on_unknown_names_without_side_effects() {
    let f = fixture(lib_and_bin());

    let err = f.manager.build_target("nope").unwrap_err();

    assert!(matches!(err, WavebuildError::TargetNotFound(ref n) if n == "nope"));
    assert!(f.manager.active_targets().is_empty());
    assert!(f.sink.events().is_empty());
}

#[test]
fn cyclic_declarations_are_never_scheduled() {
    let loader = InMemoryLoader::new()
        .with(TargetBuilder::library("a").dep("b"))
        .with(TargetBuilder::library("b").dep("a"));
    let f = fixture(loader);

    let outcome = f.manager.build_target("a").unwrap();

    assert!(!outcome.is_success());
    assert!(f.backend.calls().is_empty());
}

#[test]
fn cycle_rejection_fails_discovery_instead() {
    let loader = InMemoryLoader::new()
        .with(TargetBuilder::library("a").dep("b"))
        .with(TargetBuilder::library("b").dep("a"));
    let f = fixture(loader);
    let manager = f.manager.with_cycle_rejection(true);

    let err = manager.add_active_target("a").unwrap_err();

    assert!(matches!(err, WavebuildError::DependencyCycle(_)));
    assert!(manager.tracked_targets().is_empty());
}
