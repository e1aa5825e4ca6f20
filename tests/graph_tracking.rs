use std::collections::BTreeSet;

use wavebuild::errors::WavebuildError;
use wavebuild::graph::{DependencyGraph, GraphEvent};
use wavebuild_test_utils::{InMemoryLoader, TargetBuilder, init_tracing};

fn set(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn diamond() -> InMemoryLoader {
    InMemoryLoader::new()
        .with(TargetBuilder::binary("a").deps(&["b", "c"]))
        .with(TargetBuilder::library("b").dep("d"))
        .with(TargetBuilder::library("c").dep("d"))
        .with(TargetBuilder::library("d"))
}

#[test]
fn add_top_level_target_tracks_transitive_closure_once() {
    init_tracing();
    let loader = diamond();
    let mut graph = DependencyGraph::new();

    let changes = graph.add_top_level_target("a", &loader).unwrap();

    assert_eq!(changes.tracked, set(&["a", "b", "c", "d"]));
    assert!(changes.untracked.is_empty());
    assert!(changes.refreshed.is_empty());
    assert_eq!(graph.tracked_targets(), set(&["a", "b", "c", "d"]));
    assert_eq!(graph.dependencies("a"), Some(&set(&["b", "c"])));
    assert_eq!(graph.dependents("d"), Some(&set(&["b", "c"])));
    assert!(graph.dependents("a").is_none());
    assert!(graph.is_active("a"));
    assert!(!graph.is_active("b"));
    // The shared dependency is resolved once.
    assert_eq!(loader.load_count("d"), 1);
}

#[test]
fn adding_an_active_target_again_changes_nothing() {
    init_tracing();
    let loader = diamond();
    let mut graph = DependencyGraph::new();
    graph.add_top_level_target("a", &loader).unwrap();

    let changes = graph.add_top_level_target("a", &loader).unwrap();
    assert!(changes.is_empty());
}

#[test]
fn adding_a_tracked_dependency_as_root_only_marks_it_active() {
    init_tracing();
    let loader = diamond();
    let mut graph = DependencyGraph::new();
    graph.add_top_level_target("a", &loader).unwrap();

    let changes = graph.add_top_level_target("b", &loader).unwrap();
    assert!(changes.tracked.is_empty());
    assert!(graph.is_active("b"));

    // b survives removal of a because it is now a root itself.
    let changes = graph.remove_top_level_target("a");
    assert_eq!(changes.untracked, set(&["a", "c"]));
    assert_eq!(graph.tracked_targets(), set(&["b", "d"]));
}

#[test]
fn remove_never_collects_names_reachable_from_another_root() {
    init_tracing();
    let loader = InMemoryLoader::new()
        .with(TargetBuilder::binary("app").deps(&["shared", "only_app"]))
        .with(TargetBuilder::binary("tool").dep("shared"))
        .with(TargetBuilder::library("shared").dep("base"))
        .with(TargetBuilder::library("only_app"))
        .with(TargetBuilder::library("base"));
    let mut graph = DependencyGraph::new();
    graph.add_top_level_target("app", &loader).unwrap();
    graph.add_top_level_target("tool", &loader).unwrap();

    let changes = graph.remove_top_level_target("app");
    assert_eq!(changes.untracked, set(&["app", "only_app"]));
    assert_eq!(graph.tracked_targets(), set(&["tool", "shared", "base"]));
    assert_eq!(graph.dependents("shared"), Some(&set(&["tool"])));

    let changes = graph.remove_top_level_target("tool");
    assert_eq!(changes.untracked, set(&["tool", "shared", "base"]));
    assert!(graph.tracked_targets().is_empty());
    assert!(graph.active_targets().is_empty());
}

#[test]
fn removing_an_inactive_target_is_a_no_op() {
    init_tracing();
    let loader = diamond();
    let mut graph = DependencyGraph::new();
    graph.add_top_level_target("a", &loader).unwrap();

    let changes = graph.remove_top_level_target("b");
    assert!(changes.is_empty());
    assert!(graph.is_tracked("b"));
}

#[test]
fn refresh_swaps_dependencies_and_refreshes_ancestors() {
    init_tracing();
    let loader = InMemoryLoader::new()
        .with(TargetBuilder::binary("top").dep("x"))
        .with(TargetBuilder::library("x").deps(&["a", "b"]))
        .with(TargetBuilder::library("a"))
        .with(TargetBuilder::library("b"))
        .with(TargetBuilder::library("c"));
    let mut graph = DependencyGraph::new();
    graph.add_top_level_target("top", &loader).unwrap();

    loader.insert(TargetBuilder::library("x").deps(&["a", "c"]));
    let changes = graph.refresh_target("x", &loader).unwrap();

    assert_eq!(changes.tracked, set(&["c"]));
    assert_eq!(changes.untracked, set(&["b"]));
    assert_eq!(changes.refreshed, set(&["top", "x"]));
    assert_eq!(graph.dependencies("x"), Some(&set(&["a", "c"])));
    assert!(!graph.is_tracked("b"));
    assert!(graph.dependents("b").is_none());
    assert_eq!(graph.dependents("c"), Some(&set(&["x"])));
}

#[test]
fn refresh_keeps_dropped_dependency_referenced_elsewhere() {
    init_tracing();
    let loader = InMemoryLoader::new()
        .with(TargetBuilder::binary("top").deps(&["x", "z"]))
        .with(TargetBuilder::library("x").dep("b"))
        .with(TargetBuilder::library("z").dep("b"))
        .with(TargetBuilder::library("b"));
    let mut graph = DependencyGraph::new();
    graph.add_top_level_target("top", &loader).unwrap();

    loader.insert(TargetBuilder::library("x"));
    let changes = graph.refresh_target("x", &loader).unwrap();

    assert!(changes.untracked.is_empty());
    assert!(graph.is_tracked("b"));
    assert_eq!(graph.dependents("b"), Some(&set(&["z"])));
}

#[test]
fn refresh_through_a_new_intermediate_does_not_churn() {
    init_tracing();
    let loader = InMemoryLoader::new()
        .with(TargetBuilder::binary("x").dep("b"))
        .with(TargetBuilder::library("b"))
        .with(TargetBuilder::library("c").dep("b"));
    let mut graph = DependencyGraph::new();
    graph.add_top_level_target("x", &loader).unwrap();

    // x now reaches b only through c.
    loader.insert(TargetBuilder::binary("x").dep("c"));
    let changes = graph.refresh_target("x", &loader).unwrap();

    assert_eq!(changes.tracked, set(&["c"]));
    assert!(changes.untracked.is_empty());
    assert_eq!(graph.dependents("b"), Some(&set(&["c"])));
}

#[test]
fn refreshing_an_untracked_target_is_an_error() {
    init_tracing();
    let loader = diamond();
    let mut graph = DependencyGraph::new();

    let err = graph.refresh_target("a", &loader).unwrap_err();
    assert!(matches!(err, WavebuildError::NotTracked(ref n) if n == "a"));
}

#[test]
fn resolution_error_leaves_graph_unchanged() {
    init_tracing();
    let loader = InMemoryLoader::new()
        .with(TargetBuilder::binary("app").deps(&["lib", "missing"]))
        .with(TargetBuilder::library("lib"));
    let mut graph = DependencyGraph::new();

    let err = graph.add_top_level_target("app", &loader).unwrap_err();
    assert!(matches!(err, WavebuildError::TargetNotFound(ref n) if n == "missing"));
    assert!(err.is_resolution_error());
    assert!(graph.tracked_targets().is_empty());
    assert!(graph.active_targets().is_empty());
}

#[test]
fn failed_refresh_keeps_previous_dependencies() {
    init_tracing();
    let loader = diamond();
    let mut graph = DependencyGraph::new();
    graph.add_top_level_target("a", &loader).unwrap();

    loader.insert(TargetBuilder::library("b").deps(&["d", "ghost"]));
    let err = graph.refresh_target("b", &loader).unwrap_err();

    assert!(matches!(err, WavebuildError::TargetNotFound(_)));
    assert_eq!(graph.dependencies("b"), Some(&set(&["d"])));
    assert_eq!(graph.tracked_targets(), set(&["a", "b", "c", "d"]));
}

#[test]
fn cyclic_declarations_are_registered_without_recursing_forever() {
    init_tracing();
    let loader = InMemoryLoader::new()
        .with(TargetBuilder::library("a").dep("b"))
        .with(TargetBuilder::library("b").dep("a"));
    let mut graph = DependencyGraph::new();

    let changes = graph.add_top_level_target("a", &loader).unwrap();
    assert_eq!(changes.tracked, set(&["a", "b"]));
    assert_eq!(graph.dependencies("b"), Some(&set(&["a"])));
}

#[test]
fn strict_mode_rejects_cycles_with_the_offending_path() {
    init_tracing();
    let loader = InMemoryLoader::new()
        .with(TargetBuilder::binary("app").dep("a"))
        .with(TargetBuilder::library("a").dep("b"))
        .with(TargetBuilder::library("b").dep("a"));
    let mut graph = DependencyGraph::new().with_cycle_rejection(true);

    let err = graph.add_top_level_target("app", &loader).unwrap_err();
    match err {
        WavebuildError::DependencyCycle(path) => assert_eq!(path, "a -> b -> a"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(graph.tracked_targets().is_empty());
    assert!(!graph.is_active("app"));
}

#[test]
fn strict_mode_rejects_cycle_introduced_by_refresh() {
    init_tracing();
    let loader = InMemoryLoader::new()
        .with(TargetBuilder::library("a").dep("b"))
        .with(TargetBuilder::library("b"));
    let mut graph = DependencyGraph::new().with_cycle_rejection(true);
    graph.add_top_level_target("a", &loader).unwrap();

    loader.insert(TargetBuilder::library("b").dep("a"));
    let err = graph.refresh_target("b", &loader).unwrap_err();

    assert!(matches!(err, WavebuildError::DependencyCycle(_)));
    assert!(graph.dependencies("b").is_some_and(|d| d.is_empty()));
}

#[test]
fn events_are_ordered_tracked_untracked_refreshed() {
    init_tracing();
    let loader = InMemoryLoader::new()
        .with(TargetBuilder::binary("top").dep("x"))
        .with(TargetBuilder::library("x").dep("old"))
        .with(TargetBuilder::library("old"))
        .with(TargetBuilder::library("new"));
    let mut graph = DependencyGraph::new();
    graph.add_top_level_target("top", &loader).unwrap();

    loader.insert(TargetBuilder::library("x").dep("new"));
    let events = graph.refresh_target("x", &loader).unwrap().events();

    assert_eq!(
        events,
        vec![
            GraphEvent::Tracked("new".into()),
            GraphEvent::Untracked("old".into()),
            GraphEvent::Refreshed("top".into()),
            GraphEvent::Refreshed("x".into()),
        ]
    );
}

#[test]
fn closures_work_as_resolvers() {
    init_tracing();
    let resolver = |name: &str| -> wavebuild::errors::Result<BTreeSet<String>> {
        match name {
            "a" => Ok(set(&["b"])),
            "b" => Ok(BTreeSet::new()),
            other => Err(WavebuildError::TargetNotFound(other.to_string())),
        }
    };
    let mut graph = DependencyGraph::new();

    graph.add_top_level_target("a", &resolver).unwrap();
    assert_eq!(graph.ancestors("b"), set(&["a", "b"]));
}
