// src/graph/cycle.rs

//! Cycle detection helpers.

use std::collections::{BTreeSet, HashMap};

use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;

use crate::types::TargetName;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

/// Depth-first search from `start` following `successors`; returns the first
/// cycle found as a closed path (`["a", "b", "a"]`).
///
/// `successors` returns `None` for names it knows nothing about; those are
/// treated as leaves.
pub fn find_cycle_from<'a, F>(start: &'a str, successors: F) -> Option<Vec<TargetName>>
where
    F: Fn(&str) -> Option<&'a BTreeSet<TargetName>>,
{
    let mut marks: HashMap<&'a str, Mark> = HashMap::new();
    // Explicit stack of (node, remaining successors) keeps deep chains off
    // the call stack.
    let mut path: Vec<&'a str> = vec![start];
    let mut stack: Vec<Vec<&'a str>> = vec![children(start, &successors)];
    marks.insert(start, Mark::InProgress);

    while let Some(pending) = stack.last_mut() {
        match pending.pop() {
            Some(next) => match marks.get(next) {
                Some(Mark::InProgress) => {
                    let begin = path.iter().position(|n| *n == next).unwrap_or(0);
                    let mut cycle: Vec<TargetName> =
                        path[begin..].iter().map(|s| s.to_string()).collect();
                    cycle.push(next.to_string());
                    return Some(cycle);
                }
                Some(Mark::Done) => {}
                None => {
                    marks.insert(next, Mark::InProgress);
                    path.push(next);
                    stack.push(children(next, &successors));
                }
            },
            None => {
                stack.pop();
                if let Some(done) = path.pop() {
                    marks.insert(done, Mark::Done);
                }
            }
        }
    }

    None
}

fn children<'a, F>(name: &str, successors: &F) -> Vec<&'a str>
where
    F: Fn(&str) -> Option<&'a BTreeSet<TargetName>>,
{
    successors(name)
        .map(|deps| deps.iter().rev().map(|d| d.as_str()).collect())
        .unwrap_or_default()
}

/// Strongly connected components of the subgraph induced by `names`, keeping
/// only real cycles (components with more than one member, or a self-loop).
pub fn cyclic_components<'a, F>(names: &'a BTreeSet<TargetName>, successors: F) -> Vec<Vec<TargetName>>
where
    F: Fn(&str) -> Option<&'a BTreeSet<TargetName>>,
{
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
    for name in names {
        graph.add_node(name.as_str());
    }
    for name in names {
        if let Some(deps) = successors(name) {
            for dep in deps.iter().filter(|d| names.contains(*d)) {
                graph.add_edge(name.as_str(), dep.as_str(), ());
            }
        }
    }

    let mut components: Vec<Vec<TargetName>> = tarjan_scc(&graph)
        .into_iter()
        .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
        .map(|scc| {
            let mut members: Vec<TargetName> = scc.into_iter().map(|s| s.to_string()).collect();
            members.sort();
            members
        })
        .collect();
    components.sort();
    components
}
