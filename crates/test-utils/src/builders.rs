#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use wavebuild::definition::{
    CommandDecl, CppBinaryDecl, CppLibraryDecl, Declaration, Target, TargetLoader,
};
use wavebuild::errors::{Result, WavebuildError};
use wavebuild::graph::TargetResolver;
use wavebuild::types::TargetName;

/// Builder for `Target` to simplify test setup.
pub struct TargetBuilder {
    name: String,
    declaration: Declaration,
}

impl TargetBuilder {
    pub fn library(name: &str) -> Self {
        Self {
            name: name.to_string(),
            declaration: Declaration::CppLibrary(CppLibraryDecl::default()),
        }
    }

    pub fn binary(name: &str) -> Self {
        Self {
            name: name.to_string(),
            declaration: Declaration::CppBinary(CppBinaryDecl::default()),
        }
    }

    pub fn command(name: &str, cmd: &str) -> Self {
        Self {
            name: name.to_string(),
            declaration: Declaration::Command(CommandDecl {
                cmd: cmd.to_string(),
                ..CommandDecl::default()
            }),
        }
    }

    pub fn dep(mut self, dep: &str) -> Self {
        let deps = match &mut self.declaration {
            Declaration::CppLibrary(d) => &mut d.deps,
            Declaration::CppBinary(d) => &mut d.deps,
            Declaration::Command(d) => &mut d.deps,
        };
        deps.push(dep.to_string());
        self
    }

    pub fn deps(self, deps: &[&str]) -> Self {
        deps.iter().fold(self, |b, d| b.dep(d))
    }

    /// Source globs; only meaningful for libraries.
    pub fn sources(mut self, patterns: &[&str]) -> Self {
        if let Declaration::CppLibrary(d) = &mut self.declaration {
            d.sources = Some(patterns.iter().map(|p| p.to_string()).collect());
        }
        self
    }

    pub fn watch(mut self, pattern: &str) -> Self {
        let watch = match &mut self.declaration {
            Declaration::CppLibrary(d) => &mut d.watch,
            Declaration::CppBinary(d) => &mut d.watch,
            Declaration::Command(d) => &mut d.watch,
        };
        watch.push(pattern.to_string());
        self
    }

    pub fn build(self) -> Target {
        Target::new(self.name, self.declaration)
    }
}

/// `TargetLoader` over a mutable in-memory table.
///
/// Replacing a declaration and then refreshing the target is how tests
/// simulate an edited definition file.
#[derive(Default)]
pub struct InMemoryLoader {
    targets: Mutex<BTreeMap<TargetName, Target>>,
    loads: Mutex<BTreeMap<TargetName, usize>>,
}

impl InMemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, target: TargetBuilder) -> Self {
        self.insert(target);
        self
    }

    pub fn insert(&self, target: TargetBuilder) {
        let target = target.build();
        self.targets
            .lock()
            .unwrap()
            .insert(target.name().to_string(), target);
    }

    pub fn remove(&self, name: &str) {
        self.targets.lock().unwrap().remove(name);
    }

    /// How many times `name` was loaded.
    pub fn load_count(&self, name: &str) -> usize {
        self.loads.lock().unwrap().get(name).copied().unwrap_or(0)
    }

    /// Names reachable from `root` in the declared tables.
    pub fn closure(&self, root: &str) -> BTreeSet<TargetName> {
        let targets = self.targets.lock().unwrap();
        let mut seen = BTreeSet::new();
        let mut stack = vec![root.to_string()];
        while let Some(name) = stack.pop() {
            if !seen.insert(name.clone()) {
                continue;
            }
            if let Some(t) = targets.get(&name) {
                stack.extend(t.deps().iter().cloned());
            }
        }
        seen
    }
}

impl TargetLoader for InMemoryLoader {
    fn load_target(&self, name: &str) -> Result<Target> {
        *self.loads.lock().unwrap().entry(name.to_string()).or_default() += 1;
        self.targets
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| WavebuildError::TargetNotFound(name.to_string()))
    }
}

impl TargetResolver for InMemoryLoader {
    fn dependencies(&self, name: &str) -> Result<BTreeSet<TargetName>> {
        Ok(self.load_target(name)?.dependency_set())
    }
}
