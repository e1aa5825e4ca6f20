// src/watch/registry.rs

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use tracing::{debug, trace, warn};

use crate::definition::Target;
use crate::errors::Result;
use crate::types::{TargetName, split_target_name};

/// Compile root- or directory-relative glob patterns.
///
/// `*` does not match `/`; `**` crosses directories.
pub fn compile_globs(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        builder.add(GlobBuilder::new(pat).literal_separator(true).build()?);
    }
    Ok(builder.build()?)
}

/// Targets invalidated by one batch of file events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Modifications {
    /// Targets whose definition file (or an ancestor's) changed.
    pub definitions_changed: BTreeSet<TargetName>,
    /// Targets with a changed watched source.
    pub targets_changed: BTreeSet<TargetName>,
}

impl Modifications {
    pub fn is_empty(&self) -> bool {
        self.definitions_changed.is_empty() && self.targets_changed.is_empty()
    }

    /// Union of both sets.
    pub fn all_targets(&self) -> BTreeSet<TargetName> {
        self.definitions_changed
            .union(&self.targets_changed)
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
struct Registration {
    globs: Vec<String>,
    prefixes: Vec<String>,
}

/// Path-to-target index.
///
/// - `by_glob`: root-relative glob → targets watching it.
/// - `by_prefix`: directory → targets whose declaration depends on that
///   directory's definition file.
///
/// The compiled glob set is rebuilt on every registration change, so
/// resolution only needs a shared borrow.
pub struct WatchRegistry {
    definition_filename: String,
    by_glob: BTreeMap<String, BTreeSet<TargetName>>,
    by_prefix: BTreeMap<String, BTreeSet<TargetName>>,
    registrations: BTreeMap<TargetName, Registration>,
    compiled: GlobSet,
    compiled_globs: Vec<String>,
}

impl fmt::Debug for WatchRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchRegistry")
            .field("definition_filename", &self.definition_filename)
            .field("by_glob", &self.by_glob)
            .field("by_prefix", &self.by_prefix)
            .finish_non_exhaustive()
    }
}

impl WatchRegistry {
    pub fn new(definition_filename: impl Into<String>) -> Self {
        Self {
            definition_filename: definition_filename.into(),
            by_glob: BTreeMap::new(),
            by_prefix: BTreeMap::new(),
            registrations: BTreeMap::new(),
            compiled: GlobSet::empty(),
            compiled_globs: Vec::new(),
        }
    }

    /// Register (or re-register) `name` with its watched globs and its
    /// definition prefixes. Invalid globs leave the registry unchanged.
    pub fn register(&mut self, name: &str, globs: Vec<String>, prefixes: Vec<String>) -> Result<()> {
        compile_globs(&globs)?;

        self.detach(name);
        for glob in &globs {
            self.by_glob
                .entry(glob.clone())
                .or_default()
                .insert(name.to_string());
        }
        for prefix in &prefixes {
            self.by_prefix
                .entry(prefix.clone())
                .or_default()
                .insert(name.to_string());
        }
        debug!(target = %name, ?globs, ?prefixes, "registered watch patterns");
        self.registrations
            .insert(name.to_string(), Registration { globs, prefixes });

        self.recompile()
    }

    /// Register a loaded target using its own globs and definition dirs.
    pub fn register_target(&mut self, target: &Target) -> Result<()> {
        self.register(target.name(), target.watch_globs(), target.definition_dirs())
    }

    pub fn unregister(&mut self, name: &str) {
        if self.detach(name) {
            debug!(target = %name, "unregistered watch patterns");
            // Removing globs cannot make the remaining set invalid.
            if let Err(err) = self.recompile() {
                warn!(error = %err, "cannot recompile watch globs");
            }
        }
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.registrations.contains_key(name)
    }

    /// Globs currently registered for `name`.
    pub fn globs_of(&self, name: &str) -> Option<&[String]> {
        self.registrations.get(name).map(|r| r.globs.as_slice())
    }

    /// Targets registered under a definition directory.
    pub fn targets_under(&self, dir: &str) -> Option<&BTreeSet<TargetName>> {
        self.by_prefix.get(dir)
    }

    /// Map root-relative changed paths to invalidated targets.
    ///
    /// A definition file invalidates every target registered under its
    /// directory; any other path is matched against every registered glob
    /// and all hits are recorded.
    pub fn resolve<'a, I>(&self, rel_paths: I) -> Modifications
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut mods = Modifications::default();

        for rel in rel_paths {
            let (dir, file) = split_target_name(rel);
            if file == self.definition_filename {
                if let Some(targets) = self.by_prefix.get(dir) {
                    trace!(path = %rel, ?targets, "definition file changed");
                    mods.definitions_changed.extend(targets.iter().cloned());
                }
                continue;
            }

            for idx in self.compiled.matches(rel) {
                if let Some(targets) = self
                    .compiled_globs
                    .get(idx)
                    .and_then(|glob| self.by_glob.get(glob))
                {
                    trace!(path = %rel, glob = %self.compiled_globs[idx], ?targets, "watched file changed");
                    mods.targets_changed.extend(targets.iter().cloned());
                }
            }
        }

        mods
    }

    fn detach(&mut self, name: &str) -> bool {
        let Some(old) = self.registrations.remove(name) else {
            return false;
        };
        for glob in &old.globs {
            remove_from(&mut self.by_glob, glob, name);
        }
        for prefix in &old.prefixes {
            remove_from(&mut self.by_prefix, prefix, name);
        }
        true
    }

    fn recompile(&mut self) -> Result<()> {
        let globs: Vec<String> = self.by_glob.keys().cloned().collect();
        self.compiled = compile_globs(&globs)?;
        self.compiled_globs = globs;
        Ok(())
    }
}

fn remove_from(map: &mut BTreeMap<String, BTreeSet<TargetName>>, key: &str, name: &str) {
    if let Some(names) = map.get_mut(key) {
        names.remove(name);
        if names.is_empty() {
            map.remove(key);
        }
    }
}
