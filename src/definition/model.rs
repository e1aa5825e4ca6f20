// src/definition/model.rs

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;

use crate::types::{BuildMode, TargetName, definition_dirs, join_rel, split_target_name};

/// One definition file as read from disk.
///
/// ```toml
/// [default]
/// cflags = ["-O2"]
///
/// [target.strings]
/// kind = "cpp_library"
/// sources = ["strings/*.cc"]
/// deps = ["base/log"]
///
/// [target.app]
/// kind = "cpp_binary"
/// deps = ["lib/strings"]
/// binary_name = "app"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DefinitionFile {
    /// Flags inherited by every C++ target at or below this directory.
    #[serde(default)]
    pub default: DefaultSection,

    /// Declarations keyed by local target name.
    #[serde(default)]
    pub target: BTreeMap<String, Declaration>,
}

/// `[default]` section. Layered outer-to-inner: inner lists are appended.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DefaultSection {
    #[serde(default)]
    pub cflags: Vec<String>,

    #[serde(default)]
    pub lflags: Vec<String>,

    #[serde(default)]
    pub pkg_config: Vec<String>,
}

impl DefaultSection {
    pub fn extend(&mut self, inner: &DefaultSection) {
        self.cflags.extend(inner.cflags.iter().cloned());
        self.lflags.extend(inner.lflags.iter().cloned());
        self.pkg_config.extend(inner.pkg_config.iter().cloned());
    }
}

/// A tagged target record (`kind = "..."`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Declaration {
    CppLibrary(CppLibraryDecl),
    CppBinary(CppBinaryDecl),
    Command(CommandDecl),
}

/// `kind = "cpp_library"`: compile sources and archive them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CppLibraryDecl {
    /// Source globs relative to the target's directory. `None` means the
    /// `<name>.cc` convention.
    #[serde(default)]
    pub sources: Option<Vec<String>>,

    #[serde(default)]
    pub deps: Vec<TargetName>,

    #[serde(default)]
    pub cflags: Vec<String>,

    #[serde(default)]
    pub lflags: Vec<String>,

    #[serde(default)]
    pub pkg_config: Vec<String>,

    /// Extra watched globs (headers etc.), relative to the target's directory.
    #[serde(default)]
    pub watch: Vec<String>,
}

/// `kind = "cpp_binary"`: link the archives of all transitive dependencies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CppBinaryDecl {
    #[serde(default)]
    pub deps: Vec<TargetName>,

    #[serde(default)]
    pub lflags: Vec<String>,

    #[serde(default)]
    pub pkg_config: Vec<String>,

    /// Symlink the linked binary under the project's bin directory.
    #[serde(default)]
    pub binary_name: Option<String>,

    #[serde(default)]
    pub watch: Vec<String>,
}

/// `kind = "command"`: run a shell command in the target's directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CommandDecl {
    pub cmd: String,

    #[serde(default)]
    pub deps: Vec<TargetName>,

    #[serde(default)]
    pub watch: Vec<String>,
}

impl Declaration {
    pub fn mode(&self) -> BuildMode {
        match self {
            Declaration::CppLibrary(_) => BuildMode::CppLibrary,
            Declaration::CppBinary(_) => BuildMode::CppBinary,
            Declaration::Command(_) => BuildMode::Command,
        }
    }

    pub fn deps(&self) -> &[TargetName] {
        match self {
            Declaration::CppLibrary(d) => &d.deps,
            Declaration::CppBinary(d) => &d.deps,
            Declaration::Command(d) => &d.deps,
        }
    }

    /// Apply layered `[default]` flags: defaults come first so that the
    /// target's own flags win where the toolchain honours the last value.
    pub fn with_defaults(self, defaults: &DefaultSection) -> Self {
        fn prepend(defaults: &[String], own: Vec<String>) -> Vec<String> {
            defaults.iter().cloned().chain(own).collect()
        }

        match self {
            Declaration::CppLibrary(d) => Declaration::CppLibrary(CppLibraryDecl {
                cflags: prepend(&defaults.cflags, d.cflags),
                lflags: prepend(&defaults.lflags, d.lflags),
                pkg_config: prepend(&defaults.pkg_config, d.pkg_config),
                ..d
            }),
            Declaration::CppBinary(d) => Declaration::CppBinary(CppBinaryDecl {
                lflags: prepend(&defaults.lflags, d.lflags),
                pkg_config: prepend(&defaults.pkg_config, d.pkg_config),
                ..d
            }),
            command @ Declaration::Command(_) => command,
        }
    }
}

/// A loaded, immutable target: its name plus its effective declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    name: TargetName,
    declaration: Declaration,
}

impl Target {
    pub fn new(name: impl Into<TargetName>, declaration: Declaration) -> Self {
        Self {
            name: name.into(),
            declaration,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Root-relative directory of the target (`""` at the root).
    pub fn dir(&self) -> &str {
        split_target_name(&self.name).0
    }

    pub fn local_name(&self) -> &str {
        split_target_name(&self.name).1
    }

    pub fn mode(&self) -> BuildMode {
        self.declaration.mode()
    }

    pub fn declaration(&self) -> &Declaration {
        &self.declaration
    }

    pub fn deps(&self) -> &[TargetName] {
        self.declaration.deps()
    }

    pub fn dependency_set(&self) -> BTreeSet<TargetName> {
        self.deps().iter().cloned().collect()
    }

    /// Root-relative globs whose changes invalidate this target.
    ///
    /// A binary compiles nothing itself, so it only watches its declared
    /// `watch` globs; its code lives in the libraries it links.
    pub fn watch_globs(&self) -> Vec<String> {
        let relative: Vec<String> = match &self.declaration {
            Declaration::CppLibrary(d) => d
                .sources
                .clone()
                .unwrap_or_else(|| vec![format!("{}.*", self.local_name())])
                .into_iter()
                .chain(d.watch.iter().cloned())
                .collect(),
            Declaration::CppBinary(d) => d.watch.clone(),
            Declaration::Command(d) => d.watch.clone(),
        };

        relative.iter().map(|rel| join_rel(self.dir(), rel)).collect()
    }

    /// Directories whose definition file can change this target.
    pub fn definition_dirs(&self) -> Vec<String> {
        definition_dirs(&self.name)
    }
}
