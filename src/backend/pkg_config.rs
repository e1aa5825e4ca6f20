// src/backend/pkg_config.rs

use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, PoisonError};

use tracing::{debug, warn};

use crate::backend::process::run_process;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PkgFlags {
    Cflags,
    Libs,
}

impl PkgFlags {
    fn arg(self) -> &'static str {
        match self {
            PkgFlags::Cflags => "--cflags",
            PkgFlags::Libs => "--libs",
        }
    }
}

/// `pkg-config` front end memoising the flags per package set.
///
/// Shared between concurrently running backends.
#[derive(Debug)]
pub struct PkgConfig {
    program: String,
    cache: Mutex<HashMap<(Vec<String>, PkgFlags), Vec<String>>>,
}

impl PkgConfig {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Flags for `packages`. An empty set needs no tool run.
    ///
    /// A failing `pkg-config` is logged, yields no flags and is not cached;
    /// the compiler or linker then reports the missing package itself.
    pub fn flags<'a, I>(&self, packages: I, kind: PkgFlags) -> Vec<String>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let packages: Vec<String> = packages
            .into_iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if packages.is_empty() {
            return Vec::new();
        }

        let key = (packages, kind);
        if let Some(cached) = self.lock().get(&key) {
            debug!(packages = ?key.0, ?kind, "pkg-config flags from cache");
            return cached.clone();
        }

        let mut args = vec![kind.arg().to_string()];
        args.extend(key.0.iter().cloned());
        let flags: Vec<String> = match run_process(&self.program, &args, None) {
            Ok(out) if out.success => out.stdout.split_whitespace().map(str::to_string).collect(),
            Ok(out) => {
                warn!(packages = ?key.0, exit_code = out.exit_code, stderr = %out.stderr.trim_end(), "pkg-config failed");
                return Vec::new();
            }
            Err(err) => {
                warn!(packages = ?key.0, error = %err, "cannot run pkg-config");
                return Vec::new();
            }
        };

        self.lock().insert(key, flags.clone());
        flags
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<(Vec<String>, PkgFlags), Vec<String>>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
