// src/graph/resolver.rs

use std::collections::BTreeSet;

use crate::errors::Result;
use crate::types::TargetName;

/// Source of declared dependencies for the graph.
///
/// Production code resolves through the definition loader; tests usually
/// pass a closure or an in-memory map. Failing to locate the target must
/// return [`crate::errors::WavebuildError::TargetNotFound`].
pub trait TargetResolver {
    fn dependencies(&self, name: &str) -> Result<BTreeSet<TargetName>>;
}

impl<F> TargetResolver for F
where
    F: Fn(&str) -> Result<BTreeSet<TargetName>>,
{
    fn dependencies(&self, name: &str) -> Result<BTreeSet<TargetName>> {
        self(name)
    }
}
