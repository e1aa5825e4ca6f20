// src/engine/session.rs

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::definition::{Target, TargetLoader};
use crate::errors::Result;
use crate::graph::TargetResolver;
use crate::types::TargetName;

/// Memoising view of a [`TargetLoader`] for one locked manager operation.
///
/// Graph discovery resolves a target's dependencies and the manager then
/// needs the full declaration of the same target; the session makes sure
/// both see the same load and that each definition is read once.
pub struct Session<'a> {
    loader: &'a dyn TargetLoader,
    loaded: RefCell<HashMap<TargetName, Arc<Target>>>,
}

impl<'a> Session<'a> {
    pub fn new(loader: &'a dyn TargetLoader) -> Self {
        Self {
            loader,
            loaded: RefCell::new(HashMap::new()),
        }
    }

    pub fn load(&self, name: &str) -> Result<Arc<Target>> {
        if let Some(target) = self.loaded.borrow().get(name) {
            return Ok(Arc::clone(target));
        }

        let target = Arc::new(self.loader.load_target(name)?);
        self.loaded
            .borrow_mut()
            .insert(name.to_string(), Arc::clone(&target));
        Ok(target)
    }
}

impl TargetResolver for Session<'_> {
    fn dependencies(&self, name: &str) -> Result<BTreeSet<TargetName>> {
        Ok(self.load(name)?.dependency_set())
    }
}
