//! Name-to-type bindings visible at a point of an activity graph.

use std::sync::Arc;

use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use smol_str::SmolStr;

use crate::types::TypeId;

/// A read-only chain of scopes. Inner scopes shadow outer ones.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    bindings: IndexMap<SmolStr, TypeId>,
    parent: Option<Arc<Environment>>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty scope nested inside `parent`.
    pub fn child_of(parent: Arc<Environment>) -> Self {
        Self {
            bindings: IndexMap::new(),
            parent: Some(parent),
        }
    }

    pub fn bind(mut self, name: impl Into<SmolStr>, ty: TypeId) -> Self {
        self.insert(name, ty);
        self
    }

    pub fn insert(&mut self, name: impl Into<SmolStr>, ty: TypeId) {
        self.bindings.insert(name.into(), ty);
    }

    pub fn parent(&self) -> Option<&Environment> {
        self.parent.as_deref()
    }

    pub fn lookup(&self, name: &str) -> Option<TypeId> {
        self.bindings
            .get(name)
            .copied()
            .or_else(|| self.parent.as_ref().and_then(|p| p.lookup(name)))
    }

    /// Every visible binding once, innermost scope first.
    pub fn visible_bindings(&self) -> Vec<(SmolStr, TypeId)> {
        let mut seen = FxHashSet::default();
        let mut visible = Vec::new();
        let mut scope = Some(self);
        while let Some(current) = scope {
            for (name, ty) in &current.bindings {
                if seen.insert(name.clone()) {
                    visible.push((name.clone(), *ty));
                }
            }
            scope = current.parent();
        }
        visible
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty() && self.parent.as_ref().is_none_or(|p| p.is_empty())
    }
}
