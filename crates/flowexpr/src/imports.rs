//! Import hints fed to a compilation, and import records derived from a type closure.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::types::{AssemblyName, TypeId, TypeUniverse};

/// Namespaces and assemblies supplied as compilation context.
///
/// Duplicates collapse and `None`/empty entries are ignored. Insertion order is kept
/// so that backends see hints in a deterministic order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportHints {
    namespaces: IndexSet<SmolStr>,
    assemblies: IndexSet<AssemblyName>,
}

impl ImportHints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_lists<N, A, S, T>(namespaces: N, assemblies: A) -> Self
    where
        N: IntoIterator<Item = Option<S>>,
        A: IntoIterator<Item = Option<T>>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        let mut hints = Self::new();
        for namespace in namespaces.into_iter().flatten() {
            hints.add_namespace(namespace.as_ref());
        }
        for assembly in assemblies.into_iter().flatten() {
            hints.add_assembly(assembly.as_ref());
        }
        hints
    }

    pub fn add_namespace(&mut self, namespace: &str) {
        let namespace = namespace.trim();
        if !namespace.is_empty() {
            self.namespaces.insert(SmolStr::new(namespace));
        }
    }

    /// Adds an assembly given in display form. Unparseable names are ignored.
    pub fn add_assembly(&mut self, full_name: &str) {
        if let Some(name) = AssemblyName::parse(full_name) {
            self.assemblies.insert(name);
        }
    }

    pub fn with_namespace(mut self, namespace: &str) -> Self {
        self.add_namespace(namespace);
        self
    }

    pub fn with_assembly(mut self, full_name: &str) -> Self {
        self.add_assembly(full_name);
        self
    }

    pub fn namespaces(&self) -> &IndexSet<SmolStr> {
        &self.namespaces
    }

    pub fn assemblies(&self) -> &IndexSet<AssemblyName> {
        &self.assemblies
    }

    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty() && self.assemblies.is_empty()
    }
}

/// One persisted import: an assembly and a namespace to bring into scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImportRecord {
    pub assembly: SmolStr,
    #[serde(rename = "import", default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<SmolStr>,
}

impl ImportRecord {
    pub fn new(assembly: impl Into<SmolStr>, namespace: Option<&str>) -> Self {
        Self {
            assembly: assembly.into(),
            namespace: namespace.map(SmolStr::new),
        }
    }
}

/// Ordered, deduplicated import records attached to a persisted definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSettings {
    #[serde(rename = "import-references")]
    imports: IndexSet<ImportRecord>,
}

impl ImportSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps each type to `(defining assembly, namespace)`, in iteration order,
    /// skipping types defined in dynamic assemblies.
    pub fn from_types<'a>(types: impl IntoIterator<Item = &'a TypeId>, universe: &TypeUniverse) -> Self {
        let mut settings = Self::new();
        for ty in types {
            let (Some(info), Some(assembly)) = (universe.get(*ty), universe.assembly_of(*ty)) else {
                continue;
            };
            if assembly.is_dynamic {
                tracing::trace!(ty = %universe.full_name(*ty), "skipping type from dynamic assembly");
                continue;
            }
            settings.insert(ImportRecord::new(
                assembly.name.name.clone(),
                info.namespace.as_deref(),
            ));
        }
        settings
    }

    /// Returns `false` when an equal record is already present.
    pub fn insert(&mut self, record: ImportRecord) -> bool {
        self.imports.insert(record)
    }

    pub fn records(&self) -> impl Iterator<Item = &ImportRecord> {
        self.imports.iter()
    }

    pub fn contains(&self, record: &ImportRecord) -> bool {
        self.imports.contains(record)
    }

    pub fn len(&self) -> usize {
        self.imports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.imports.is_empty()
    }
}
