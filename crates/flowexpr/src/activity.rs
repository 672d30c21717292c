//! Graph nodes produced by recompilation, and the view the recompiler needs of
//! nodes already placed in a graph.

use std::sync::Arc;

use smol_str::SmolStr;

use crate::environment::Environment;
use crate::types::{AssemblyId, AssemblyName, TypeId, TypeUniverse};

/// An assembly reference declared on a node: either by name or as a loaded assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssemblyReference {
    Named(AssemblyName),
    Loaded(AssemblyId),
}

impl AssemblyReference {
    /// Display name handed to a compiler backend, if the reference can be resolved.
    pub fn full_name(&self, universe: &TypeUniverse) -> Option<String> {
        match self {
            AssemblyReference::Named(name) => Some(name.full_name()),
            AssemblyReference::Loaded(id) => universe.assembly(*id).map(|a| a.name.full_name()),
        }
    }
}

/// A node placed in an activity graph.
pub trait Activity {
    /// Bindings visible to the node.
    fn public_environment(&self) -> Arc<Environment>;

    /// Namespaces declared as visible to the node.
    fn import_namespaces(&self) -> Vec<SmolStr>;

    /// Assemblies declared as visible to the node.
    fn import_assemblies(&self) -> Vec<AssemblyReference>;
}

/// A node whose behaviour is given by expression text.
pub trait TextExpression: Activity {
    fn language(&self) -> &str;

    fn expression_text(&self) -> &str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpressionKind {
    /// Produces a value.
    Value,
    /// Produces an assignable location.
    Reference,
}

/// Where a node sits: its environment and the imports declared for it.
#[derive(Debug, Clone, Default)]
pub struct ActivityScope {
    pub environment: Arc<Environment>,
    pub namespaces: Vec<SmolStr>,
    pub assemblies: Vec<AssemblyReference>,
}

impl ActivityScope {
    pub fn new(environment: Arc<Environment>) -> Self {
        Self {
            environment,
            ..Default::default()
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<SmolStr>) -> Self {
        self.namespaces.push(namespace.into());
        self
    }

    pub fn with_assembly(mut self, assembly: AssemblyReference) -> Self {
        self.assemblies.push(assembly);
        self
    }
}

impl Activity for ActivityScope {
    fn public_environment(&self) -> Arc<Environment> {
        Arc::clone(&self.environment)
    }

    fn import_namespaces(&self) -> Vec<SmolStr> {
        self.namespaces.clone()
    }

    fn import_assemblies(&self) -> Vec<AssemblyReference> {
        self.assemblies.clone()
    }
}

/// A text-expression node typed to `result_type`.
#[derive(Debug, Clone)]
pub struct ExpressionActivity {
    pub kind: ExpressionKind,
    pub result_type: TypeId,
    pub language: SmolStr,
    pub expression_text: String,
    pub scope: Option<ActivityScope>,
}

impl ExpressionActivity {
    pub fn new(kind: ExpressionKind, result_type: TypeId, language: &str, expression_text: &str) -> Self {
        Self {
            kind,
            result_type,
            language: SmolStr::new(language),
            expression_text: expression_text.to_string(),
            scope: None,
        }
    }

    /// Places the node in a graph.
    pub fn placed(mut self, scope: ActivityScope) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn is_reference(&self) -> bool {
        self.kind == ExpressionKind::Reference
    }
}

impl Activity for ExpressionActivity {
    fn public_environment(&self) -> Arc<Environment> {
        self.scope
            .as_ref()
            .map(Activity::public_environment)
            .unwrap_or_default()
    }

    fn import_namespaces(&self) -> Vec<SmolStr> {
        self.scope.as_ref().map(Activity::import_namespaces).unwrap_or_default()
    }

    fn import_assemblies(&self) -> Vec<AssemblyReference> {
        self.scope.as_ref().map(Activity::import_assemblies).unwrap_or_default()
    }
}

impl TextExpression for ExpressionActivity {
    fn language(&self) -> &str {
        &self.language
    }

    fn expression_text(&self) -> &str {
        &self.expression_text
    }
}
