//! Recompilation of expression text into typed graph nodes.

use std::sync::Arc;

use rustc_hash::FxHashSet;
use smol_str::SmolStr;
use tracing::{debug, warn};

use crate::activity::{Activity, ExpressionActivity, ExpressionKind, TextExpression};
use crate::backend::{BackendError, CompileSession, DispatchError, ExpressionCompiler};
use crate::closure::collect_type_references;
use crate::config::{DefaultAssemblies, EngineConfig};
use crate::environment::Environment;
use crate::error::{RecompileError, Result, SourceDiagnostic};
use crate::imports::{ImportHints, ImportSettings};
use crate::location::{LocationCheck, check_location};
use crate::materialize::{FactoryRegistry, materialize};
use crate::types::{TypeId, TypeUniverse};

/// Source text together with the language it is written in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExpressionText {
    pub text: String,
    pub language: SmolStr,
}

impl ExpressionText {
    pub fn new(text: impl Into<String>, language: impl Into<SmolStr>) -> Self {
        Self {
            text: text.into(),
            language: language.into(),
        }
    }
}

/// One recompilation: text, scope, hints, mode and optional target type.
#[derive(Debug, Clone)]
pub struct RecompileRequest<'a> {
    pub expression: ExpressionText,
    pub environment: &'a Environment,
    pub hints: ImportHints,
    pub kind: ExpressionKind,
    pub target: Option<TypeId>,
}

impl<'a> RecompileRequest<'a> {
    pub fn value(expression: ExpressionText, environment: &'a Environment) -> Self {
        Self {
            expression,
            environment,
            hints: ImportHints::default(),
            kind: ExpressionKind::Value,
            target: None,
        }
    }

    pub fn reference(expression: ExpressionText, environment: &'a Environment) -> Self {
        Self {
            kind: ExpressionKind::Reference,
            ..Self::value(expression, environment)
        }
    }

    pub fn with_hints(mut self, hints: ImportHints) -> Self {
        self.hints = hints;
        self
    }

    pub fn with_target(mut self, target: Option<TypeId>) -> Self {
        self.target = target;
        self
    }
}

#[derive(Debug, Clone)]
pub enum RecompileOutcome {
    Compiled {
        resolved_type: TypeId,
        node: ExpressionActivity,
        imports: ImportSettings,
    },
    /// The text did not compile; `resolved_type` is the universal root type.
    CompileFailed {
        resolved_type: TypeId,
        diagnostic: SourceDiagnostic,
    },
}

impl RecompileOutcome {
    pub fn resolved_type(&self) -> TypeId {
        match self {
            RecompileOutcome::Compiled { resolved_type, .. }
            | RecompileOutcome::CompileFailed { resolved_type, .. } => *resolved_type,
        }
    }

    pub fn is_compiled(&self) -> bool {
        matches!(self, RecompileOutcome::Compiled { .. })
    }

    pub fn node(&self) -> Option<&ExpressionActivity> {
        match self {
            RecompileOutcome::Compiled { node, .. } => Some(node),
            RecompileOutcome::CompileFailed { .. } => None,
        }
    }

    pub fn imports(&self) -> Option<&ImportSettings> {
        match self {
            RecompileOutcome::Compiled { imports, .. } => Some(imports),
            RecompileOutcome::CompileFailed { .. } => None,
        }
    }

    pub fn diagnostic(&self) -> Option<&SourceDiagnostic> {
        match self {
            RecompileOutcome::CompileFailed { diagnostic, .. } => Some(diagnostic),
            RecompileOutcome::Compiled { .. } => None,
        }
    }
}

/// Drives one expression-language backend over a shared type universe.
#[derive(Debug)]
pub struct Recompiler<C> {
    compiler: C,
    universe: Arc<TypeUniverse>,
    defaults: DefaultAssemblies,
    factories: FactoryRegistry,
}

impl<C: ExpressionCompiler> Recompiler<C> {
    pub fn new(compiler: C, universe: Arc<TypeUniverse>, config: &EngineConfig) -> Self {
        let factories = FactoryRegistry::text(compiler.language());
        Self {
            compiler,
            universe,
            defaults: config.default_assemblies(),
            factories,
        }
    }

    pub fn with_defaults(mut self, defaults: DefaultAssemblies) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn with_factories(mut self, factories: FactoryRegistry) -> Self {
        self.factories = factories;
        self
    }

    pub fn language(&self) -> &str {
        self.compiler.language()
    }

    pub fn universe(&self) -> &TypeUniverse {
        &self.universe
    }

    pub fn defaults(&self) -> &DefaultAssemblies {
        &self.defaults
    }

    pub fn recompile(&self, request: &RecompileRequest<'_>) -> Result<RecompileOutcome> {
        let expression = &request.expression;
        if expression.language != self.compiler.language() {
            return Err(RecompileError::LanguageMismatch {
                expected: SmolStr::new(self.compiler.language()),
                found: expression.language.clone(),
            });
        }

        debug!(
            text = %expression.text,
            kind = ?request.kind,
            target = ?request.target.map(|t| self.universe.full_name(t)),
            "recompiling expression"
        );

        let assemblies: FxHashSet<_> = request.hints.assemblies().iter().cloned().collect();
        let namespaces: FxHashSet<_> = request.hints.namespaces().iter().cloned().collect();
        let session = self.compiler.session(&expression.text, &assemblies, &namespaces);

        let compiled = match request.target {
            None => session.compile_inferred(request.environment),
            Some(target) => session
                .compile_targeted(request.environment, target)
                .map_err(DispatchError::into_inner),
        };
        let compiled = match compiled {
            Ok(compiled) => compiled,
            Err(BackendError::Source(diagnostic)) => {
                debug!(message = %diagnostic.message, "expression failed to compile");
                return Ok(self.failed(diagnostic));
            }
            Err(BackendError::Internal(message)) => return Err(RecompileError::Backend(message)),
        };

        let resolved_type = match request.target {
            Some(target) if target != compiled.return_type => {
                return Err(RecompileError::Backend(format!(
                    "targeted compilation produced `{}` instead of `{}`",
                    self.universe.full_name(compiled.return_type),
                    self.universe.full_name(target)
                )));
            }
            Some(target) => target,
            None => compiled.return_type,
        };

        if request.kind == ExpressionKind::Reference
            && let LocationCheck::NotLocation(fragment) = check_location(&compiled.body, &self.universe)
        {
            let fragment = session.explain_non_location(&compiled).or(fragment);
            let diagnostic = SourceDiagnostic::invalid_location(&expression.text, fragment.as_deref());
            warn!(
                text = %expression.text,
                node = compiled.body.kind_name(),
                "expression is not an assignable location"
            );
            return Ok(self.failed(diagnostic));
        }

        let references = collect_type_references(&compiled.body, &self.universe, &self.defaults);
        let imports = ImportSettings::from_types(&references, &self.universe);
        let node = materialize(
            &self.factories,
            &self.universe,
            resolved_type,
            request.kind,
            &expression.text,
        )?;

        debug!(
            resolved_type = %self.universe.full_name(resolved_type),
            imports = imports.len(),
            "expression recompiled"
        );
        Ok(RecompileOutcome::Compiled {
            resolved_type,
            node,
            imports,
        })
    }

    /// Compiles `text` in this backend's language as a value node.
    pub fn create_precompiled_value<N, A, S, T>(
        &self,
        target: Option<TypeId>,
        text: &str,
        namespaces: N,
        assemblies: A,
        environment: &Environment,
    ) -> Result<RecompileOutcome>
    where
        N: IntoIterator<Item = Option<S>>,
        A: IntoIterator<Item = Option<T>>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        self.precompile(
            ExpressionKind::Value,
            target,
            text,
            ImportHints::from_lists(namespaces, assemblies),
            environment,
        )
    }

    /// Compiles `text` in this backend's language as a reference node.
    pub fn create_precompiled_reference<N, A, S, T>(
        &self,
        target: Option<TypeId>,
        text: &str,
        namespaces: N,
        assemblies: A,
        environment: &Environment,
    ) -> Result<RecompileOutcome>
    where
        N: IntoIterator<Item = Option<S>>,
        A: IntoIterator<Item = Option<T>>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        self.precompile(
            ExpressionKind::Reference,
            target,
            text,
            ImportHints::from_lists(namespaces, assemblies),
            environment,
        )
    }

    /// Like [`Self::create_precompiled_value`], with scope and imports read from `parent`.
    pub fn create_precompiled_value_in(
        &self,
        target: Option<TypeId>,
        text: &str,
        parent: &dyn Activity,
    ) -> Result<RecompileOutcome> {
        let environment = parent.public_environment();
        self.precompile(ExpressionKind::Value, target, text, self.hints_of(parent), &environment)
    }

    /// Like [`Self::create_precompiled_reference`], with scope and imports read from `parent`.
    pub fn create_precompiled_reference_in(
        &self,
        target: Option<TypeId>,
        text: &str,
        parent: &dyn Activity,
    ) -> Result<RecompileOutcome> {
        let environment = parent.public_environment();
        self.precompile(ExpressionKind::Reference, target, text, self.hints_of(parent), &environment)
    }

    /// Recompiles an existing expression node as a value, inferring its type.
    pub fn recompile_value(&self, expression: &dyn TextExpression) -> Result<RecompileOutcome> {
        self.recompile_node(expression, ExpressionKind::Value)
    }

    /// Recompiles an existing expression node as a reference, inferring its type.
    pub fn recompile_reference(&self, expression: &dyn TextExpression) -> Result<RecompileOutcome> {
        self.recompile_node(expression, ExpressionKind::Reference)
    }

    fn recompile_node(&self, expression: &dyn TextExpression, kind: ExpressionKind) -> Result<RecompileOutcome> {
        let environment = expression.public_environment();
        let request = RecompileRequest {
            expression: ExpressionText::new(expression.expression_text(), expression.language()),
            environment: &environment,
            hints: self.hints_of(expression),
            kind,
            target: None,
        };
        self.recompile(&request)
    }

    fn precompile(
        &self,
        kind: ExpressionKind,
        target: Option<TypeId>,
        text: &str,
        hints: ImportHints,
        environment: &Environment,
    ) -> Result<RecompileOutcome> {
        let request = RecompileRequest {
            expression: ExpressionText::new(text, self.compiler.language()),
            environment,
            hints,
            kind,
            target,
        };
        self.recompile(&request)
    }

    /// Imports declared on `node`, with assembly references resolved to full names.
    fn hints_of(&self, node: &(impl Activity + ?Sized)) -> ImportHints {
        let mut hints = ImportHints::new();
        for namespace in node.import_namespaces() {
            hints.add_namespace(&namespace);
        }
        for assembly in node.import_assemblies() {
            if let Some(full_name) = assembly.full_name(&self.universe) {
                hints.add_assembly(&full_name);
            }
        }
        hints
    }

    fn failed(&self, diagnostic: SourceDiagnostic) -> RecompileOutcome {
        RecompileOutcome::CompileFailed {
            resolved_type: self.universe.object(),
            diagnostic,
        }
    }
}
