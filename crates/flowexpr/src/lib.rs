//! Expression recompilation and import-closure engine for workflow activity graphs.
//!
//! Authors write expressions as text in a declared language. This crate drives a
//! pluggable compiler backend over that text and turns the typed result into a
//! graph node, in either value mode or reference (assignable location) mode:
//!
//! - [`Recompiler`] orchestrates inference and targeted compilation, checks the
//!   location post-condition in reference mode and classifies failures;
//! - [`collect_type_references`] computes the type closure a persisted definition
//!   needs, expanding base chains and interfaces and filtering default assemblies;
//! - [`ImportSettings`] turns that closure into ordered `(assembly, namespace)` records;
//! - [`FactoryRegistry`] resolves the node factory for a result type.
//!
//! Failures caused by the expression text are captured in
//! [`RecompileOutcome::CompileFailed`]; everything else is a [`RecompileError`].
//!
//! ```text
//! let recompiler = Recompiler::new(compiler, universe, &EngineConfig::default());
//! let env = Environment::new().bind("customer", customer);
//! let outcome = recompiler.recompile(&RecompileRequest::value(
//!     ExpressionText::new("customer.Age + 1", "Lite"),
//!     &env,
//! ))?;
//! ```

// Suppress false-positive warnings for fields used in thiserror/miette macros
#![allow(unused_assignments)]

pub mod activity;
pub mod backend;
pub mod closure;
pub mod config;
pub mod environment;
pub mod error;
pub mod expr;
pub mod imports;
pub mod location;
pub mod materialize;
pub mod recompile;
pub mod types;

pub use activity::{Activity, ActivityScope, AssemblyReference, ExpressionActivity, ExpressionKind, TextExpression};
pub use backend::{BackendError, CompileSession, DispatchError, ExpressionCompiler};
pub use closure::{TypeReferenceCollector, collect_type_references};
pub use config::{BUILTIN_DEFAULT_ASSEMBLIES, ConfigError, DefaultAssemblies, EngineConfig};
pub use environment::Environment;
pub use error::{RecompileError, Result, SourceDiagnostic};
pub use expr::{CompiledExpression, Expr};
pub use imports::{ImportHints, ImportRecord, ImportSettings};
pub use location::{LocationCheck, check_location};
pub use materialize::{ExpressionFactory, FactoryRegistry, TextExpressionFactory, materialize};
pub use recompile::{ExpressionText, RecompileOutcome, RecompileRequest, Recompiler};
pub use types::{AssemblyId, AssemblyName, CORE_ASSEMBLY, TypeDef, TypeId, TypeUniverse};
