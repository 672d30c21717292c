//! Type-specialised construction of graph nodes from compiled expressions.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use crate::activity::{ExpressionActivity, ExpressionKind};
use crate::error::RecompileError;
use crate::types::{TypeId, TypeUniverse};

/// Builds value and reference nodes for one result type.
pub trait ExpressionFactory: Send + Sync {
    fn create_value(&self, expression_text: &str) -> Result<ExpressionActivity, RecompileError>;

    fn create_reference(&self, expression_text: &str) -> Result<ExpressionActivity, RecompileError>;
}

/// Produces text-expression nodes in one language, typed to `result_type`.
#[derive(Debug, Clone)]
pub struct TextExpressionFactory {
    result_type: TypeId,
    language: SmolStr,
}

impl TextExpressionFactory {
    pub fn new(result_type: TypeId, language: impl Into<SmolStr>) -> Self {
        Self {
            result_type,
            language: language.into(),
        }
    }
}

impl ExpressionFactory for TextExpressionFactory {
    fn create_value(&self, expression_text: &str) -> Result<ExpressionActivity, RecompileError> {
        Ok(ExpressionActivity::new(
            ExpressionKind::Value,
            self.result_type,
            &self.language,
            expression_text,
        ))
    }

    fn create_reference(&self, expression_text: &str) -> Result<ExpressionActivity, RecompileError> {
        Ok(ExpressionActivity::new(
            ExpressionKind::Reference,
            self.result_type,
            &self.language,
            expression_text,
        ))
    }
}

pub type FactoryConstructor =
    Arc<dyn Fn(TypeId, &TypeUniverse) -> Option<Arc<dyn ExpressionFactory>> + Send + Sync>;

/// Resolves the factory for a result type.
///
/// Explicit registrations win. Otherwise the family constructor runs once per
/// type and its result is cached; a type it refuses is never cached.
#[derive(Clone)]
pub struct FactoryRegistry {
    explicit: FxHashMap<TypeId, Arc<dyn ExpressionFactory>>,
    family: FactoryConstructor,
    cache: Arc<DashMap<TypeId, Arc<dyn ExpressionFactory>>>,
}

impl fmt::Debug for FactoryRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryRegistry")
            .field("explicit", &self.explicit.len())
            .field("cached", &self.cache.len())
            .finish()
    }
}

impl FactoryRegistry {
    /// Registry whose family constructor builds [`TextExpressionFactory`]s for `language`.
    pub fn text(language: impl Into<SmolStr>) -> Self {
        let language = language.into();
        Self::with_family(Arc::new(move |ty, universe: &TypeUniverse| {
            if universe.contains_generic_parameters(ty) {
                return None;
            }
            let factory: Arc<dyn ExpressionFactory> = Arc::new(TextExpressionFactory::new(ty, language.clone()));
            Some(factory)
        }))
    }

    pub fn with_family(family: FactoryConstructor) -> Self {
        Self {
            explicit: FxHashMap::default(),
            family,
            cache: Arc::new(DashMap::new()),
        }
    }

    pub fn register(&mut self, ty: TypeId, factory: Arc<dyn ExpressionFactory>) {
        self.explicit.insert(ty, factory);
    }

    pub fn resolve(
        &self,
        ty: TypeId,
        universe: &TypeUniverse,
    ) -> Result<Arc<dyn ExpressionFactory>, RecompileError> {
        if universe.get(ty).is_none() {
            return Err(RecompileError::UnknownType);
        }
        if let Some(factory) = self.explicit.get(&ty) {
            return Ok(Arc::clone(factory));
        }
        if let Some(factory) = self.cache.get(&ty) {
            return Ok(Arc::clone(factory.value()));
        }

        let factory = (self.family)(ty, universe).ok_or_else(|| RecompileError::FactoryUnavailable {
            type_name: universe.full_name(ty),
        })?;
        tracing::trace!(ty = %universe.full_name(ty), "caching expression factory");
        Ok(Arc::clone(self.cache.entry(ty).or_insert(factory).value()))
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }
}

/// Builds the node for `expression_text`, specialised to `resolved_type`.
pub fn materialize(
    registry: &FactoryRegistry,
    universe: &TypeUniverse,
    resolved_type: TypeId,
    kind: ExpressionKind,
    expression_text: &str,
) -> Result<ExpressionActivity, RecompileError> {
    let factory = registry.resolve(resolved_type, universe)?;
    let activity = match kind {
        ExpressionKind::Value => factory.create_value(expression_text)?,
        ExpressionKind::Reference => factory.create_reference(expression_text)?,
    };

    if activity.result_type != resolved_type || activity.kind != kind {
        return Err(RecompileError::FactoryFailed {
            type_name: universe.full_name(resolved_type),
            reason: format!(
                "factory produced a {:?} node of type `{}`",
                activity.kind,
                universe.full_name(activity.result_type)
            ),
        });
    }
    Ok(activity)
}
