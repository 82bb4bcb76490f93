use std::sync::Arc;

use crate::di::{ContextId, Instance, ProviderDef, Token, WrapperId};
use crate::error::{KeystoneError, Result};
use crate::module::ModuleNode;

/// A guard, pipe, interceptor, filter or middleware attached somewhere.
///
/// Either a ready instance or a class the container builds (and may scope).
pub enum Enhancer<T: ?Sized> {
    Instance(Arc<T>),
    Class(ProviderDef),
}

impl<T: ?Sized> Clone for Enhancer<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Instance(instance) => Self::Instance(instance.clone()),
            Self::Class(provider) => Self::Class(provider.clone()),
        }
    }
}

impl<T: ?Sized + Send + Sync + 'static> Enhancer<T> {
    pub fn from_arc(instance: Arc<T>) -> Self {
        Self::Instance(instance)
    }

    pub fn provider(&self) -> Option<&ProviderDef> {
        match self {
            Self::Instance(_) => None,
            Self::Class(provider) => Some(provider),
        }
    }

    /// Registers this enhancer as a provider under `token`, e.g. `APP_GUARD`.
    pub fn into_provider(self, token: impl Into<Token>) -> ProviderDef {
        match self {
            Self::Instance(instance) => ProviderDef::instance(token, Instance::from_dyn(instance)),
            Self::Class(provider) => provider.with_token(token),
        }
    }

    pub(crate) fn resolve(
        &self,
        module: &ModuleNode,
        context: ContextId,
        inquirer: Option<WrapperId>,
    ) -> Result<Arc<T>> {
        match self {
            Self::Instance(instance) => Ok(instance.clone()),
            Self::Class(provider) => module
                .injectables()
                .get(provider.token())
                .and_then(|wrapper| wrapper.instance_by_context(context, inquirer))
                .and_then(|instance| instance.downcast_dyn::<T>())
                .ok_or_else(|| KeystoneError::UnavailableEnhancer {
                    name: provider.name().to_string(),
                    module: module.name().to_string(),
                }),
        }
    }
}

pub(crate) fn resolve_enhancers<T: ?Sized + Send + Sync + 'static>(
    enhancers: &[Enhancer<T>],
    module: &ModuleNode,
    context: ContextId,
    inquirer: Option<WrapperId>,
) -> Result<Vec<Arc<T>>> {
    enhancers
        .iter()
        .map(|enhancer| enhancer.resolve(module, context, inquirer))
        .collect()
}
