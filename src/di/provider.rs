use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::di::{Injectable, Instance, Scope, Token};
use crate::error::{KeystoneError, Result};

pub type Factory = Arc<dyn Fn(Dependencies) -> BoxFuture<'static, Result<Instance>> + Send + Sync>;

/// A constructor argument of a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub token: Token,
    pub optional: bool,
}

impl Dependency {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::token(Token::of::<T>())
    }

    pub fn token(token: impl Into<Token>) -> Self {
        Self {
            token: token.into(),
            optional: false,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

/// Resolved constructor arguments handed to a factory.
pub struct Dependencies {
    owner: String,
    tokens: Vec<Token>,
    values: Vec<Option<Instance>>,
}

impl Dependencies {
    pub(crate) fn new(owner: String, tokens: Vec<Token>, values: Vec<Option<Instance>>) -> Self {
        Self {
            owner,
            tokens,
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn instance(&self, index: usize) -> Option<&Instance> {
        self.values.get(index).and_then(Option::as_ref)
    }

    pub fn get<T: Send + Sync + 'static>(&self, index: usize) -> Result<Arc<T>> {
        self.optional::<T>(index)?.ok_or_else(|| self.missing(index))
    }

    pub fn get_dyn<T: ?Sized + Send + Sync + 'static>(&self, index: usize) -> Result<Arc<T>> {
        self.optional_dyn::<T>(index)?
            .ok_or_else(|| self.missing(index))
    }

    /// `None` when an optional dependency could not be found.
    pub fn optional<T: Send + Sync + 'static>(&self, index: usize) -> Result<Option<Arc<T>>> {
        match self.instance(index) {
            Some(instance) => instance.downcast::<T>().map(Some).ok_or_else(|| {
                KeystoneError::DowncastFailed {
                    type_name: std::any::type_name::<T>().to_string(),
                }
            }),
            None => Ok(None),
        }
    }

    pub fn optional_dyn<T: ?Sized + Send + Sync + 'static>(
        &self,
        index: usize,
    ) -> Result<Option<Arc<T>>> {
        match self.instance(index) {
            Some(instance) => instance.downcast_dyn::<T>().map(Some).ok_or_else(|| {
                KeystoneError::DowncastFailed {
                    type_name: std::any::type_name::<T>().to_string(),
                }
            }),
            None => Ok(None),
        }
    }

    fn missing(&self, index: usize) -> KeystoneError {
        let token = self
            .tokens
            .get(index)
            .map(Token::name)
            .unwrap_or_else(|| format!("#{index}"));
        KeystoneError::construction_failed(
            self.owner.clone(),
            format!("dependency {token} at index [{index}] was not provided"),
        )
    }
}

/// Recipe for one provider: its token, scope, dependencies and how to build it.
#[derive(Clone)]
pub struct ProviderDef {
    token: Token,
    name: String,
    scope: Option<Scope>,
    class_scope: Scope,
    dependencies: Vec<Dependency>,
    factory: Option<Factory>,
    value: Option<Instance>,
}

impl ProviderDef {
    /// Constructor-based provider keyed by its own type.
    pub fn class<T: Injectable>() -> Self {
        Self::use_class::<T>(Token::of::<T>())
    }

    /// Constructor-based provider registered under a custom token.
    pub fn use_class<T: Injectable>(token: impl Into<Token>) -> Self {
        let factory: Factory = Arc::new(|deps: Dependencies| -> BoxFuture<'static, Result<Instance>> {
            Box::pin(async move { T::construct(&deps).map(Instance::new) })
        });
        Self {
            token: token.into(),
            name: Token::of::<T>().name(),
            scope: None,
            class_scope: T::scope(),
            dependencies: T::dependencies(),
            factory: Some(factory),
            value: None,
        }
    }

    /// Pre-built value. Value providers are always static.
    pub fn value<T: Send + Sync + 'static>(token: impl Into<Token>, value: T) -> Self {
        Self::instance(token, Instance::new(value))
    }

    pub fn instance(token: impl Into<Token>, instance: Instance) -> Self {
        let token = token.into();
        Self {
            name: token.name(),
            token,
            scope: None,
            class_scope: Scope::Default,
            dependencies: Vec::new(),
            factory: None,
            value: Some(instance),
        }
    }

    pub fn factory<T, F>(token: impl Into<Token>, dependencies: Vec<Dependency>, build: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Dependencies) -> Result<T> + Send + Sync + 'static,
    {
        let build = Arc::new(build);
        Self::from_factory(
            token,
            dependencies,
            Arc::new(move |deps: Dependencies| -> BoxFuture<'static, Result<Instance>> {
                let build = build.clone();
                Box::pin(async move { build(&deps).map(Instance::new) })
            }),
        )
    }

    pub fn factory_async<T, F, Fut>(
        token: impl Into<Token>,
        dependencies: Vec<Dependency>,
        build: F,
    ) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(Dependencies) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        Self::from_factory(
            token,
            dependencies,
            Arc::new(move |deps: Dependencies| -> BoxFuture<'static, Result<Instance>> {
                let fut = build(deps);
                Box::pin(async move { fut.await.map(Instance::new) })
            }),
        )
    }

    pub fn from_factory(
        token: impl Into<Token>,
        dependencies: Vec<Dependency>,
        factory: Factory,
    ) -> Self {
        let token = token.into();
        Self {
            name: token.name(),
            token,
            scope: None,
            class_scope: Scope::Default,
            dependencies,
            factory: Some(factory),
            value: None,
        }
    }

    /// Alias another token: resolving `token` yields the instance of `existing`.
    pub fn existing(token: impl Into<Token>, existing: impl Into<Token>) -> Self {
        Self::from_factory(
            token,
            vec![Dependency::token(existing)],
            Arc::new(|deps: Dependencies| -> BoxFuture<'static, Result<Instance>> {
                let instance = deps.instance(0).cloned();
                Box::pin(async move {
                    instance.ok_or_else(|| {
                        KeystoneError::Internal("aliased provider resolved to nothing".to_string())
                    })
                })
            }),
        )
    }

    /// Expose an implementation under a trait token.
    ///
    /// ```ignore
    /// ProviderDef::bind::<dyn UserRepository, PgUserRepository>(|repo| repo)
    /// ```
    pub fn bind<T, I>(caster: fn(Arc<I>) -> Arc<T>) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
        I: Send + Sync + 'static,
    {
        Self::from_factory(
            Token::of::<T>(),
            vec![Dependency::of::<I>()],
            Arc::new(move |deps: Dependencies| -> BoxFuture<'static, Result<Instance>> {
                let cast = deps.get::<I>(0).map(|inner| Instance::from_dyn(caster(inner)));
                Box::pin(async move { cast })
            }),
        )
    }

    /// Post-process the built instance, e.g. to store it as a trait object.
    pub fn cast<I, T>(mut self, caster: fn(Arc<I>) -> Arc<T>) -> Self
    where
        I: Send + Sync + 'static,
        T: ?Sized + Send + Sync + 'static,
    {
        if let Some(value) = self.value.take() {
            self.value = value.downcast::<I>().map(|inner| Instance::from_dyn(caster(inner)));
        }
        if let Some(factory) = self.factory.take() {
            self.factory = Some(Arc::new(move |deps: Dependencies| -> BoxFuture<'static, Result<Instance>> {
                let built = factory(deps);
                Box::pin(async move {
                    let instance = built.await?;
                    instance
                        .downcast::<I>()
                        .map(|inner| Instance::from_dyn(caster(inner)))
                        .ok_or_else(|| KeystoneError::DowncastFailed {
                            type_name: std::any::type_name::<I>().to_string(),
                        })
                })
            }));
        }
        self
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn with_token(mut self, token: impl Into<Token>) -> Self {
        self.token = token.into();
        self
    }

    pub fn token(&self) -> &Token {
        &self.token
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Explicit scope wins over the class-level default.
    pub fn scope(&self) -> Scope {
        self.scope.unwrap_or(self.class_scope)
    }

    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    pub fn value_instance(&self) -> Option<&Instance> {
        self.value.as_ref()
    }

    pub(crate) fn factory_fn(&self) -> Option<&Factory> {
        self.factory.as_ref()
    }
}

impl std::fmt::Debug for ProviderDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderDef")
            .field("token", &self.token)
            .field("scope", &self.scope())
            .field("dependencies", &self.dependencies)
            .finish()
    }
}
