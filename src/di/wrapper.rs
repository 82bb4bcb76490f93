use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use dashmap::DashMap;
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::di::{ContextId, Instance, ProviderDef, Scope, Token};
use crate::module::ModuleKey;

pub type WrapperId = Uuid;

type ContextKey = (ContextId, Option<WrapperId>);

/// Per-provider record: recipe, scope and the cached instances.
///
/// Static instances live in a single cell; request and transient instances
/// are cached per `(context, inquirer)` pair. Cells are shared so concurrent
/// resolutions of the same key run the factory once.
pub struct InstanceWrapper {
    id: WrapperId,
    host: ModuleKey,
    provider: ProviderDef,
    static_instance: Arc<OnceCell<Instance>>,
    contexts: DashMap<ContextKey, Arc<OnceCell<Instance>>>,
    tree_static: OnceLock<bool>,
    enhancers: RwLock<Vec<Arc<InstanceWrapper>>>,
}

impl InstanceWrapper {
    pub fn new(provider: ProviderDef, host: ModuleKey) -> Self {
        let static_instance = Arc::new(OnceCell::new_with(provider.value_instance().cloned()));
        Self {
            id: Uuid::new_v4(),
            host,
            provider,
            static_instance,
            contexts: DashMap::new(),
            tree_static: OnceLock::new(),
            enhancers: RwLock::new(Vec::new()),
        }
    }

    pub fn id(&self) -> WrapperId {
        self.id
    }

    pub fn token(&self) -> &Token {
        self.provider.token()
    }

    pub fn name(&self) -> &str {
        self.provider.name()
    }

    pub fn host(&self) -> &ModuleKey {
        &self.host
    }

    pub fn scope(&self) -> Scope {
        // value providers never vary per context
        if self.provider.value_instance().is_some() {
            Scope::Default
        } else {
            self.provider.scope()
        }
    }

    pub fn provider(&self) -> &ProviderDef {
        &self.provider
    }

    pub fn is_transient(&self) -> bool {
        self.scope() == Scope::Transient
    }

    /// False iff this wrapper or anything it depends on is request-scoped.
    ///
    /// Computed by the injector during bootstrap; until then only the
    /// wrapper's own scope is considered.
    pub fn is_dependency_tree_static(&self) -> bool {
        self.tree_static
            .get()
            .copied()
            .unwrap_or(self.scope() != Scope::Request)
    }

    pub(crate) fn tree_static_computed(&self) -> Option<bool> {
        self.tree_static.get().copied()
    }

    pub(crate) fn set_tree_static(&self, value: bool) -> bool {
        *self.tree_static.get_or_init(|| value)
    }

    /// Whether a single bootstrap-time instance serves every consumer.
    pub fn is_static(&self) -> bool {
        self.is_dependency_tree_static() && !self.is_transient()
    }

    pub fn instance(&self) -> Option<Instance> {
        self.static_instance.get().cloned()
    }

    pub fn instance_by_context(
        &self,
        context: ContextId,
        inquirer: Option<WrapperId>,
    ) -> Option<Instance> {
        match self.context_key(context, inquirer) {
            None => self.instance(),
            Some(key) => self
                .contexts
                .get(&key)
                .and_then(|cell| cell.get().cloned()),
        }
    }

    /// Cache key for a resolution, `None` for the static cell.
    pub(crate) fn context_key(
        &self,
        context: ContextId,
        inquirer: Option<WrapperId>,
    ) -> Option<ContextKey> {
        if self.is_transient() {
            // per consumer and per context, even over a static tree
            return Some((context, inquirer));
        }
        if self.is_dependency_tree_static() {
            return None;
        }
        Some((context, None))
    }

    pub(crate) fn cell(&self, key: Option<ContextKey>) -> Arc<OnceCell<Instance>> {
        match key {
            None => self.static_instance.clone(),
            Some(key) => self.contexts.entry(key).or_default().clone(),
        }
    }

    pub(crate) fn release_context(&self, context: ContextId) {
        self.contexts.retain(|(owner, _), _| *owner != context);
    }

    pub fn cached_contexts(&self) -> usize {
        self.contexts.len()
    }

    pub fn add_enhancer(&self, enhancer: Arc<InstanceWrapper>) {
        let mut enhancers = self
            .enhancers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if !enhancers.iter().any(|existing| existing.id == enhancer.id) {
            enhancers.push(enhancer);
        }
    }

    pub fn enhancers(&self) -> Vec<Arc<InstanceWrapper>> {
        self.enhancers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl std::fmt::Debug for InstanceWrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceWrapper")
            .field("token", self.token())
            .field("host", &self.host)
            .field("scope", &self.scope())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::di::ContextIdFactory;

    fn wrapper(scope: Scope) -> InstanceWrapper {
        let def = ProviderDef::factory("Counter", vec![], |_| Ok(0u32)).with_scope(scope);
        InstanceWrapper::new(def, ModuleKey::from("AppModule"))
    }

    #[test]
    fn test_value_provider_is_preloaded() {
        let w = InstanceWrapper::new(ProviderDef::value("PORT", 3000u16), ModuleKey::from("AppModule"));
        assert!(w.is_static());
        assert_eq!(*w.instance().unwrap().downcast::<u16>().unwrap(), 3000);
    }

    #[test]
    fn test_context_keys() {
        let ctx = ContextIdFactory::create();
        let inquirer = Some(Uuid::new_v4());

        assert_eq!(wrapper(Scope::Default).context_key(ctx, inquirer), None);
        assert_eq!(wrapper(Scope::Request).context_key(ctx, inquirer), Some((ctx, None)));
        assert_eq!(
            wrapper(Scope::Transient).context_key(ctx, inquirer),
            Some((ctx, inquirer))
        );
        assert_eq!(
            wrapper(Scope::Transient).context_key(ContextId::STATIC, inquirer),
            Some((ContextId::STATIC, inquirer))
        );

        let transient = wrapper(Scope::Transient);
        transient.set_tree_static(false);
        assert_eq!(transient.context_key(ctx, inquirer), Some((ctx, inquirer)));
    }

    #[tokio::test]
    async fn test_release_context_drops_entries() {
        let w = wrapper(Scope::Request);
        let a = ContextIdFactory::create();
        let b = ContextIdFactory::create();
        w.cell(w.context_key(a, None)).set(Instance::new(1u32)).unwrap();
        w.cell(w.context_key(b, None)).set(Instance::new(2u32)).unwrap();
        assert_eq!(w.cached_contexts(), 2);

        w.release_context(a);
        assert!(w.instance_by_context(a, None).is_none());
        assert!(w.instance_by_context(b, None).is_some());
    }
}
