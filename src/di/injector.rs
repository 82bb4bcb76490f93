use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::di::{ContextId, ContextRegistry, Dependencies, Instance, InstanceWrapper, Scope, Token, WrapperId};
use crate::error::{KeystoneError, Result};
use crate::module::{ModuleContainer, ModuleKey, ModuleNode};

/// Resolves provider instances against the module graph.
///
/// Lookup order for a dependency of a wrapper hosted in module `M`:
/// 1. `M`'s own providers and injectables
/// 2. breadth-first through `M`'s imports, then global modules, considering
///    only tokens each module exports; re-exported modules are searched one
///    level deeper. The first match at the smallest depth wins.
#[derive(Clone)]
pub struct Injector {
    container: Arc<ModuleContainer>,
    registry: Arc<ContextRegistry>,
}

impl Injector {
    pub fn new(container: Arc<ModuleContainer>) -> Self {
        Self {
            container,
            registry: Arc::new(ContextRegistry::new()),
        }
    }

    pub fn container(&self) -> &Arc<ModuleContainer> {
        &self.container
    }

    pub fn registry(&self) -> &Arc<ContextRegistry> {
        &self.registry
    }

    fn host(&self, wrapper: &InstanceWrapper) -> Result<&ModuleNode> {
        self.container.require(wrapper.host())
    }

    /// Finds the wrapper a module would inject for `token`.
    pub fn lookup(&self, module: &ModuleNode, token: &Token) -> Option<Arc<InstanceWrapper>> {
        if let Some(wrapper) = module
            .providers()
            .get(token)
            .or_else(|| module.injectables().get(token))
        {
            return Some(wrapper.clone());
        }

        let mut visited: HashSet<&ModuleKey> = HashSet::from([module.key()]);
        let mut queue: VecDeque<&ModuleKey> = module
            .imports()
            .iter()
            .chain(self.container.global_modules())
            .collect();

        while let Some(key) = queue.pop_front() {
            if !visited.insert(key) {
                continue;
            }
            let Some(imported) = self.container.module(key) else {
                continue;
            };
            if imported.exports().contains(token) {
                if let Some(wrapper) = imported
                    .providers()
                    .get(token)
                    .or_else(|| imported.injectables().get(token))
                {
                    return Some(wrapper.clone());
                }
            }
            queue.extend(imported.exported_modules());
        }
        None
    }

    /// Computes and caches whether a wrapper's dependency tree is static.
    ///
    /// Request-scoped wrappers short-circuit, so their missing dependencies
    /// surface on first resolution rather than at bootstrap.
    pub fn introspect(&self, wrapper: &Arc<InstanceWrapper>) -> Result<bool> {
        let mut visiting = HashSet::new();
        self.introspect_inner(wrapper, &mut visiting)
    }

    fn introspect_inner(
        &self,
        wrapper: &Arc<InstanceWrapper>,
        visiting: &mut HashSet<WrapperId>,
    ) -> Result<bool> {
        if let Some(computed) = wrapper.tree_static_computed() {
            return Ok(computed);
        }
        if wrapper.scope() == Scope::Request {
            return Ok(wrapper.set_tree_static(false));
        }
        if !visiting.insert(wrapper.id()) {
            // cycles are reported by detect_cycles
            return Ok(true);
        }

        let module = self.host(wrapper)?;
        let mut tree_static = true;
        for (index, dependency) in wrapper.provider().dependencies().iter().enumerate() {
            match self.lookup(module, &dependency.token) {
                Some(found) => tree_static &= self.introspect_inner(&found, visiting)?,
                None if dependency.optional => {}
                None => return Err(self.unknown_dependency(wrapper, module, index)),
            }
        }
        for enhancer in wrapper.enhancers() {
            tree_static &= self.introspect_inner(&enhancer, visiting)?;
        }

        visiting.remove(&wrapper.id());
        Ok(wrapper.set_tree_static(tree_static))
    }

    /// Fails on a constructor dependency cycle reachable from `wrapper`.
    ///
    /// Request-scoped providers are walked as well; their cells are only
    /// initialised per request, where two tasks entering a cycle from
    /// opposite ends would wait on each other.
    pub fn detect_cycles(&self, wrapper: &Arc<InstanceWrapper>, checked: &mut HashSet<WrapperId>) -> Result<()> {
        let mut path = Vec::new();
        self.detect_cycles_inner(wrapper, &mut path, checked)
    }

    fn detect_cycles_inner(
        &self,
        wrapper: &Arc<InstanceWrapper>,
        path: &mut Vec<Arc<InstanceWrapper>>,
        checked: &mut HashSet<WrapperId>,
    ) -> Result<()> {
        if checked.contains(&wrapper.id()) {
            return Ok(());
        }
        if let Some(start) = path.iter().position(|seen| seen.id() == wrapper.id()) {
            let chain = path[start..]
                .iter()
                .chain(std::iter::once(wrapper))
                .map(|seen| seen.token().name())
                .collect::<Vec<_>>();
            return Err(KeystoneError::CircularDependency {
                context: Some(chain.join(" -> ")),
                scope: Vec::new(),
            });
        }

        let module = self.host(wrapper)?;
        path.push(wrapper.clone());
        for dependency in wrapper.provider().dependencies() {
            // missing dependencies are reported by introspection or resolution
            if let Some(found) = self.lookup(module, &dependency.token) {
                self.detect_cycles_inner(&found, path, checked)?;
            }
        }
        path.pop();
        checked.insert(wrapper.id());
        Ok(())
    }

    /// Resolves (building on first use) the instance of `wrapper` for a context.
    ///
    /// `inquirer` identifies the consumer and only matters for transient wrappers.
    pub async fn resolve(
        &self,
        wrapper: &Arc<InstanceWrapper>,
        context: ContextId,
        inquirer: Option<WrapperId>,
    ) -> Result<Instance> {
        self.resolve_in_path(wrapper.clone(), context, inquirer, Vec::new())
            .await
    }

    fn resolve_in_path(
        &self,
        wrapper: Arc<InstanceWrapper>,
        context: ContextId,
        inquirer: Option<WrapperId>,
        path: Vec<Token>,
    ) -> BoxFuture<'_, Result<Instance>> {
        Box::pin(async move {
            if path.contains(wrapper.token()) {
                let chain = path
                    .iter()
                    .chain(std::iter::once(wrapper.token()))
                    .map(Token::name)
                    .collect::<Vec<_>>();
                return Err(KeystoneError::CircularDependency {
                    context: Some(chain.join(" -> ")),
                    scope: Vec::new(),
                });
            }

            let key = wrapper.context_key(context, inquirer);
            if let Some((owner, _)) = key {
                self.registry.track(owner, &wrapper);
            }
            let cell = wrapper.cell(key);
            let instance = cell
                .get_or_try_init(|| self.instantiate(&wrapper, context, path))
                .await?;
            Ok(instance.clone())
        })
    }

    async fn instantiate(
        &self,
        wrapper: &Arc<InstanceWrapper>,
        context: ContextId,
        mut path: Vec<Token>,
    ) -> Result<Instance> {
        if let Some(value) = wrapper.provider().value_instance() {
            return Ok(value.clone());
        }

        let module = self.host(wrapper)?;
        let dependencies = wrapper.provider().dependencies();
        path.push(wrapper.token().clone());

        let mut values = Vec::with_capacity(dependencies.len());
        for (index, dependency) in dependencies.iter().enumerate() {
            match self.lookup(module, &dependency.token) {
                Some(found) => {
                    let instance = self
                        .resolve_in_path(found, context, Some(wrapper.id()), path.clone())
                        .await?;
                    values.push(Some(instance));
                }
                None if dependency.optional => values.push(None),
                None => return Err(self.unknown_dependency(wrapper, module, index)),
            }
        }

        let factory = wrapper.provider().factory_fn().ok_or_else(|| {
            KeystoneError::construction_failed(wrapper.name(), "provider has neither a value nor a factory")
        })?;
        let tokens = dependencies.iter().map(|d| d.token.clone()).collect();
        let instance = factory(Dependencies::new(wrapper.name().to_string(), tokens, values)).await?;

        tracing::trace!(
            target: "keystone::injector",
            provider = wrapper.name(),
            module = module.name(),
            context = %context,
            "instance created"
        );
        Ok(instance)
    }

    /// Loads a wrapper and its enhancers for one context.
    pub async fn load_per_context(
        &self,
        wrapper: &Arc<InstanceWrapper>,
        context: ContextId,
        inquirer: Option<WrapperId>,
    ) -> Result<Instance> {
        let instance = self.resolve(wrapper, context, inquirer).await?;
        for enhancer in wrapper.enhancers() {
            self.resolve(&enhancer, context, Some(wrapper.id())).await?;
        }
        Ok(instance)
    }

    fn unknown_dependency(
        &self,
        wrapper: &InstanceWrapper,
        module: &ModuleNode,
        index: usize,
    ) -> KeystoneError {
        KeystoneError::UnknownDependency {
            type_name: wrapper.name().to_string(),
            index,
            dependencies: wrapper
                .provider()
                .dependencies()
                .iter()
                .map(|dependency| dependency.token.name())
                .collect(),
            module: module.name().to_string(),
        }
    }
}
