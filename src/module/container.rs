use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use uuid::Uuid;

use crate::controller::ControllerDef;
use crate::di::{InstanceWrapper, ProviderDef, Token};
use crate::error::{KeystoneError, Result};
use crate::module::{ModuleDef, ModuleKey, ModuleRef};

/// Insertion-ordered wrapper map keyed by token.
#[derive(Default)]
pub struct Registry {
    entries: Vec<Arc<InstanceWrapper>>,
    index: HashMap<Token, usize>,
}

impl Registry {
    pub fn get(&self, token: &Token) -> Option<&Arc<InstanceWrapper>> {
        self.index.get(token).map(|&i| &self.entries[i])
    }

    pub fn contains(&self, token: &Token) -> bool {
        self.index.contains_key(token)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Arc<InstanceWrapper>> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Inserts unless the token is taken; returns the registered wrapper.
    pub(crate) fn insert(&mut self, wrapper: InstanceWrapper) -> Arc<InstanceWrapper> {
        if let Some(existing) = self.get(wrapper.token()) {
            return existing.clone();
        }
        let wrapper = Arc::new(wrapper);
        self.index.insert(wrapper.token().clone(), self.entries.len());
        self.entries.push(wrapper.clone());
        wrapper
    }
}

/// Runtime record of one module: its wrappers, imports and exports.
pub struct ModuleNode {
    key: ModuleKey,
    name: String,
    def: ModuleRef,
    distance: usize,
    imports: Vec<ModuleKey>,
    providers: Registry,
    injectables: Registry,
    controllers: Registry,
    controller_defs: HashMap<Token, Arc<ControllerDef>>,
    exports: HashSet<Token>,
    exported_modules: Vec<ModuleKey>,
    pending_exports: Vec<Token>,
}

impl ModuleNode {
    fn new(def: ModuleRef, key: ModuleKey) -> Self {
        Self {
            key,
            name: def.name().to_string(),
            def,
            distance: 0,
            imports: Vec::new(),
            providers: Registry::default(),
            injectables: Registry::default(),
            controllers: Registry::default(),
            controller_defs: HashMap::new(),
            exports: HashSet::new(),
            exported_modules: Vec::new(),
            pending_exports: Vec::new(),
        }
    }

    pub fn key(&self) -> &ModuleKey {
        &self.key
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn def(&self) -> &ModuleRef {
        &self.def
    }

    pub fn is_global(&self) -> bool {
        self.def.is_global()
    }

    /// Shortest import depth from the root module.
    pub fn distance(&self) -> usize {
        self.distance
    }

    pub(crate) fn set_distance(&mut self, distance: usize) {
        self.distance = distance;
    }

    pub fn imports(&self) -> &[ModuleKey] {
        &self.imports
    }

    pub fn providers(&self) -> &Registry {
        &self.providers
    }

    pub fn injectables(&self) -> &Registry {
        &self.injectables
    }

    pub fn controllers(&self) -> &Registry {
        &self.controllers
    }

    pub fn controller_def(&self, token: &Token) -> Option<&Arc<ControllerDef>> {
        self.controller_defs.get(token)
    }

    pub fn exports(&self) -> &HashSet<Token> {
        &self.exports
    }

    pub fn exported_modules(&self) -> &[ModuleKey] {
        &self.exported_modules
    }
}

/// All modules discovered from the root, in discovery order.
#[derive(Default)]
pub struct ModuleContainer {
    modules: Vec<ModuleNode>,
    index: HashMap<ModuleKey, usize>,
    descriptors: HashMap<Uuid, ModuleKey>,
    globals: Vec<ModuleKey>,
}

impl ModuleContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a descriptor once; returns its key and whether it was new.
    ///
    /// A different descriptor whose preferred key is taken gets a unique one.
    pub fn add_module(&mut self, def: &ModuleRef) -> (ModuleKey, bool) {
        if let Some(key) = self.descriptors.get(&def.id()) {
            return (key.clone(), false);
        }
        let mut key = def.key().clone();
        if self.index.contains_key(&key) {
            key = ModuleKey::from(format!("{} (UUID: {})", key, def.id()));
        }
        if def.is_global() {
            self.globals.push(key.clone());
        }
        self.descriptors.insert(def.id(), key.clone());
        self.index.insert(key.clone(), self.modules.len());
        self.modules.push(ModuleNode::new(def.clone(), key.clone()));
        (key, true)
    }

    /// Key assigned to a registered descriptor.
    pub fn key_of(&self, def: &ModuleDef) -> Result<ModuleKey> {
        self.descriptors
            .get(&def.id())
            .cloned()
            .ok_or_else(|| KeystoneError::UnknownModule {
                key: def.key().to_string(),
            })
    }

    pub fn module(&self, key: &ModuleKey) -> Option<&ModuleNode> {
        self.index.get(key).map(|&i| &self.modules[i])
    }

    pub fn require(&self, key: &ModuleKey) -> Result<&ModuleNode> {
        self.module(key).ok_or_else(|| KeystoneError::UnknownModule {
            key: key.to_string(),
        })
    }

    pub(crate) fn require_mut(&mut self, key: &ModuleKey) -> Result<&mut ModuleNode> {
        match self.index.get(key) {
            Some(&i) => Ok(&mut self.modules[i]),
            None => Err(KeystoneError::UnknownModule {
                key: key.to_string(),
            }),
        }
    }

    pub fn modules(&self) -> impl Iterator<Item = &ModuleNode> {
        self.modules.iter()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn global_modules(&self) -> &[ModuleKey] {
        &self.globals
    }

    pub fn add_import(&mut self, related: &ModuleKey, target: &ModuleKey) -> Result<()> {
        self.require(related)?;
        let node = self.require_mut(target)?;
        if !node.imports.contains(related) {
            node.imports.push(related.clone());
        }
        Ok(())
    }

    pub fn add_provider(&mut self, provider: ProviderDef, key: &ModuleKey) -> Result<Token> {
        let node = self.require_mut(key)?;
        let token = provider.token().clone();
        node.providers.insert(InstanceWrapper::new(provider, key.clone()));
        Ok(token)
    }

    /// Registers an enhancer class; when `host` names a controller the
    /// wrapper is attached to that controller's enhancer list.
    pub fn add_injectable(
        &mut self,
        provider: ProviderDef,
        key: &ModuleKey,
        host: Option<&Token>,
    ) -> Result<Arc<InstanceWrapper>> {
        let node = self.require_mut(key)?;
        let wrapper = node
            .injectables
            .insert(InstanceWrapper::new(provider, key.clone()));
        if let Some(host) = host.and_then(|token| node.controllers.get(token)) {
            host.add_enhancer(wrapper.clone());
        }
        Ok(wrapper)
    }

    pub fn add_controller(&mut self, controller: Arc<ControllerDef>, key: &ModuleKey) -> Result<()> {
        let node = self.require_mut(key)?;
        let token = controller.provider().token().clone();
        node.controllers
            .insert(InstanceWrapper::new(controller.provider().clone(), key.clone()));
        node.controller_defs.insert(token, controller);
        Ok(())
    }

    /// Records an export; checked by [`ModuleContainer::validate_exports`].
    pub fn add_export(&mut self, token: Token, key: &ModuleKey) -> Result<()> {
        self.require_mut(key)?.pending_exports.push(token);
        Ok(())
    }

    /// Resolves pending exports into provider tokens or re-exported modules.
    pub fn validate_exports(&mut self) -> Result<()> {
        for node in &mut self.modules {
            for token in std::mem::take(&mut node.pending_exports) {
                let as_module = ModuleKey::from(token.as_str());
                if node.imports.contains(&as_module) {
                    if !node.exported_modules.contains(&as_module) {
                        node.exported_modules.push(as_module);
                    }
                } else if node.providers.contains(&token) || node.injectables.contains(&token) {
                    node.exports.insert(token);
                } else {
                    return Err(KeystoneError::UnknownExport {
                        token: token.name(),
                        module: node.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// First wrapper registered under `token`, searching modules in order.
    /// Providers take precedence over controllers and injectables.
    pub fn find_provider(&self, token: &Token) -> Option<&Arc<InstanceWrapper>> {
        let find = |select: fn(&ModuleNode) -> &Registry| {
            self.modules
                .iter()
                .find_map(|node| select(node).get(token))
        };
        find(|node| &node.providers)
            .or_else(|| find(|node| &node.controllers))
            .or_else(|| find(|node| &node.injectables))
    }
}
