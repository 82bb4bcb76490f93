use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use uuid::Uuid;

use crate::config::ApplicationConfig;
use crate::di::{ProviderDef, Token};
use crate::error::{KeystoneError, Result};
use crate::exception::{APP_FILTER, ExceptionFilter};
use crate::guard::{APP_GUARD, Guard};
use crate::interceptor::{APP_INTERCEPTOR, Interceptor};
use crate::module::{ModuleContainer, ModuleDef, ModuleImport, ModuleKey, ModuleRef};
use crate::pipe::{APP_PIPE, Pipe};

/// Kind of a globally registered enhancer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnhancerKind {
    Guard,
    Pipe,
    Interceptor,
    Filter,
}

impl EnhancerKind {
    fn from_token(token: &Token) -> Option<Self> {
        match token.as_str() {
            APP_GUARD => Some(Self::Guard),
            APP_PIPE => Some(Self::Pipe),
            APP_INTERCEPTOR => Some(Self::Interceptor),
            APP_FILTER => Some(Self::Filter),
            _ => None,
        }
    }
}

/// A provider registered under one of the `APP_*` tokens.
#[derive(Debug, Clone)]
pub struct ApplicationProvider {
    pub module: ModuleKey,
    pub token: Token,
    pub kind: EnhancerKind,
    pub scoped: bool,
}

/// Builds the module graph from a root module.
///
/// Discovery runs breadth-first; declarations are reflected in a second pass
/// once every module is known, followed by export validation and distance
/// calculation.
pub struct DependenciesScanner<'a> {
    container: &'a mut ModuleContainer,
    application_providers: Vec<ApplicationProvider>,
}

impl<'a> DependenciesScanner<'a> {
    pub fn new(container: &'a mut ModuleContainer) -> Self {
        Self {
            container,
            application_providers: Vec::new(),
        }
    }

    pub fn scan(&mut self, root: &ModuleRef) -> Result<()> {
        self.scan_for_modules(root)?;
        self.scan_modules_for_dependencies()?;
        let root = self.container.key_of(root)?;
        self.calculate_modules_distance(&root)?;
        self.add_scoped_enhancers_metadata()?;
        Ok(())
    }

    pub fn application_providers(&self) -> &[ApplicationProvider] {
        &self.application_providers
    }

    pub fn into_application_providers(self) -> Vec<ApplicationProvider> {
        self.application_providers
    }

    pub fn scan_for_modules(&mut self, root: &ModuleRef) -> Result<()> {
        let mut registry: HashSet<Uuid> = HashSet::new();
        let mut queue: VecDeque<(ModuleRef, Vec<String>)> = VecDeque::from([(root.clone(), Vec::new())]);

        while let Some((def, scope)) = queue.pop_front() {
            if !registry.insert(def.id()) {
                continue;
            }
            self.container.add_module(&def);

            let mut inner_scope = scope.clone();
            inner_scope.push(def.name().to_string());
            for (index, import) in def.imports().iter().enumerate() {
                let related = resolve_import(import, &def, index, &inner_scope)?;
                if !registry.contains(&related.id()) {
                    queue.push_back((related, inner_scope.clone()));
                }
            }
        }
        Ok(())
    }

    pub fn scan_modules_for_dependencies(&mut self) -> Result<()> {
        let defs: Vec<ModuleRef> = self.container.modules().map(|m| m.def().clone()).collect();
        for def in &defs {
            let key = self.container.key_of(def)?;
            self.reflect_imports(def, &key)?;
            self.reflect_providers(def, &key)?;
            self.reflect_controllers(def, &key)?;
            self.reflect_exports(def, &key)?;
        }
        self.container.validate_exports()
    }

    fn reflect_imports(&mut self, def: &ModuleDef, key: &ModuleKey) -> Result<()> {
        let scope = vec![def.name().to_string()];
        for (index, import) in def.imports().iter().enumerate() {
            let related = resolve_import(import, def, index, &scope)?;
            let related = self.container.key_of(&related)?;
            self.container.add_import(&related, key)?;
        }
        Ok(())
    }

    fn reflect_providers(&mut self, def: &ModuleDef, key: &ModuleKey) -> Result<()> {
        for provider in def.providers() {
            self.insert_provider(provider.clone(), key)?;
        }
        Ok(())
    }

    fn insert_provider(&mut self, provider: ProviderDef, key: &ModuleKey) -> Result<()> {
        let Some(kind) = EnhancerKind::from_token(provider.token()) else {
            self.container.add_provider(provider, key)?;
            return Ok(());
        };

        let token = Token::from(format!("{} (UUID: {})", provider.token(), Uuid::new_v4()));
        let provider = provider.with_token(token.clone());
        let scoped = provider.scope().is_request_or_transient();
        if scoped {
            self.container.add_injectable(provider, key, None)?;
        } else {
            self.container.add_provider(provider, key)?;
        }
        self.application_providers.push(ApplicationProvider {
            module: key.clone(),
            token,
            kind,
            scoped,
        });
        Ok(())
    }

    fn reflect_controllers(&mut self, def: &ModuleDef, key: &ModuleKey) -> Result<()> {
        for controller in def.controllers() {
            self.container.add_controller(controller.clone(), key)?;
            let host = controller.provider().token().clone();
            for injectable in controller.injectables() {
                self.container.add_injectable(injectable, key, Some(&host))?;
            }
        }
        Ok(())
    }

    fn reflect_exports(&mut self, def: &ModuleDef, key: &ModuleKey) -> Result<()> {
        for token in def.exports() {
            self.container.add_export(token.clone(), key)?;
        }
        for module in def.exported_modules() {
            // not imported: left for validate_exports to reject
            let token = match self.container.key_of(module) {
                Ok(exported) => Token::from(exported.as_str().to_string()),
                Err(_) => Token::from(module.key().as_str().to_string()),
            };
            self.container.add_export(token, key)?;
        }
        Ok(())
    }

    /// Depth-first from the root; each module keeps the depth of its first visit.
    pub fn calculate_modules_distance(&mut self, root: &ModuleKey) -> Result<()> {
        let mut visited: HashSet<ModuleKey> = HashSet::new();
        let mut stack: Vec<(ModuleKey, usize)> = vec![(root.clone(), 0)];

        while let Some((key, distance)) = stack.pop() {
            if !visited.insert(key.clone()) {
                continue;
            }
            let node = self.container.require_mut(&key)?;
            node.set_distance(distance);
            // reversed so imports are visited in declaration order
            for related in node.imports().iter().rev() {
                if !visited.contains(related) {
                    stack.push((related.clone(), distance + 1));
                }
            }
        }
        Ok(())
    }

    /// Attaches request/transient global enhancers to every controller so
    /// those controllers are treated as non-static.
    pub fn add_scoped_enhancers_metadata(&mut self) -> Result<()> {
        for provider in self.application_providers.iter().filter(|p| p.scoped) {
            let module = self.container.require(&provider.module)?;
            let Some(wrapper) = module.injectables().get(&provider.token).cloned() else {
                continue;
            };
            for node in self.container.modules() {
                for controller in node.controllers().iter() {
                    controller.add_enhancer(wrapper.clone());
                }
            }
        }
        Ok(())
    }
}

fn resolve_import(
    import: &ModuleImport,
    parent: &ModuleDef,
    index: usize,
    scope: &[String],
) -> Result<ModuleRef> {
    match import {
        ModuleImport::Module(def) => Ok(def.clone()),
        ModuleImport::Forward(thunk) => thunk().ok_or_else(|| KeystoneError::CircularDependency {
            context: Some(parent.name().to_string()),
            scope: scope.to_vec(),
        }),
        ModuleImport::Undefined => Err(KeystoneError::UndefinedModule {
            parent: parent.name().to_string(),
            index,
            scope: scope.to_vec(),
        }),
        ModuleImport::Invalid => Err(KeystoneError::InvalidModule {
            parent: parent.name().to_string(),
            index,
            scope: scope.to_vec(),
        }),
    }
}

/// Pushes the `APP_*` providers into the application config.
///
/// Static ones are added as built instances, scoped ones as wrappers that
/// are resolved per context.
pub fn apply_application_providers(
    providers: &[ApplicationProvider],
    container: &ModuleContainer,
    config: &mut ApplicationConfig,
) -> Result<()> {
    for provider in providers {
        let module = container.require(&provider.module)?;
        let wrapper = module
            .providers()
            .get(&provider.token)
            .or_else(|| module.injectables().get(&provider.token))
            .cloned()
            .ok_or_else(|| KeystoneError::UnknownProvider {
                token: provider.token.to_string(),
            })?;

        if provider.scoped {
            match provider.kind {
                EnhancerKind::Guard => config.add_global_request_guard(wrapper),
                EnhancerKind::Pipe => config.add_global_request_pipe(wrapper),
                EnhancerKind::Interceptor => config.add_global_request_interceptor(wrapper),
                EnhancerKind::Filter => config.add_global_request_filter(wrapper),
            }
            continue;
        }

        let instance = wrapper.instance().ok_or_else(|| {
            KeystoneError::construction_failed(wrapper.name(), "global enhancer was not instantiated")
        })?;
        let downcast_failed = |type_name: &str| KeystoneError::DowncastFailed {
            type_name: format!("{} as {}", wrapper.name(), type_name),
        };
        match provider.kind {
            EnhancerKind::Guard => config.use_global_guards([instance
                .downcast_dyn::<dyn Guard>()
                .ok_or_else(|| downcast_failed("dyn Guard"))?]),
            EnhancerKind::Pipe => config.use_global_pipes([instance
                .downcast_dyn::<dyn Pipe>()
                .ok_or_else(|| downcast_failed("dyn Pipe"))?]),
            EnhancerKind::Interceptor => config.use_global_interceptors([instance
                .downcast_dyn::<dyn Interceptor>()
                .ok_or_else(|| downcast_failed("dyn Interceptor"))?]),
            EnhancerKind::Filter => config.use_global_filters([instance
                .downcast_dyn::<dyn ExceptionFilter>()
                .ok_or_else(|| downcast_failed("dyn ExceptionFilter"))?]),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(root: &ModuleRef) -> Result<ModuleContainer> {
        let mut container = ModuleContainer::new();
        DependenciesScanner::new(&mut container).scan(root)?;
        Ok(container)
    }

    fn distance(container: &ModuleContainer, name: &str) -> usize {
        container.require(&ModuleKey::from(name)).unwrap().distance()
    }

    #[test]
    fn test_distance_follows_each_modules_own_imports() {
        let leaf = ModuleDef::new("Leaf").build();
        let middle = ModuleDef::new("Middle").import(leaf).build();
        let root = ModuleDef::new("Root").import(middle).build();

        let container = scan(&root).unwrap();
        assert_eq!(distance(&container, "Root"), 0);
        assert_eq!(distance(&container, "Middle"), 1);
        assert_eq!(distance(&container, "Leaf"), 2);
    }

    #[test]
    fn test_shared_import_is_scanned_once() {
        let shared = ModuleDef::new("Shared").build();
        let a = ModuleDef::new("A").import(shared.clone()).build();
        let b = ModuleDef::new("B").import(shared).build();
        let root = ModuleDef::new("Root").import(a).import(b).build();

        let container = scan(&root).unwrap();
        assert_eq!(container.len(), 4);
        assert_eq!(distance(&container, "Shared"), 2);
    }

    #[test]
    fn test_undefined_import() {
        let root = ModuleDef::new("Root").import(ModuleImport::Undefined).build();
        let err = scan(&root).err().unwrap();
        assert!(matches!(err, KeystoneError::UndefinedModule { index: 0, .. }));
    }

    #[test]
    fn test_invalid_import() {
        let feature = ModuleDef::new("Feature").import(ModuleImport::Invalid).build();
        let root = ModuleDef::new("Root").import(feature).build();
        match scan(&root).err().unwrap() {
            KeystoneError::InvalidModule { parent, scope, .. } => {
                assert_eq!(parent, "Feature");
                assert_eq!(scope, vec!["Root".to_string(), "Feature".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unresolved_forward_reference_is_circular() {
        let root = ModuleDef::new("Root")
            .import(ModuleImport::forward(|| None))
            .build();
        let err = scan(&root).err().unwrap();
        assert!(matches!(err, KeystoneError::CircularDependency { .. }));
    }

    #[test]
    fn test_reexported_module() {
        let inner = ModuleDef::new("Inner")
            .provider(ProviderDef::value("P", 1u8))
            .export("P")
            .build();
        let outer = ModuleDef::new("Outer")
            .import(inner.clone())
            .export_module(&inner)
            .build();
        let root = ModuleDef::new("Root").import(outer).build();

        let container = scan(&root).unwrap();
        let outer = container.require(&ModuleKey::from("Outer")).unwrap();
        assert_eq!(outer.exported_modules(), &[ModuleKey::from("Inner")]);
    }

    #[test]
    fn test_app_tokens_are_rewritten() {
        let root = ModuleDef::new("Root")
            .provider(ProviderDef::value(APP_GUARD, 0u8))
            .build();
        let mut container = ModuleContainer::new();
        let mut scanner = DependenciesScanner::new(&mut container);
        scanner.scan(&root).unwrap();

        let providers = scanner.into_application_providers();
        assert_eq!(providers.len(), 1);
        assert!(providers[0].token.as_str().starts_with("APP_GUARD (UUID: "));
        assert_eq!(providers[0].kind, EnhancerKind::Guard);
        assert!(!providers[0].scoped);
    }
}
