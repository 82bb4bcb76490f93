mod container;
mod scanner;

pub use container::{ModuleContainer, ModuleNode, Registry};
pub use scanner::{ApplicationProvider, DependenciesScanner, EnhancerKind, apply_application_providers};

use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use crate::controller::ControllerDef;
use crate::di::{ProviderDef, Token};
use crate::middleware::MiddlewareConsumer;

/// Identity of a module in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleKey(String);

impl ModuleKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModuleKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ModuleKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

pub type ModuleRef = Arc<ModuleDef>;

pub type Configure = Arc<dyn Fn(&mut MiddlewareConsumer) + Send + Sync>;

/// One entry of a module's `imports` list.
#[derive(Clone)]
pub enum ModuleImport {
    Module(ModuleRef),
    /// Deferred reference, evaluated during scanning. Used to break
    /// definition cycles between modules.
    Forward(Arc<dyn Fn() -> Option<ModuleRef> + Send + Sync>),
    /// A module that was never defined.
    Undefined,
    /// A value that is not a module at all.
    Invalid,
}

impl ModuleImport {
    pub fn forward(thunk: impl Fn() -> Option<ModuleRef> + Send + Sync + 'static) -> Self {
        Self::Forward(Arc::new(thunk))
    }
}

impl From<ModuleRef> for ModuleImport {
    fn from(value: ModuleRef) -> Self {
        Self::Module(value)
    }
}

/// Static description of a module.
pub struct ModuleDef {
    id: Uuid,
    key: ModuleKey,
    name: String,
    imports: Vec<ModuleImport>,
    providers: Vec<ProviderDef>,
    controllers: Vec<Arc<ControllerDef>>,
    exports: Vec<Token>,
    exported_modules: Vec<ModuleRef>,
    global: bool,
    configure: Option<Configure>,
}

impl ModuleDef {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::with_key(name.clone(), name)
    }

    /// Distinct identity and display name, e.g. a type path and its short name.
    pub fn with_key(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            key: ModuleKey(key.into()),
            name: name.into(),
            imports: Vec::new(),
            providers: Vec::new(),
            controllers: Vec::new(),
            exports: Vec::new(),
            exported_modules: Vec::new(),
            global: false,
            configure: None,
        }
    }

    pub fn import(mut self, import: impl Into<ModuleImport>) -> Self {
        self.imports.push(import.into());
        self
    }

    pub fn provider(mut self, provider: ProviderDef) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn controller(mut self, controller: ControllerDef) -> Self {
        self.controllers.push(Arc::new(controller));
        self
    }

    pub fn export(mut self, token: impl Into<Token>) -> Self {
        self.exports.push(token.into());
        self
    }

    pub fn export_type<T: ?Sized + 'static>(self) -> Self {
        self.export(Token::of::<T>())
    }

    /// Re-export an imported module.
    pub fn export_module(mut self, module: &ModuleRef) -> Self {
        self.exported_modules.push(module.clone());
        self
    }

    pub fn global(mut self) -> Self {
        self.global = true;
        self
    }

    pub fn configure(mut self, configure: impl Fn(&mut MiddlewareConsumer) + Send + Sync + 'static) -> Self {
        self.configure = Some(Arc::new(configure));
        self
    }

    pub fn build(self) -> ModuleRef {
        Arc::new(self)
    }

    /// Identity of this descriptor; two builds never share one.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Preferred key. The container may assign another one when a different
    /// descriptor already holds it.
    pub fn key(&self) -> &ModuleKey {
        &self.key
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_global(&self) -> bool {
        self.global
    }

    pub fn imports(&self) -> &[ModuleImport] {
        &self.imports
    }

    pub fn providers(&self) -> &[ProviderDef] {
        &self.providers
    }

    pub fn controllers(&self) -> &[Arc<ControllerDef>] {
        &self.controllers
    }

    pub fn exports(&self) -> &[Token] {
        &self.exports
    }

    pub fn exported_modules(&self) -> &[ModuleRef] {
        &self.exported_modules
    }

    pub fn configurer(&self) -> Option<&Configure> {
        self.configure.as_ref()
    }
}

/// Trait for application modules
///
/// Modules are typically defined using the `#[module]` macro, which implements
/// this trait and memoizes the generated [`ModuleDef`].
///
/// # Example
/// ```ignore
/// use keystone::module;
///
/// #[module(
///     imports = [DatabaseModule],
///     controllers = [UserController],
///     providers = [UserService],
///     exports = [UserService],
/// )]
/// pub struct UserModule;
/// ```
pub trait Module {
    fn module() -> ModuleRef;
}
