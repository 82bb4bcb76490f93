mod context_id;
mod injectable;
mod injector;
mod instance;
mod instance_loader;
mod provider;
mod scope;
mod token;
mod wrapper;

pub use context_id::{ContextId, ContextIdFactory, ContextRegistry, RequestContext};
pub use injectable::Injectable;
pub use injector::Injector;
pub use instance::Instance;
pub use instance_loader::InstanceLoader;
pub use provider::{Dependencies, Dependency, Factory, ProviderDef};
pub use scope::Scope;
pub use token::Token;
pub use wrapper::{InstanceWrapper, WrapperId};

pub(crate) use token::short_name;
