//! Application bootstrap
//!
//! [`KeystoneFactory`] scans the module graph and builds every static
//! instance. [`Application::init`] then registers middleware and routes
//! with the HTTP adapter.
//!
//! ```rust,ignore
//! #[tokio::main]
//! async fn main() -> keystone::Result<()> {
//!     let app = KeystoneFactory::create(AppModule::module(), AxumAdapter::new()).await?;
//!     app.listen().await
//! }
//! ```

use std::sync::Arc;

use axum::Router;

use crate::adapter::{AxumAdapter, HttpAdapter};
use crate::config::{ApplicationConfig, ApplicationOptions};
use crate::di::{ContextId, Injector, Instance, InstanceLoader, InstanceWrapper, Token};
use crate::error::{KeystoneError, Result};
use crate::exception::{ExceptionFilter, ExceptionsZone};
use crate::guard::Guard;
use crate::interceptor::Interceptor;
use crate::middleware::MiddlewareModule;
use crate::module::{DependenciesScanner, ModuleContainer, ModuleRef, apply_application_providers};
use crate::pipe::Pipe;
use crate::router::RoutesResolver;

pub struct KeystoneFactory;

impl KeystoneFactory {
    pub async fn create<A: HttpAdapter>(root: ModuleRef, adapter: A) -> Result<Application<A>> {
        Self::create_with_options(root, adapter, ApplicationOptions::default()).await
    }

    /// Scans the graph rooted at `root` and instantiates every static provider.
    ///
    /// Nothing is registered with the adapter until [`Application::init`].
    pub async fn create_with_options<A: HttpAdapter>(
        root: ModuleRef,
        adapter: A,
        options: ApplicationOptions,
    ) -> Result<Application<A>> {
        tracing::info!(target: "keystone::factory", "Starting Keystone application...");

        let mut container = ModuleContainer::new();
        let application_providers = ExceptionsZone::run("scan", || {
            let mut scanner = DependenciesScanner::new(&mut container);
            scanner.scan(&root)?;
            Ok(scanner.into_application_providers())
        })?;

        let container = Arc::new(container);
        let injector = Injector::new(container.clone());
        ExceptionsZone::run_async(
            "instantiate",
            InstanceLoader::new(&injector).create_instances_of_dependencies(),
        )
        .await?;

        let mut config = ApplicationConfig::new();
        config.set_global_prefix(options.global_prefix.clone());
        ExceptionsZone::run("global enhancers", || {
            apply_application_providers(&application_providers, &container, &mut config)
        })?;

        Ok(Application {
            injector,
            config: Arc::new(config),
            adapter,
            options,
            initialized: false,
        })
    }
}

/// A bootstrapped module graph bound to an HTTP adapter.
pub struct Application<A: HttpAdapter = AxumAdapter> {
    injector: Injector,
    config: Arc<ApplicationConfig>,
    adapter: A,
    options: ApplicationOptions,
    initialized: bool,
}

impl<A: HttpAdapter> Application<A> {
    /// Registers middleware (ascending module distance), then routes.
    pub async fn init(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }

        let injector = self.injector.clone();
        let config = self.config.clone();
        let adapter = &mut self.adapter;
        ExceptionsZone::run_async("init", async move {
            MiddlewareModule::new(injector.clone(), config.clone())
                .register(&mut *adapter)
                .await?;
            RoutesResolver::new(injector, config).resolve(&mut *adapter)
        })
        .await?;

        self.initialized = true;
        tracing::info!(target: "keystone::application", "Keystone application successfully started");
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn config_mut(&mut self) -> Result<&mut ApplicationConfig> {
        Arc::get_mut(&mut self.config).ok_or_else(|| {
            KeystoneError::Internal("global enhancers must be registered before init()".to_string())
        })
    }

    pub fn set_global_prefix(&mut self, prefix: impl Into<String>) -> Result<&mut Self> {
        self.config_mut()?.set_global_prefix(prefix);
        Ok(self)
    }

    pub fn use_global_guards(&mut self, guards: impl IntoIterator<Item = Arc<dyn Guard>>) -> Result<&mut Self> {
        self.config_mut()?.use_global_guards(guards);
        Ok(self)
    }

    pub fn use_global_pipes(&mut self, pipes: impl IntoIterator<Item = Arc<dyn Pipe>>) -> Result<&mut Self> {
        self.config_mut()?.use_global_pipes(pipes);
        Ok(self)
    }

    pub fn use_global_interceptors(
        &mut self,
        interceptors: impl IntoIterator<Item = Arc<dyn Interceptor>>,
    ) -> Result<&mut Self> {
        self.config_mut()?.use_global_interceptors(interceptors);
        Ok(self)
    }

    pub fn use_global_filters(
        &mut self,
        filters: impl IntoIterator<Item = Arc<dyn ExceptionFilter>>,
    ) -> Result<&mut Self> {
        self.config_mut()?.use_global_filters(filters);
        Ok(self)
    }

    /// Static instance of a concrete provider.
    pub fn get<T: Send + Sync + 'static>(&self) -> Result<Arc<T>> {
        downcast::<T>(&self.get_by_token(&Token::of::<T>())?)
    }

    /// Static instance of a trait binding, e.g. `get_dyn::<dyn Repository>()`.
    pub fn get_dyn<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>> {
        downcast_dyn::<T>(&self.get_by_token(&Token::of::<T>())?)
    }

    /// Fails with `InvalidClassScope` for request or transient providers.
    pub fn get_by_token(&self, token: &Token) -> Result<Instance> {
        let wrapper = self.find(token)?;
        if !wrapper.is_static() {
            return Err(KeystoneError::InvalidClassScope {
                name: wrapper.name().to_string(),
            });
        }
        wrapper.instance().ok_or_else(|| {
            KeystoneError::construction_failed(wrapper.name(), "provider was not instantiated")
        })
    }

    /// Instance of a provider for a context, building it on first use.
    pub async fn resolve<T: Send + Sync + 'static>(&self, context: ContextId) -> Result<Arc<T>> {
        downcast::<T>(&self.resolve_by_token(&Token::of::<T>(), context).await?)
    }

    pub async fn resolve_dyn<T: ?Sized + Send + Sync + 'static>(&self, context: ContextId) -> Result<Arc<T>> {
        downcast_dyn::<T>(&self.resolve_by_token(&Token::of::<T>(), context).await?)
    }

    pub async fn resolve_by_token(&self, token: &Token, context: ContextId) -> Result<Instance> {
        let wrapper = self.find(token)?;
        self.injector.introspect(&wrapper)?;
        self.injector.resolve(&wrapper, context, None).await
    }

    /// Drops every instance cached for `context`.
    pub fn release_context(&self, context: ContextId) {
        self.injector.registry().release(context);
    }

    fn find(&self, token: &Token) -> Result<Arc<InstanceWrapper>> {
        self.injector
            .container()
            .find_provider(token)
            .cloned()
            .ok_or_else(|| KeystoneError::UnknownProvider {
                token: token.to_string(),
            })
    }

    pub fn container(&self) -> &Arc<ModuleContainer> {
        self.injector.container()
    }

    pub fn injector(&self) -> &Injector {
        &self.injector
    }

    pub fn config(&self) -> &ApplicationConfig {
        &self.config
    }

    pub fn options(&self) -> &ApplicationOptions {
        &self.options
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }
}

impl Application<AxumAdapter> {
    /// Initializes if needed and returns the router serving the application.
    pub async fn into_router(mut self) -> Result<Router> {
        self.init().await?;
        Ok(self.adapter.into_router())
    }

    /// Serves on the configured host and port until SIGINT or SIGTERM.
    pub async fn listen(mut self) -> Result<()> {
        self.init().await?;
        let addr = self.options.addr()?;
        self.adapter.listen(addr).await
    }
}

fn downcast<T: Send + Sync + 'static>(instance: &Instance) -> Result<Arc<T>> {
    instance.downcast::<T>().ok_or_else(|| KeystoneError::DowncastFailed {
        type_name: std::any::type_name::<T>().to_string(),
    })
}

fn downcast_dyn<T: ?Sized + Send + Sync + 'static>(instance: &Instance) -> Result<Arc<T>> {
    instance.downcast_dyn::<T>().ok_or_else(|| KeystoneError::DowncastFailed {
        type_name: std::any::type_name::<T>().to_string(),
    })
}
