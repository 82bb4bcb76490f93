use std::sync::Arc;

use axum::extract::Request;
use axum::response::Response;
use futures::future::BoxFuture;

use crate::adapter::HttpAdapter;
use crate::config::ApplicationConfig;
use crate::di::{ContextId, Injector};
use crate::error::{KeystoneError, Result};
use crate::exception::{ArgumentsHost, HttpException, RouterExceptionFilters};
use crate::router::{RouterExecutionContext, RouterExplorer, join_paths};

/// Walks every module's controllers and registers their routes.
pub struct RoutesResolver {
    injector: Injector,
    config: Arc<ApplicationConfig>,
    explorer: RouterExplorer,
    filters: Arc<RouterExceptionFilters>,
}

impl RoutesResolver {
    pub fn new(injector: Injector, config: Arc<ApplicationConfig>) -> Self {
        let filters = Arc::new(RouterExceptionFilters::new(config.clone()));
        let execution = Arc::new(RouterExecutionContext::new(config.clone()));
        Self {
            explorer: RouterExplorer::new(injector.clone(), execution, filters.clone()),
            injector,
            config,
            filters,
        }
    }

    pub fn resolve<A: HttpAdapter + ?Sized>(&self, adapter: &mut A) -> Result<()> {
        let prefix = self.config.global_prefix();
        for module in self.injector.container().modules() {
            for wrapper in module.controllers().iter() {
                let controller = module.controller_def(wrapper.token()).ok_or_else(|| {
                    KeystoneError::UnknownProvider {
                        token: wrapper.token().to_string(),
                    }
                })?;
                let base_path = join_paths(&[prefix, controller.path()]);
                tracing::info!(
                    target: "keystone::routes_resolver",
                    "{} {{{}}}:",
                    controller.name(),
                    base_path
                );
                self.explorer
                    .explore(adapter, wrapper, controller, module.key(), &base_path)?;
            }
        }
        self.register_not_found_handler(adapter);
        Ok(())
    }

    /// Unmatched requests raise a 404 through the global filters.
    fn register_not_found_handler<A: HttpAdapter + ?Sized>(&self, adapter: &mut A) {
        let exceptions = Arc::new(self.filters.create_global(ContextId::STATIC));
        adapter.set_not_found_handler(Arc::new(move |request: Request| -> BoxFuture<'static, Response> {
            let exceptions = exceptions.clone();
            Box::pin(async move {
                let host = ArgumentsHost::from_request(&request);
                let exception = HttpException::not_found(format!(
                    "Cannot {} {}",
                    request.method(),
                    request.uri().path()
                ));
                exceptions.next(exception.into(), &host)
            })
        }));
    }
}
