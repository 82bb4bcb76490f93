use std::sync::Arc;

use axum::extract::Request;
use axum::response::Response;
use futures::future::BoxFuture;

use crate::adapter::{HttpAdapter, MiddlewareHandler};
use crate::config::ApplicationConfig;
use crate::di::{ContextId, Injector, InstanceWrapper, RequestContext};
use crate::error::{KeystoneError, Result};
use crate::exception::{ArgumentsHost, ExceptionsHandler, RouterExceptionFilters};
use crate::middleware::utils::prefixed_path;
use crate::middleware::{
    ExcludedRoute, Middleware, MiddlewareConsumer, MiddlewareContainer, MiddlewareResolver, Next, RouteInfo,
    RoutesMapper, is_route_excluded,
};
use crate::module::ModuleNode;
use crate::router::RouterProxy;

/// Collects every module's middleware configuration and registers it with
/// the adapter.
///
/// Modules register in ascending distance so middleware declared closer to
/// the root runs first. Within a module, registration follows configuration
/// order, then route order, then middleware order.
pub struct MiddlewareModule {
    injector: Injector,
    config: Arc<ApplicationConfig>,
    filters: Arc<RouterExceptionFilters>,
    container: MiddlewareContainer,
}

impl MiddlewareModule {
    pub fn new(injector: Injector, config: Arc<ApplicationConfig>) -> Self {
        Self {
            filters: Arc::new(RouterExceptionFilters::new(config.clone())),
            injector,
            config,
            container: MiddlewareContainer::new(),
        }
    }

    pub async fn register<A: HttpAdapter + ?Sized>(&mut self, adapter: &mut A) -> Result<()> {
        self.load_configuration()?;
        MiddlewareResolver::new(&self.injector)
            .resolve_instances(&self.container)
            .await?;
        self.register_middleware(adapter).await
    }

    fn load_configuration(&mut self) -> Result<()> {
        for module in self.injector.container().modules() {
            let Some(configure) = module.def().configurer() else {
                continue;
            };
            let mut consumer = MiddlewareConsumer::new();
            configure(&mut consumer);
            self.container.insert_config(consumer.build()?, module.key());
        }
        Ok(())
    }

    async fn register_middleware<A: HttpAdapter + ?Sized>(&self, adapter: &mut A) -> Result<()> {
        let container = self.injector.container();
        let mut modules: Vec<&ModuleNode> = container.modules().collect();
        modules.sort_by_key(|module| module.distance());

        let mapper = RoutesMapper::new(container);
        let prefix = self.config.global_prefix();

        for module in modules {
            for binding in self.container.bindings(module.key()) {
                let excluded = binding
                    .exclude
                    .iter()
                    .map(|info| ExcludedRoute::new(info, prefix))
                    .collect::<Result<Vec<_>>>()?;
                let excluded = Arc::new(excluded);

                for target in &binding.for_routes {
                    for route in mapper.map_route_to_route_info(target) {
                        for wrapper in &binding.wrappers {
                            self.bind_handler(adapter, wrapper, &route, excluded.clone())
                                .await?;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    async fn bind_handler<A: HttpAdapter + ?Sized>(
        &self,
        adapter: &mut A,
        wrapper: &Arc<InstanceWrapper>,
        route: &RouteInfo,
        excluded: Arc<Vec<ExcludedRoute>>,
    ) -> Result<()> {
        let handler = if wrapper.is_dependency_tree_static() {
            let instance = self
                .injector
                .resolve(wrapper, ContextId::STATIC, None)
                .await?;
            let middleware = instance
                .downcast_dyn::<dyn Middleware>()
                .ok_or_else(|| invalid_middleware(wrapper))?;
            let exceptions = Arc::new(self.filters.create_global(ContextId::STATIC));
            static_proxy(middleware, excluded, exceptions)
        } else {
            self.request_scoped_proxy(wrapper.clone(), excluded)
        };

        let path = prefixed_path(self.config.global_prefix(), &route.path);
        tracing::debug!(
            target: "keystone::middleware_module",
            middleware = wrapper.name(),
            path = %path,
            method = %route.method,
            "middleware registered"
        );
        adapter.register_middleware(route.method, &path, handler)
    }

    fn request_scoped_proxy(
        &self,
        wrapper: Arc<InstanceWrapper>,
        excluded: Arc<Vec<ExcludedRoute>>,
    ) -> MiddlewareHandler {
        let injector = self.injector.clone();
        let filters = self.filters.clone();

        Arc::new(move |mut request: Request, next: Next| -> BoxFuture<'static, Response> {
            let injector = injector.clone();
            let filters = filters.clone();
            let wrapper = wrapper.clone();
            let excluded = excluded.clone();
            Box::pin(async move {
                if is_route_excluded(&excluded, request.method(), request.uri().path()) {
                    return next.run(request).await;
                }

                let context_id = RequestContext::attach(&mut request, injector.registry());
                let host = ArgumentsHost::from_request(&request);
                let exceptions = filters.create_global(context_id);
                let resolved = injector
                    .resolve(&wrapper, context_id, None)
                    .await
                    .and_then(|instance| {
                        instance
                            .downcast_dyn::<dyn Middleware>()
                            .ok_or_else(|| invalid_middleware(&wrapper))
                    });

                match resolved {
                    Ok(middleware) => RouterProxy::guard(middleware.handle(request, next), &exceptions, &host).await,
                    Err(e) => exceptions.next(Box::new(e), &host),
                }
            })
        })
    }
}

fn static_proxy(
    middleware: Arc<dyn Middleware>,
    excluded: Arc<Vec<ExcludedRoute>>,
    exceptions: Arc<ExceptionsHandler>,
) -> MiddlewareHandler {
    Arc::new(move |request: Request, next: Next| -> BoxFuture<'static, Response> {
        let middleware = middleware.clone();
        let excluded = excluded.clone();
        let exceptions = exceptions.clone();
        Box::pin(async move {
            if is_route_excluded(&excluded, request.method(), request.uri().path()) {
                return next.run(request).await;
            }
            let host = ArgumentsHost::from_request(&request);
            RouterProxy::guard(middleware.handle(request, next), &exceptions, &host).await
        })
    })
}

fn invalid_middleware(wrapper: &InstanceWrapper) -> KeystoneError {
    KeystoneError::InvalidMiddleware {
        name: wrapper.name().to_string(),
    }
}
