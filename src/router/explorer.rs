use std::sync::Arc;

use axum::extract::Request;
use axum::response::Response;
use futures::future::BoxFuture;

use crate::adapter::{HttpAdapter, RequestHandler};
use crate::controller::ControllerDef;
use crate::di::{ContextId, InstanceWrapper, Injector, RequestContext};
use crate::error::{KeystoneError, Result};
use crate::exception::{ArgumentsHost, RouterExceptionFilters};
use crate::module::ModuleKey;
use crate::router::{RouteDef, RouterExecutionContext, RouterProxy, join_paths};

/// Registers the routes of one controller with the adapter.
///
/// Controllers with a static dependency tree get one shared handler per route.
/// Others resolve a fresh controller (and scoped enhancers) per request.
#[derive(Clone)]
pub struct RouterExplorer {
    injector: Injector,
    execution: Arc<RouterExecutionContext>,
    filters: Arc<RouterExceptionFilters>,
}

impl RouterExplorer {
    pub fn new(injector: Injector, execution: Arc<RouterExecutionContext>, filters: Arc<RouterExceptionFilters>) -> Self {
        Self {
            injector,
            execution,
            filters,
        }
    }

    pub fn explore<A: HttpAdapter + ?Sized>(
        &self,
        adapter: &mut A,
        wrapper: &Arc<InstanceWrapper>,
        controller: &Arc<ControllerDef>,
        module: &ModuleKey,
        base_path: &str,
    ) -> Result<()> {
        for route in controller.routes() {
            let handler = if wrapper.is_dependency_tree_static() {
                self.create_static_handler(wrapper, controller, route, module)?
            } else {
                self.create_request_scoped_handler(wrapper, controller, route, module)
            };

            for path in route.paths() {
                let full_path = join_paths(&[base_path, path]);
                adapter.register_route(route.method(), &full_path, handler.clone())?;
                tracing::info!(
                    target: "keystone::router_explorer",
                    "Mapped {{{}, {}}} route",
                    full_path,
                    route.method()
                );
            }
        }
        Ok(())
    }

    fn create_static_handler(
        &self,
        wrapper: &Arc<InstanceWrapper>,
        controller: &ControllerDef,
        route: &RouteDef,
        module: &ModuleKey,
    ) -> Result<RequestHandler> {
        let module = self.injector.container().require(module)?;
        let instance = wrapper.instance_by_context(ContextId::STATIC, None).ok_or_else(|| {
            KeystoneError::construction_failed(wrapper.name(), "controller was not instantiated")
        })?;
        let inquirer = Some(wrapper.id());
        let execution = self
            .execution
            .create(instance, controller, route, module, ContextId::STATIC, inquirer)?;
        let exceptions = self
            .filters
            .create(controller, route, module, ContextId::STATIC, inquirer)?;
        Ok(RouterProxy::create_proxy(Arc::new(execution), Arc::new(exceptions)))
    }

    fn create_request_scoped_handler(
        &self,
        wrapper: &Arc<InstanceWrapper>,
        controller: &Arc<ControllerDef>,
        route: &Arc<RouteDef>,
        module: &ModuleKey,
    ) -> RequestHandler {
        let explorer = self.clone();
        let wrapper = wrapper.clone();
        let controller = controller.clone();
        let route = route.clone();
        let module = module.clone();

        Arc::new(move |request: Request| -> BoxFuture<'static, Response> {
            let explorer = explorer.clone();
            let wrapper = wrapper.clone();
            let controller = controller.clone();
            let route = route.clone();
            let module = module.clone();
            Box::pin(async move {
                explorer
                    .handle_scoped(request, &wrapper, &controller, &route, &module)
                    .await
            })
        })
    }

    async fn handle_scoped(
        &self,
        mut request: Request,
        wrapper: &Arc<InstanceWrapper>,
        controller: &ControllerDef,
        route: &RouteDef,
        module: &ModuleKey,
    ) -> Response {
        let context_id = RequestContext::attach(&mut request, self.injector.registry());
        let inquirer = Some(wrapper.id());

        let loaded = match self.injector.container().require(module) {
            Ok(module_ref) => self
                .injector
                .load_per_context(wrapper, context_id, None)
                .await
                .and_then(|instance| -> Result<_> {
                    let execution = self
                        .execution
                        .create(instance, controller, route, module_ref, context_id, inquirer)?;
                    let exceptions = self
                        .filters
                        .create(controller, route, module_ref, context_id, inquirer)?;
                    Ok((execution, exceptions))
                }),
            Err(e) => Err(e),
        };

        match loaded {
            Ok((execution, exceptions)) => RouterProxy::handle(&execution, &exceptions, request).await,
            Err(e) => {
                let host = ArgumentsHost::from_request(&request);
                self.filters.create_global(context_id).next(Box::new(e), &host)
            }
        }
    }
}
