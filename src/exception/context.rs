use std::sync::Arc;

use crate::config::ApplicationConfig;
use crate::context::resolve_enhancers;
use crate::controller::ControllerDef;
use crate::di::{ContextId, WrapperId};
use crate::error::Result;
use crate::exception::ExceptionsHandler;
use crate::module::ModuleNode;
use crate::router::RouteDef;

/// Builds the exceptions handler for one handler.
///
/// Filter priority: route, then controller, then global (static before scoped).
pub struct RouterExceptionFilters {
    config: Arc<ApplicationConfig>,
}

impl RouterExceptionFilters {
    pub fn new(config: Arc<ApplicationConfig>) -> Self {
        Self { config }
    }

    pub fn create(
        &self,
        controller: &ControllerDef,
        route: &RouteDef,
        module: &ModuleNode,
        context: ContextId,
        inquirer: Option<WrapperId>,
    ) -> Result<ExceptionsHandler> {
        let mut filters = resolve_enhancers(route.filters(), module, context, inquirer)?;
        filters.extend(resolve_enhancers(controller.filters(), module, context, inquirer)?);
        filters.extend(self.config.filters_for(context, inquirer)?);
        Ok(ExceptionsHandler::new(filters))
    }

    /// Handler with global filters only, for middleware, unmatched routes and
    /// handlers that could not be assembled.
    pub fn create_global(&self, context: ContextId) -> ExceptionsHandler {
        ExceptionsHandler::new(self.config.cached_filters_for(context))
    }
}
