use std::sync::Arc;

use crate::config::ApplicationConfig;
use crate::context::resolve_enhancers;
use crate::controller::ControllerDef;
use crate::di::{ContextId, WrapperId};
use crate::error::Result;
use crate::interceptor::Interceptor;
use crate::module::ModuleNode;
use crate::router::RouteDef;

/// Collects the interceptors for one handler: global, then controller, then route.
pub struct InterceptorsContextCreator {
    config: Arc<ApplicationConfig>,
}

impl InterceptorsContextCreator {
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
    ) -> Result<Vec<Arc<dyn Interceptor>>> {
        let mut interceptors = self.config.interceptors_for(context, inquirer)?;
        interceptors.extend(resolve_enhancers(controller.interceptors(), module, context, inquirer)?);
        interceptors.extend(resolve_enhancers(route.interceptors(), module, context, inquirer)?);
        Ok(interceptors)
    }
}
