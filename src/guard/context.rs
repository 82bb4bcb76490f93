use std::sync::Arc;

use crate::config::ApplicationConfig;
use crate::context::resolve_enhancers;
use crate::controller::ControllerDef;
use crate::di::{ContextId, WrapperId};
use crate::error::Result;
use crate::guard::Guard;
use crate::module::ModuleNode;
use crate::router::RouteDef;

/// Collects the guards for one handler: global, then controller, then route.
pub struct GuardsContextCreator {
    config: Arc<ApplicationConfig>,
}

impl GuardsContextCreator {
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
    ) -> Result<Vec<Arc<dyn Guard>>> {
        let mut guards = self.config.guards_for(context, inquirer)?;
        guards.extend(resolve_enhancers(controller.guards(), module, context, inquirer)?);
        guards.extend(resolve_enhancers(route.guards(), module, context, inquirer)?);
        Ok(guards)
    }
}
