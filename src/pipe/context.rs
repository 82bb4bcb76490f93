use std::sync::Arc;

use crate::config::ApplicationConfig;
use crate::context::resolve_enhancers;
use crate::controller::ControllerDef;
use crate::di::{ContextId, WrapperId};
use crate::error::Result;
use crate::module::ModuleNode;
use crate::pipe::{Pipe, PipeRef};
use crate::router::RouteDef;

/// Collects the pipes for one handler: global, then controller, then route.
///
/// Parameter-level pipes are resolved separately and run last.
pub struct PipesContextCreator {
    config: Arc<ApplicationConfig>,
}

impl PipesContextCreator {
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
    ) -> Result<Vec<Arc<dyn Pipe>>> {
        let mut pipes = self.config.pipes_for(context, inquirer)?;
        pipes.extend(resolve_enhancers(controller.pipes(), module, context, inquirer)?);
        pipes.extend(resolve_enhancers(route.pipes(), module, context, inquirer)?);
        Ok(pipes)
    }

    pub fn create_for_param(
        &self,
        pipes: &[PipeRef],
        module: &ModuleNode,
        context: ContextId,
        inquirer: Option<WrapperId>,
    ) -> Result<Vec<Arc<dyn Pipe>>> {
        resolve_enhancers(pipes, module, context, inquirer)
    }
}
