use std::collections::HashSet;

use crate::di::{ContextId, Injector};
use crate::error::Result;

/// Bootstrap pass building every static instance in the graph.
pub struct InstanceLoader<'a> {
    injector: &'a Injector,
}

impl<'a> InstanceLoader<'a> {
    pub fn new(injector: &'a Injector) -> Self {
        Self { injector }
    }

    pub async fn create_instances_of_dependencies(&self) -> Result<()> {
        let container = self.injector.container();

        for module in container.modules() {
            for wrapper in module
                .providers()
                .iter()
                .chain(module.injectables().iter())
                .chain(module.controllers().iter())
            {
                self.injector.introspect(wrapper)?;
            }
        }

        let mut checked = HashSet::new();
        for module in container.modules() {
            for wrapper in module
                .providers()
                .iter()
                .chain(module.injectables().iter())
                .chain(module.controllers().iter())
            {
                self.injector.detect_cycles(wrapper, &mut checked)?;
            }
        }

        for module in container.modules() {
            for wrapper in module.providers().iter().chain(module.injectables().iter()) {
                if wrapper.is_static() {
                    self.injector.resolve(wrapper, ContextId::STATIC, None).await?;
                }
            }
            for controller in module.controllers().iter() {
                if !controller.is_dependency_tree_static() {
                    continue;
                }
                self.injector
                    .load_per_context(controller, ContextId::STATIC, None)
                    .await?;
            }
            tracing::info!(target: "keystone::instance_loader", "{} dependencies initialized", module.name());
        }
        Ok(())
    }
}
