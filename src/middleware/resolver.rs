use crate::di::{ContextId, Injector};
use crate::error::Result;
use crate::middleware::MiddlewareContainer;

/// Builds the middleware whose dependency tree is static before any
/// request is served.
pub struct MiddlewareResolver<'a> {
    injector: &'a Injector,
}

impl<'a> MiddlewareResolver<'a> {
    pub fn new(injector: &'a Injector) -> Self {
        Self { injector }
    }

    pub async fn resolve_instances(&self, container: &MiddlewareContainer) -> Result<()> {
        for wrapper in container.wrappers() {
            if self.injector.introspect(wrapper)? {
                self.injector.resolve(wrapper, ContextId::STATIC, None).await?;
            }
        }
        Ok(())
    }
}
