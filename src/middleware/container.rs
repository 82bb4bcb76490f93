use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::context::Enhancer;
use crate::di::{Instance, InstanceWrapper, ProviderDef};
use crate::middleware::{MiddlewareConfiguration, RouteInfo, RouteTarget};
use crate::module::{ModuleKey, Registry};

/// A configuration whose middleware have been turned into wrappers.
pub struct MiddlewareBinding {
    pub wrappers: Vec<Arc<InstanceWrapper>>,
    pub for_routes: Vec<RouteTarget>,
    pub exclude: Vec<RouteInfo>,
}

/// Per-module middleware wrappers and their route bindings.
#[derive(Default)]
pub struct MiddlewareContainer {
    bindings: HashMap<ModuleKey, Vec<MiddlewareBinding>>,
    middleware: HashMap<ModuleKey, Registry>,
}

impl MiddlewareContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_config(&mut self, configurations: Vec<MiddlewareConfiguration>, module: &ModuleKey) {
        for configuration in configurations {
            let registry = self.middleware.entry(module.clone()).or_default();
            let wrappers = configuration
                .middleware
                .into_iter()
                .map(|middleware| {
                    let provider = match middleware {
                        Enhancer::Class(provider) => provider,
                        Enhancer::Instance(instance) => ProviderDef::instance(
                            format!("FunctionMiddleware (UUID: {})", Uuid::new_v4()),
                            Instance::from_dyn(instance),
                        ),
                    };
                    registry.insert(InstanceWrapper::new(provider, module.clone()))
                })
                .collect();

            self.bindings
                .entry(module.clone())
                .or_default()
                .push(MiddlewareBinding {
                    wrappers,
                    for_routes: configuration.for_routes,
                    exclude: configuration.exclude,
                });
        }
    }

    pub fn bindings(&self, module: &ModuleKey) -> &[MiddlewareBinding] {
        self.bindings.get(module).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn middleware(&self, module: &ModuleKey) -> Option<&Registry> {
        self.middleware.get(module)
    }

    pub fn wrappers(&self) -> impl Iterator<Item = &Arc<InstanceWrapper>> {
        self.middleware.values().flat_map(Registry::iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::di::{Dependencies, Injectable};
    use crate::error::Result;
    use crate::exception::Exception;
    use crate::middleware::{Middleware, MiddlewareConsumer, MiddlewareRef, Next};
    use async_trait::async_trait;
    use axum::extract::Request;
    use axum::response::Response;

    struct Logger;

    impl Injectable for Logger {
        fn construct(_: &Dependencies) -> Result<Self> {
            Ok(Logger)
        }
    }

    #[async_trait]
    impl Middleware for Logger {
        async fn handle(&self, request: Request, next: Next) -> std::result::Result<Response, Exception> {
            Ok(next.run(request).await)
        }
    }

    async fn passthrough(request: Request, next: Next) -> std::result::Result<Response, Exception> {
        Ok(next.run(request).await)
    }

    #[test]
    fn test_class_middleware_is_shared_and_functions_get_unique_tokens() {
        let mut consumer = MiddlewareConsumer::new();
        consumer
            .apply([MiddlewareRef::class::<Logger>(), MiddlewareRef::from_fn(passthrough)])
            .for_routes(["/cats"])
            .apply([MiddlewareRef::class::<Logger>(), MiddlewareRef::from_fn(passthrough)])
            .for_routes(["/dogs"]);

        let module = ModuleKey::from("AppModule");
        let mut container = MiddlewareContainer::new();
        container.insert_config(consumer.build().unwrap(), &module);

        let bindings = container.bindings(&module);
        assert_eq!(bindings.len(), 2);
        assert!(Arc::ptr_eq(&bindings[0].wrappers[0], &bindings[1].wrappers[0]));
        assert_ne!(bindings[0].wrappers[1].token(), bindings[1].wrappers[1].token());
        assert!(bindings[0].wrappers[1].token().as_str().starts_with("FunctionMiddleware (UUID: "));
        assert_eq!(container.middleware(&module).unwrap().len(), 3);
    }
}
