use crate::controller::Controller;
use crate::di::Token;
use crate::error::{KeystoneError, Result};
use crate::middleware::{MiddlewareRef, RouteInfo};

/// What a middleware is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteTarget {
    Route(RouteInfo),
    /// Every route of a controller.
    Controller(Token),
}

impl RouteTarget {
    pub fn controller<C: Controller + 'static>() -> Self {
        Self::Controller(Token::of::<C>())
    }
}

impl From<&str> for RouteTarget {
    fn from(path: &str) -> Self {
        Self::Route(path.into())
    }
}

impl From<String> for RouteTarget {
    fn from(path: String) -> Self {
        Self::Route(path.into())
    }
}

impl From<RouteInfo> for RouteTarget {
    fn from(info: RouteInfo) -> Self {
        Self::Route(info)
    }
}

/// One `apply(..).exclude(..).for_routes(..)` statement.
#[derive(Clone)]
pub struct MiddlewareConfiguration {
    pub middleware: Vec<MiddlewareRef>,
    pub for_routes: Vec<RouteTarget>,
    pub exclude: Vec<RouteInfo>,
}

/// Collects a module's middleware bindings.
///
/// ```ignore
/// consumer
///     .apply([MiddlewareRef::class::<LoggerMiddleware>()])
///     .exclude([RouteInfo::new("/health", RequestMethod::Get)])
///     .for_routes(["/cats"]);
/// ```
#[derive(Default)]
pub struct MiddlewareConsumer {
    configurations: Vec<MiddlewareConfiguration>,
    invalid: bool,
}

impl MiddlewareConsumer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, middleware: impl IntoIterator<Item = MiddlewareRef>) -> MiddlewareConfigProxy<'_> {
        let middleware: Vec<MiddlewareRef> = middleware.into_iter().collect();
        if middleware.is_empty() {
            self.invalid = true;
        }
        MiddlewareConfigProxy {
            consumer: self,
            middleware,
            exclude: Vec::new(),
        }
    }

    pub fn build(self) -> Result<Vec<MiddlewareConfiguration>> {
        if self.invalid {
            return Err(KeystoneError::InvalidMiddlewareConfiguration);
        }
        Ok(self.configurations)
    }
}

pub struct MiddlewareConfigProxy<'a> {
    consumer: &'a mut MiddlewareConsumer,
    middleware: Vec<MiddlewareRef>,
    exclude: Vec<RouteInfo>,
}

impl<'a> MiddlewareConfigProxy<'a> {
    pub fn exclude<R: Into<RouteInfo>>(mut self, routes: impl IntoIterator<Item = R>) -> Self {
        self.exclude.extend(routes.into_iter().map(Into::into));
        self
    }

    pub fn for_routes<R: Into<RouteTarget>>(self, routes: impl IntoIterator<Item = R>) -> &'a mut MiddlewareConsumer {
        self.consumer.configurations.push(MiddlewareConfiguration {
            middleware: self.middleware,
            for_routes: routes.into_iter().map(Into::into).collect(),
            exclude: self.exclude,
        });
        self.consumer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exception::Exception;
    use crate::middleware::Next;
    use crate::router::RequestMethod;
    use axum::extract::Request;
    use axum::response::Response;

    async fn passthrough(request: Request, next: Next) -> std::result::Result<Response, Exception> {
        Ok(next.run(request).await)
    }

    #[test]
    fn test_collects_configurations() {
        let mut consumer = MiddlewareConsumer::new();
        consumer
            .apply([MiddlewareRef::from_fn(passthrough)])
            .exclude([RouteInfo::new("/cats/health", RequestMethod::Get)])
            .for_routes(["/cats"])
            .apply([MiddlewareRef::from_fn(passthrough)])
            .for_routes([RouteInfo::new("/dogs", RequestMethod::Post)]);

        let configurations = consumer.build().unwrap();
        assert_eq!(configurations.len(), 2);
        assert_eq!(configurations[0].exclude.len(), 1);
        assert_eq!(
            configurations[1].for_routes,
            vec![RouteTarget::Route(RouteInfo::new("/dogs", RequestMethod::Post))]
        );
    }

    #[test]
    fn test_empty_apply_is_invalid() {
        let mut consumer = MiddlewareConsumer::new();
        consumer.apply(Vec::new()).for_routes(["/"]);
        assert!(matches!(
            consumer.build(),
            Err(KeystoneError::InvalidMiddlewareConfiguration)
        ));
    }
}
