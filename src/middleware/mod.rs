mod builder;
mod container;
mod module;
mod resolver;
mod routes_mapper;
mod utils;

pub use builder::{MiddlewareConfigProxy, MiddlewareConfiguration, MiddlewareConsumer, RouteTarget};
pub use container::{MiddlewareBinding, MiddlewareContainer};
pub use module::MiddlewareModule;
pub use resolver::MiddlewareResolver;
pub use routes_mapper::RoutesMapper;
pub use utils::{ExcludedRoute, is_route_excluded};

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::Request;
use axum::response::Response;
use futures::future::BoxFuture;

use crate::context::Enhancer;
use crate::di::{Injectable, ProviderDef};
use crate::exception::Exception;
use crate::router::RequestMethod;

/// Represents the rest of the middleware chain and the route handler
pub struct Next {
    run: Box<dyn FnOnce(Request) -> BoxFuture<'static, Response> + Send>,
}

impl Next {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(Request) -> BoxFuture<'static, Response> + Send + 'static,
    {
        Self { run: Box::new(f) }
    }

    /// Execute the next handler
    pub async fn run(self, request: Request) -> Response {
        (self.run)(request).await
    }
}

/// The Middleware trait
///
/// Middleware runs before route matching completes and sees the raw request.
/// Returning an error hands it to the global exception filters.
#[async_trait]
pub trait Middleware: Send + Sync + 'static {
    async fn handle(&self, request: Request, next: Next) -> Result<Response, Exception>;
}

struct FnMiddleware<F>(F);

#[async_trait]
impl<F, Fut> Middleware for FnMiddleware<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, Exception>> + Send + 'static,
{
    async fn handle(&self, request: Request, next: Next) -> Result<Response, Exception> {
        (self.0)(request, next).await
    }
}

pub type MiddlewareRef = Enhancer<dyn Middleware>;

impl Enhancer<dyn Middleware> {
    pub fn new<M: Middleware>(middleware: M) -> Self {
        Self::Instance(Arc::new(middleware))
    }

    pub fn class<M: Middleware + Injectable>() -> Self {
        Self::Class(
            ProviderDef::class::<M>()
                .cast::<M, dyn Middleware>(|middleware: Arc<M>| -> Arc<dyn Middleware> { middleware }),
        )
    }

    /// Functional middleware.
    pub fn from_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response, Exception>> + Send + 'static,
    {
        Self::Instance(Arc::new(FnMiddleware(f)))
    }
}

/// A path with the method it applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
    pub path: String,
    pub method: RequestMethod,
}

impl RouteInfo {
    pub fn new(path: impl Into<String>, method: RequestMethod) -> Self {
        Self {
            path: path.into(),
            method,
        }
    }
}

impl From<&str> for RouteInfo {
    fn from(path: &str) -> Self {
        Self::new(path, RequestMethod::All)
    }
}

impl From<String> for RouteInfo {
    fn from(path: String) -> Self {
        Self::new(path, RequestMethod::All)
    }
}
