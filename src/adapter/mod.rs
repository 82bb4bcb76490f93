mod axum;

pub use self::axum::{AxumAdapter, shutdown_signal};

use std::sync::Arc;

use ::axum::extract::Request;
use ::axum::response::Response;
use futures::future::BoxFuture;

use crate::error::Result;
use crate::middleware::Next;
use crate::router::RequestMethod;

pub type RequestHandler = Arc<dyn Fn(Request) -> BoxFuture<'static, Response> + Send + Sync>;

pub type MiddlewareHandler = Arc<dyn Fn(Request, Next) -> BoxFuture<'static, Response> + Send + Sync>;

/// Boundary between the framework core and an HTTP server.
///
/// Dispatch order must follow registration order: middleware first, then
/// routes, each in the order they were registered.
pub trait HttpAdapter: Send + 'static {
    fn get_request_method(&self, request: &Request) -> Option<RequestMethod> {
        RequestMethod::from_method(request.method())
    }

    fn get_request_url(&self, request: &Request) -> String {
        request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| request.uri().path().to_string())
    }

    fn register_route(&mut self, method: RequestMethod, path: &str, handler: RequestHandler) -> Result<()>;

    /// `RequestMethod::All` middleware match any path under `path`; method
    /// specific middleware match `path` exactly.
    fn register_middleware(
        &mut self,
        method: RequestMethod,
        path: &str,
        handler: MiddlewareHandler,
    ) -> Result<()>;

    fn set_not_found_handler(&mut self, handler: RequestHandler);
}
