use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use axum::extract::Request;
use axum::response::Response;
use futures::FutureExt;
use futures::future::BoxFuture;

use crate::adapter::RequestHandler;
use crate::context::ExecutionContext;
use crate::di::{ContextId, ContextIdFactory};
use crate::exception::{ArgumentsHost, Exception, ExceptionsHandler};
use crate::router::RouteExecution;

/// Error boundary around a route: every error or panic becomes a response
/// produced by the exceptions handler.
pub struct RouterProxy;

impl RouterProxy {
    pub fn create_proxy(execution: Arc<RouteExecution>, exceptions: Arc<ExceptionsHandler>) -> RequestHandler {
        Arc::new(move |request: Request| -> BoxFuture<'static, Response> {
            let execution = execution.clone();
            let exceptions = exceptions.clone();
            Box::pin(async move { Self::handle(&execution, &exceptions, request).await })
        })
    }

    pub async fn handle(execution: &RouteExecution, exceptions: &ExceptionsHandler, request: Request) -> Response {
        let context_id = ContextIdFactory::get_by_request(&request).unwrap_or(ContextId::STATIC);
        let context = Arc::new(ExecutionContext::new(
            request,
            context_id,
            execution.class_name(),
            execution.handler_name(),
        ));
        let host = context.host();
        Self::guard(execution.execute(context), exceptions, &host).await
    }

    pub(crate) async fn guard<F>(future: F, exceptions: &ExceptionsHandler, host: &ArgumentsHost) -> Response
    where
        F: Future<Output = Result<Response, Exception>>,
    {
        match AssertUnwindSafe(future).catch_unwind().await {
            Ok(Ok(response)) => response,
            Ok(Err(exception)) => exceptions.next(exception, host),
            Err(panic) => exceptions.next(panic_exception(panic), host),
        }
    }
}

fn panic_exception(panic: Box<dyn Any + Send>) -> Exception {
    let message = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("handler panicked: {message}").into()
}
