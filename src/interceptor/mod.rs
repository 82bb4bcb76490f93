mod consumer;
mod context;

pub mod logging;

pub use consumer::InterceptorsConsumer;
pub use context::InterceptorsContextCreator;

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;

use crate::context::{Enhancer, ExecutionContext};
use crate::di::{Injectable, ProviderDef};
use crate::exception::Exception;

/// Token for registering a provider as a global interceptor.
pub const APP_INTERCEPTOR: &str = "APP_INTERCEPTOR";

/// Handler output before it is turned into a response.
pub type HandlerResult = Result<Value, Exception>;

/// Represents the rest of the chain: inner interceptors and the handler
pub struct CallHandler {
    pub(crate) run: Box<dyn FnOnce() -> BoxFuture<'static, HandlerResult> + Send>,
}

impl CallHandler {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() -> BoxFuture<'static, HandlerResult> + Send + 'static,
    {
        Self { run: Box::new(f) }
    }

    /// Execute the next handler
    pub async fn handle(self) -> HandlerResult {
        (self.run)().await
    }
}

/// The Interceptor trait
///
/// Interceptors wrap the handler: they may act before and after it, replace
/// its result, or skip it entirely by not calling `next`.
///
/// # Example
/// ```ignore
/// struct Timing;
///
/// #[async_trait]
/// impl Interceptor for Timing {
///     async fn intercept(&self, context: &ExecutionContext, next: CallHandler) -> HandlerResult {
///         let start = Instant::now();
///         let value = next.handle().await?;
///         tracing::debug!(elapsed = ?start.elapsed(), "{}", context.handler_name());
///         Ok(value)
///     }
/// }
/// ```
#[async_trait]
pub trait Interceptor: Send + Sync + 'static {
    async fn intercept(&self, context: &ExecutionContext, next: CallHandler) -> HandlerResult;
}

pub type InterceptorRef = Enhancer<dyn Interceptor>;

impl Enhancer<dyn Interceptor> {
    pub fn new<I: Interceptor>(interceptor: I) -> Self {
        Self::Instance(Arc::new(interceptor))
    }

    pub fn class<I: Interceptor + Injectable>() -> Self {
        Self::Class(
            ProviderDef::class::<I>()
                .cast::<I, dyn Interceptor>(|interceptor: Arc<I>| -> Arc<dyn Interceptor> { interceptor }),
        )
    }
}
