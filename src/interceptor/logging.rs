use crate::context::ExecutionContext;
use crate::interceptor::{CallHandler, HandlerResult, Interceptor};
use async_trait::async_trait;
use std::time::Instant;

/// An interceptor that logs handler timing and outcome
#[derive(Clone, Default)]
pub struct LoggingInterceptor;

#[async_trait]
impl Interceptor for LoggingInterceptor {
    async fn intercept(&self, context: &ExecutionContext, next: CallHandler) -> HandlerResult {
        let start = Instant::now();
        tracing::debug!(
            target: "keystone::logging_interceptor",
            "--> {} {} ({}::{})",
            context.method(),
            context.uri(),
            context.class_name(),
            context.handler_name()
        );

        match next.handle().await {
            Ok(value) => {
                tracing::info!(
                    target: "keystone::logging_interceptor",
                    "<-- {} {} {:?}",
                    context.method(),
                    context.uri(),
                    start.elapsed()
                );
                Ok(value)
            }
            Err(e) => {
                tracing::warn!(
                    target: "keystone::logging_interceptor",
                    "<-- {} {} ERROR: {} {:?}",
                    context.method(),
                    context.uri(),
                    e,
                    start.elapsed()
                );
                Err(e)
            }
        }
    }
}
