use std::sync::Arc;

use crate::context::ExecutionContext;
use crate::interceptor::{CallHandler, HandlerResult, Interceptor};

pub struct InterceptorsConsumer;

impl InterceptorsConsumer {
    /// Nests the handler inside the interceptors; the first one is outermost.
    pub async fn intercept(
        interceptors: &[Arc<dyn Interceptor>],
        context: Arc<ExecutionContext>,
        handler: CallHandler,
    ) -> HandlerResult {
        if interceptors.is_empty() {
            return handler.handle().await;
        }

        let mut chain = handler;
        for interceptor in interceptors.iter().rev() {
            let interceptor = interceptor.clone();
            let context = context.clone();
            let next = chain;
            chain = CallHandler::new(move || {
                Box::pin(async move { interceptor.intercept(&context, next).await })
            });
        }
        chain.handle().await
    }
}
