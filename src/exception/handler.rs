use std::sync::Arc;

use axum::response::Response;

use crate::exception::{ArgumentsHost, BaseExceptionFilter, Exception, ExceptionFilter};

/// Picks the filter for an exception and produces the error response.
///
/// Filters are tried in order: the first one declaring the exception's type
/// wins, then the first catch-all filter, then [`BaseExceptionFilter`].
#[derive(Clone, Default)]
pub struct ExceptionsHandler {
    filters: Vec<Arc<dyn ExceptionFilter>>,
    base: Arc<BaseExceptionFilter>,
}

impl ExceptionsHandler {
    pub fn new(filters: Vec<Arc<dyn ExceptionFilter>>) -> Self {
        Self {
            filters,
            base: Arc::new(BaseExceptionFilter),
        }
    }

    pub fn filters(&self) -> &[Arc<dyn ExceptionFilter>] {
        &self.filters
    }

    pub fn next(&self, exception: Exception, host: &ArgumentsHost) -> Response {
        if host.mark_sent() {
            tracing::warn!(
                target: "keystone::exceptions_handler",
                uri = %host.uri(),
                "exception raised after the response was sent: {exception}"
            );
        }
        match self.select(&exception) {
            Some(filter) => filter.catch(exception, host),
            None => self.base.catch(exception, host),
        }
    }

    fn select(&self, exception: &Exception) -> Option<&Arc<dyn ExceptionFilter>> {
        let error = exception.as_ref();
        self.filters
            .iter()
            .find(|filter| filter.catches().iter().any(|m| m.matches(error)))
            .or_else(|| self.filters.iter().find(|filter| filter.catches().is_empty()))
    }
}
