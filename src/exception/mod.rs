mod base;
mod context;
mod handler;
mod http;
mod zone;

pub use base::BaseExceptionFilter;
pub use context::RouterExceptionFilters;
pub use handler::ExceptionsHandler;
pub use http::HttpException;
pub use zone::ExceptionsZone;

use std::error::Error;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::extract::Request;
use axum::http::{Method, Uri};
use axum::response::Response;

use crate::context::Enhancer;
use crate::di::{ContextId, ContextIdFactory, Injectable, ProviderDef};

/// Token for registering a provider as a global exception filter.
pub const APP_FILTER: &str = "APP_FILTER";

/// A type-erased error raised while handling a request
pub type Exception = Box<dyn Error + Send + Sync>;

/// Request data available to exception filters.
pub struct ArgumentsHost {
    method: Method,
    uri: Uri,
    context_id: ContextId,
    response_sent: AtomicBool,
}

impl ArgumentsHost {
    pub fn new(method: Method, uri: Uri, context_id: ContextId) -> Self {
        Self {
            method,
            uri,
            context_id,
            response_sent: AtomicBool::new(false),
        }
    }

    pub fn from_request(request: &Request) -> Self {
        Self::new(
            request.method().clone(),
            request.uri().clone(),
            ContextIdFactory::get_by_request(request).unwrap_or(ContextId::STATIC),
        )
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn context_id(&self) -> ContextId {
        self.context_id
    }

    pub fn is_response_sent(&self) -> bool {
        self.response_sent.load(Ordering::SeqCst)
    }

    /// Marks the response as sent; returns whether it already was.
    pub(crate) fn mark_sent(&self) -> bool {
        self.response_sent.swap(true, Ordering::SeqCst)
    }
}

/// Declares an exception type a filter handles.
#[derive(Clone, Copy)]
pub struct ExceptionMatcher {
    name: &'static str,
    matches: fn(&(dyn Error + Send + Sync + 'static)) -> bool,
}

impl ExceptionMatcher {
    pub fn of<E: Error + 'static>() -> Self {
        Self {
            name: std::any::type_name::<E>(),
            matches: |exception| exception.is::<E>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn matches(&self, exception: &(dyn Error + Send + Sync + 'static)) -> bool {
        (self.matches)(exception)
    }
}

impl std::fmt::Debug for ExceptionMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ExceptionMatcher({})", self.name)
    }
}

/// The ExceptionFilter trait
///
/// Filters turn errors raised during request processing into responses.
/// A filter with no declared exception types catches everything.
pub trait ExceptionFilter: Send + Sync + 'static {
    fn catches(&self) -> Vec<ExceptionMatcher> {
        Vec::new()
    }

    fn catch(&self, exception: Exception, host: &ArgumentsHost) -> Response;
}

pub type FilterRef = Enhancer<dyn ExceptionFilter>;

impl Enhancer<dyn ExceptionFilter> {
    pub fn new<F: ExceptionFilter>(filter: F) -> Self {
        Self::Instance(Arc::new(filter))
    }

    pub fn class<F: ExceptionFilter + Injectable>() -> Self {
        Self::Class(
            ProviderDef::class::<F>()
                .cast::<F, dyn ExceptionFilter>(|filter: Arc<F>| -> Arc<dyn ExceptionFilter> { filter }),
        )
    }
}
