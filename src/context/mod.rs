mod enhancer;

pub use enhancer::Enhancer;
pub(crate) use enhancer::resolve_enhancers;

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use axum::body::Body;
use axum::extract::{Query, Request};
use axum::http::{HeaderMap, Method, Uri, request::Parts};

use crate::di::ContextId;
use crate::exception::ArgumentsHost;
use crate::router::PathParams;

/// Everything the pipeline knows about the request being handled.
pub struct ExecutionContext {
    parts: Parts,
    body: Mutex<Option<Body>>,
    params: PathParams,
    context_id: ContextId,
    class_name: String,
    handler_name: String,
}

impl ExecutionContext {
    pub fn new(
        request: Request,
        context_id: ContextId,
        class_name: impl Into<String>,
        handler_name: impl Into<String>,
    ) -> Self {
        let (parts, body) = request.into_parts();
        let params = parts.extensions.get::<PathParams>().cloned().unwrap_or_default();
        Self {
            parts,
            body: Mutex::new(Some(body)),
            params,
            context_id,
            class_name: class_name.into(),
            handler_name: handler_name.into(),
        }
    }

    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    pub fn path(&self) -> &str {
        self.parts.uri.path()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.parts.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn params(&self) -> &PathParams {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    pub fn query(&self) -> HashMap<String, String> {
        Query::<HashMap<String, String>>::try_from_uri(&self.parts.uri)
            .map(|Query(query)| query)
            .unwrap_or_default()
    }

    pub fn extensions(&self) -> &axum::http::Extensions {
        &self.parts.extensions
    }

    pub fn context_id(&self) -> ContextId {
        self.context_id
    }

    /// Name of the controller owning the handler.
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn handler_name(&self) -> &str {
        &self.handler_name
    }

    /// Takes the raw request body; `None` once taken.
    pub fn take_body(&self) -> Option<Body> {
        self.body
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    pub fn host(&self) -> ArgumentsHost {
        ArgumentsHost::new(self.parts.method.clone(), self.parts.uri.clone(), self.context_id)
    }
}
