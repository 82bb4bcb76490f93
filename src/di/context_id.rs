use std::fmt;
use std::sync::{Arc, Weak};

use axum::extract::Request;
use dashmap::DashMap;
use uuid::Uuid;

use crate::di::InstanceWrapper;

/// Identity of one resolution context, normally one inbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(Uuid);

impl ContextId {
    /// Context used for everything built at bootstrap.
    pub const STATIC: ContextId = ContextId(Uuid::nil());

    pub fn is_static(&self) -> bool {
        *self == Self::STATIC
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_static() {
            f.write_str("static")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

pub struct ContextIdFactory;

impl ContextIdFactory {
    pub fn create() -> ContextId {
        ContextId(Uuid::new_v4())
    }

    /// Reads the identity attached to a request, if any.
    pub fn get_by_request(request: &Request) -> Option<ContextId> {
        request
            .extensions()
            .get::<RequestContext>()
            .map(RequestContext::id)
    }
}

/// Tracks which wrappers hold per-context instances so they can be released.
#[derive(Default)]
pub struct ContextRegistry {
    touched: DashMap<ContextId, Vec<Weak<InstanceWrapper>>>,
}

impl ContextRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn track(&self, context: ContextId, wrapper: &Arc<InstanceWrapper>) {
        if context.is_static() {
            return;
        }
        self.touched
            .entry(context)
            .or_default()
            .push(Arc::downgrade(wrapper));
    }

    /// Drops every instance cached for `context`.
    pub fn release(&self, context: ContextId) {
        if let Some((_, wrappers)) = self.touched.remove(&context) {
            for wrapper in wrappers.iter().filter_map(Weak::upgrade) {
                wrapper.release_context(context);
            }
            tracing::trace!(target: "keystone::injector", context = %context, "context released");
        }
    }

    pub fn active_contexts(&self) -> usize {
        self.touched.len()
    }
}

struct ContextHandle {
    id: ContextId,
    registry: Weak<ContextRegistry>,
}

impl Drop for ContextHandle {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.release(self.id);
        }
    }
}

/// Request extension carrying the context identity.
///
/// Per-context instances are released once the last clone is dropped.
#[derive(Clone)]
pub struct RequestContext(Arc<ContextHandle>);

impl RequestContext {
    pub fn new(id: ContextId, registry: &Arc<ContextRegistry>) -> Self {
        Self(Arc::new(ContextHandle {
            id,
            registry: Arc::downgrade(registry),
        }))
    }

    pub fn id(&self) -> ContextId {
        self.0.id
    }

    /// Returns the request's identity, attaching a fresh one on first use.
    pub fn attach(request: &mut Request, registry: &Arc<ContextRegistry>) -> ContextId {
        if let Some(existing) = ContextIdFactory::get_by_request(request) {
            return existing;
        }
        let id = ContextIdFactory::create();
        request
            .extensions_mut()
            .insert(RequestContext::new(id, registry));
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_static_context() {
        assert!(ContextId::STATIC.is_static());
        assert!(!ContextIdFactory::create().is_static());
        assert_ne!(ContextIdFactory::create(), ContextIdFactory::create());
    }

    #[test]
    fn test_attach_is_idempotent() {
        let registry = Arc::new(ContextRegistry::new());
        let mut request = Request::new(Body::empty());
        let first = RequestContext::attach(&mut request, &registry);
        let second = RequestContext::attach(&mut request, &registry);
        assert_eq!(first, second);
        assert_eq!(ContextIdFactory::get_by_request(&request), Some(first));
    }
}
