mod consumer;
mod context;

pub use consumer::GuardsConsumer;
pub use context::GuardsContextCreator;

use std::sync::Arc;

use async_trait::async_trait;

use crate::context::{Enhancer, ExecutionContext};
use crate::di::{Injectable, ProviderDef};
use crate::exception::Exception;

/// Token for registering a provider as a global guard.
pub const APP_GUARD: &str = "APP_GUARD";

/// `Ok(true)` lets the request through, `Ok(false)` rejects it with 403.
pub type GuardResult = Result<bool, Exception>;

#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

/// The Guard trait
/// Implement this to protect routes
#[async_trait]
pub trait Guard: Send + Sync + 'static {
    async fn can_activate(&self, context: &ExecutionContext) -> GuardResult;
}

pub type GuardRef = Enhancer<dyn Guard>;

impl Enhancer<dyn Guard> {
    pub fn new<G: Guard>(guard: G) -> Self {
        Self::Instance(Arc::new(guard))
    }

    pub fn class<G: Guard + Injectable>() -> Self {
        Self::Class(ProviderDef::class::<G>().cast::<G, dyn Guard>(|guard: Arc<G>| -> Arc<dyn Guard> { guard }))
    }
}
