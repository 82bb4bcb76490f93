mod consumer;
mod context;

pub mod builtins;

pub use consumer::PipesConsumer;
pub use context::PipesContextCreator;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use strum_macros::Display;

use crate::context::Enhancer;
use crate::di::{Injectable, ProviderDef};
use crate::exception::Exception;

/// Token for registering a provider as a global pipe.
pub const APP_PIPE: &str = "APP_PIPE";

pub type PipeResult<T> = Result<T, Exception>;

#[derive(Debug, thiserror::Error)]
pub enum PipeError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Transformation failed: {0}")]
    Transformation(String),

    #[error("Internal pipe error: {0}")]
    Internal(String),
}

/// Where a handler argument comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ParamKind {
    Param,
    Query,
    Header,
    Custom,
}

/// Describes the argument a pipe is transforming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentMetadata {
    pub kind: ParamKind,
    /// Parameter name, query key or header name.
    pub data: Option<String>,
    pub index: usize,
}

/// The Pipe trait for transformation and validation
///
/// Pipes run after guards and before interceptors, once per handler argument.
#[async_trait]
pub trait Pipe: Send + Sync + 'static {
    async fn transform(&self, value: Value, metadata: &ArgumentMetadata) -> PipeResult<Value>;
}

pub type PipeRef = Enhancer<dyn Pipe>;

impl Enhancer<dyn Pipe> {
    pub fn new<P: Pipe>(pipe: P) -> Self {
        Self::Instance(Arc::new(pipe))
    }

    pub fn class<P: Pipe + Injectable>() -> Self {
        Self::Class(ProviderDef::class::<P>().cast::<P, dyn Pipe>(|pipe: Arc<P>| -> Arc<dyn Pipe> { pipe }))
    }
}
