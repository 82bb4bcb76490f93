use std::sync::Arc;

use serde_json::Value;

use crate::pipe::{ArgumentMetadata, Pipe, PipeResult};

pub struct PipesConsumer;

impl PipesConsumer {
    /// Feeds the value through each pipe in order.
    pub async fn apply(
        value: Value,
        metadata: &ArgumentMetadata,
        pipes: &[Arc<dyn Pipe>],
    ) -> PipeResult<Value> {
        let mut value = value;
        for pipe in pipes {
            value = pipe.transform(value, metadata).await?;
        }
        Ok(value)
    }
}
