use std::sync::Arc;

use crate::context::ExecutionContext;
use crate::guard::{Guard, GuardResult};

pub struct GuardsConsumer;

impl GuardsConsumer {
    /// Runs guards in order, stopping at the first rejection.
    pub async fn try_activate(guards: &[Arc<dyn Guard>], context: &ExecutionContext) -> GuardResult {
        for guard in guards {
            if !guard.can_activate(context).await? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
