//! LLM service port.
//!
//! The core only needs a liveness probe for capability validation; the
//! generation surface lives outside this crate.

use async_trait::async_trait;

use crate::domain::errors::CoreResult;

#[async_trait]
pub trait LlmService: Send + Sync {
    fn name(&self) -> &'static str;

    /// Liveness probe, used by validate-then-swap.
    async fn ping(&self) -> CoreResult<()>;

    /// Release resources held by the service.
    async fn close(&self);
}
