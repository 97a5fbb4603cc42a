//! The external text generator every pipeline stage delegates to.

use async_trait::async_trait;

use crate::error::Result;

/// Stateless prompt-in, text-out model call.
///
/// Each call is independent; no conversation state is kept between calls.
/// Implementations must be safe to share across tasks.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}
