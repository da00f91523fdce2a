//! No-op memory service — for deployments with memory disabled.

use async_trait::async_trait;
use onager_core::error::MemoryError;
use onager_core::MemoryService;

/// Stores nothing, recalls nothing.
pub struct NoopMemory;

#[async_trait]
impl MemoryService for NoopMemory {
    fn name(&self) -> &str {
        "noop"
    }

    async fn retrieve(&self, _query: &str, _k: usize) -> Result<String, MemoryError> {
        Ok(String::new())
    }

    async fn store(&self, _content: &str) -> Result<(), MemoryError> {
        Ok(())
    }
}
