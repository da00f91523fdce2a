//! The memory-service contract.
//!
//! Retrieval is a black box to the loop: give it a query and a recall
//! count, get back a context block to splice into a prompt. An empty
//! block is a normal answer, not an error.

use async_trait::async_trait;

use crate::error::MemoryError;

#[async_trait]
pub trait MemoryService: Send + Sync {
    /// Backend name, for logs.
    fn name(&self) -> &str;

    /// Retrieve up to `k` relevant entries formatted as a context block.
    /// Returns an empty string when nothing relevant is stored.
    async fn retrieve(&self, query: &str, k: usize) -> Result<String, MemoryError>;

    /// Store a note for later retrieval.
    async fn store(&self, content: &str) -> Result<(), MemoryError>;
}
