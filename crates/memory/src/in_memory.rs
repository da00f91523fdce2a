//! In-memory store — keyword-scored notes, useful for single sessions
//! and tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use onager_core::error::MemoryError;
use onager_core::MemoryService;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct Note {
    content: String,
    created_at: DateTime<Utc>,
}

/// A memory service that keeps notes in a Vec and retrieves the top-k
/// keyword matches, formatted as a bulleted context block.
pub struct InMemoryStore {
    notes: Arc<RwLock<Vec<Note>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            notes: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn count(&self) -> usize {
        self.notes.read().await.len()
    }

    pub async fn clear(&self) {
        self.notes.write().await.clear();
    }

    /// Score a note for a query: keyword hits weighted down by length
    /// so a short on-topic note beats a long rambling one.
    fn score(content: &str, query_words: &[String]) -> f32 {
        let lower = content.to_lowercase();
        let hits: usize = query_words
            .iter()
            .map(|word| lower.matches(word.as_str()).count())
            .sum();
        hits as f32 / (content.len() as f32 / 100.0).max(1.0)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MemoryService for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn retrieve(&self, query: &str, k: usize) -> Result<String, MemoryError> {
        let query_words: Vec<String> = query
            .to_lowercase()
            .split_whitespace()
            .filter(|w| w.len() > 2)
            .map(str::to_string)
            .collect();
        if query_words.is_empty() {
            return Ok(String::new());
        }

        let notes = self.notes.read().await;
        let mut scored: Vec<(f32, &Note)> = notes
            .iter()
            .map(|note| (Self::score(&note.content, &query_words), note))
            .filter(|(score, _)| *score > 0.0)
            .collect();

        // Recency breaks score ties.
        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(b.1.created_at.cmp(&a.1.created_at))
        });
        scored.truncate(k);

        if scored.is_empty() {
            return Ok(String::new());
        }

        let block = scored
            .iter()
            .map(|(_, note)| format!("- {}", note.content))
            .collect::<Vec<_>>()
            .join("\n");
        Ok(block)
    }

    async fn store(&self, content: &str) -> Result<(), MemoryError> {
        if content.trim().is_empty() {
            return Ok(());
        }
        self.notes.write().await.push(Note {
            content: content.trim().to_string(),
            created_at: Utc::now(),
        });
        Ok(())
    }
}
