mod batcher;
mod client;
mod types;

#[cfg(test)]
mod tests;

pub use batcher::Batcher;
pub use client::HttpEmbeddingClient;
pub use types::{EmbeddingRequest, EmbeddingResponse};

use crate::error::ChunkError;

/// External embedding provider boundary.
///
/// The semantic splitter calls this once per batch of sentences; the call
/// is blocking and is not retried here. Retry and backoff policy belongs to
/// the caller.
pub trait EmbeddingProvider {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ChunkError>;
}
