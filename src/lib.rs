// Public API exports
pub mod chunk;
pub mod config;
pub mod embedder;
pub mod error;
pub mod ident;
pub mod ingest;
pub mod splitter;
pub mod tokenizer;

// Re-export main types for convenience
pub use chunk::{chunk_document, Chunk};
pub use config::{ChunkConfig, OverlapUnit, Strategy, DEFAULT_ENCODING};
pub use error::ChunkError;
pub use ident::{IdAssigner, IdMode};
pub use ingest::{read_documents, Document, ErrorPolicy, JsonlReader, RecordIssue};
pub use splitter::{build_splitter, build_splitter_with_provider, Span, TextSplitter};
pub use tokenizer::TokenEncoder;

pub use embedder::{Batcher, EmbeddingProvider, HttpEmbeddingClient};
