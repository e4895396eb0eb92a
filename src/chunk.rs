use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ChunkError;
use crate::ident::IdAssigner;
use crate::ingest::Document;
use crate::splitter::TextSplitter;

/// A bounded segment of a source document, ready for embedding/retrieval.
/// Serializes to one JSON line of the output file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub text: String,
    #[serde(rename = "source_identifier")]
    pub source_id: String,
    /// 0-based sequence within the source document.
    pub position: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    pub start_offset: usize,
    pub end_offset: usize,
}

/// Split one document and assign IDs. Pure per document: no state is
/// shared between calls, and chunk positions increase monotonically.
pub fn chunk_document(
    document: &Document,
    splitter: &dyn TextSplitter,
    assigner: &IdAssigner,
) -> Result<Vec<Chunk>, ChunkError> {
    let spans = splitter.split_text(&document.text)?;
    let chunks: Vec<Chunk> = spans
        .into_iter()
        .enumerate()
        .map(|(position, span)| Chunk {
            id: assigner.assign(&document.source_id, document.page, position, &span.text),
            text: span.text,
            source_id: document.source_id.clone(),
            position,
            page: document.page,
            start_offset: span.start,
            end_offset: span.end,
        })
        .collect();

    debug!(
        source = %document.source_id,
        chunks = chunks.len(),
        "document split"
    );
    Ok(chunks)
}
