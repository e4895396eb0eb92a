use tiktoken_rs::{cl100k_base, o200k_base, p50k_base, p50k_edit, r50k_base, CoreBPE};
use unicode_segmentation::UnicodeSegmentation;

use crate::error::ChunkError;

/// Owned wrapper around a tiktoken encoding table.
///
/// The table is loaded once at construction and shared by reference (or
/// `Arc`) with every strategy that needs it; nothing here touches global
/// state.
pub struct TokenEncoder {
    name: String,
    bpe: CoreBPE,
}

impl TokenEncoder {
    /// Resolve an encoding table by its tiktoken name.
    pub fn by_name(name: &str) -> Result<Self, ChunkError> {
        let bpe = match name {
            "cl100k_base" => cl100k_base(),
            "o200k_base" => o200k_base(),
            "p50k_base" => p50k_base(),
            "p50k_edit" => p50k_edit(),
            "r50k_base" => r50k_base(),
            other => {
                return Err(ChunkError::Configuration(format!(
                    "unknown encoding '{other}' (expected cl100k_base, o200k_base, p50k_base, p50k_edit or r50k_base)"
                )))
            }
        }
        .map_err(|e| ChunkError::Configuration(format!("failed to load encoding '{name}': {e}")))?;

        Ok(Self {
            name: name.to_string(),
            bpe,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of tokens in `text`.
    pub fn count(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }

    /// Encode without special-token handling. Lossless: decoding the full
    /// sequence reproduces `text` byte for byte.
    pub fn encode(&self, text: &str) -> Vec<u32> {
        self.bpe.encode_ordinary(text)
    }

    /// Decode a token sequence. Fails when the sequence starts or ends
    /// inside a multi-byte codepoint, which is exactly the signal the token
    /// splitter uses to nudge a window edge backward.
    pub fn decode(&self, tokens: Vec<u32>) -> Result<String, ChunkError> {
        self.bpe
            .decode(tokens)
            .map_err(|e| ChunkError::Configuration(format!("token decode failed: {e}")))
    }

    /// Map a token boundary back to a byte offset in `text`, moving the
    /// boundary backward until it no longer bisects a codepoint or a
    /// grapheme cluster (combining marks, surrogate-pair emoji and the
    /// like). Returns the adjusted token boundary and its byte offset.
    ///
    /// `tokens` must be the encoding of `text`.
    pub fn safe_boundary(&self, text: &str, tokens: &[u32], boundary: usize) -> (usize, usize) {
        let mut b = boundary.min(tokens.len());
        loop {
            if b == 0 {
                return (0, 0);
            }
            if b == tokens.len() {
                return (b, text.len());
            }
            if let Ok(prefix) = self.bpe.decode(tokens[..b].to_vec()) {
                let offset = prefix.len();
                if is_grapheme_boundary(text, offset) {
                    return (b, offset);
                }
            }
            b -= 1;
        }
    }
}

/// True when `offset` falls on a grapheme-cluster boundary of `text`.
pub fn is_grapheme_boundary(text: &str, offset: usize) -> bool {
    if offset == 0 || offset == text.len() {
        return true;
    }
    if !text.is_char_boundary(offset) {
        return false;
    }
    text.grapheme_indices(true).any(|(i, _)| i == offset)
}
