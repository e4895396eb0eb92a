use std::sync::Arc;

use super::{Span, TextSplitter};
use crate::error::ChunkError;
use crate::tokenizer::TokenEncoder;

/// Strict token-count windowing.
///
/// Advances a window of `chunk_size` tokens with a step of
/// `chunk_size - chunk_overlap`, so consecutive windows share exactly the
/// configured overlap on both sides. Window edges that would land inside a
/// multi-codepoint grapheme are nudged backward to the nearest safe
/// boundary; because the adjustment is a pure function of the boundary,
/// neighbouring windows stay perfectly tiled and the original text can be
/// reconstructed from the spans.
///
/// Span offsets are token offsets.
pub struct TokenSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    encoder: Arc<TokenEncoder>,
}

impl TokenSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize, encoder: Arc<TokenEncoder>) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            encoder,
        }
    }
}

impl TextSplitter for TokenSplitter {
    fn split_text(&self, text: &str) -> Result<Vec<Span>, ChunkError> {
        if text.is_empty() {
            return Ok(Vec::new());
        }
        let tokens = self.encoder.encode(text);
        if tokens.len() <= self.chunk_size {
            return Ok(vec![Span {
                text: text.to_string(),
                start: 0,
                end: tokens.len(),
            }]);
        }

        // chunk_overlap < chunk_size is a config invariant, so step >= 1.
        let step = self.chunk_size - self.chunk_overlap;
        let mut spans = Vec::new();
        let mut window_start = 0;
        loop {
            let window_end = (window_start + self.chunk_size).min(tokens.len());
            let (start_tok, start_byte) = self.encoder.safe_boundary(text, &tokens, window_start);
            let (end_tok, end_byte) = self.encoder.safe_boundary(text, &tokens, window_end);
            if end_byte > start_byte {
                spans.push(Span {
                    text: text[start_byte..end_byte].to_string(),
                    start: start_tok,
                    end: end_tok,
                });
            }
            if window_end == tokens.len() {
                break;
            }
            window_start += step;
        }
        Ok(spans)
    }
}
