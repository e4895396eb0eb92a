mod markdown;
mod overlap;
mod recursive;
mod semantic;
mod token;

#[cfg(test)]
mod tests;

pub use markdown::MarkdownSplitter;
pub use recursive::RecursiveSplitter;
pub use semantic::SemanticSplitter;
pub use token::TokenSplitter;

use std::sync::Arc;

use crate::config::{ChunkConfig, OverlapUnit, Strategy};
use crate::embedder::{EmbeddingProvider, HttpEmbeddingClient};
use crate::error::ChunkError;
use crate::tokenizer::TokenEncoder;

/// One chunk's worth of text plus its location in the source.
///
/// Offsets are character offsets for the character-measured strategies and
/// token offsets for the token strategy; either way they cover the full
/// padded text, so neighbouring spans overlap exactly where their texts do.
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

/// Capability shared by all four strategies: split a document's text into
/// an ordered sequence of chunk texts with offsets.
///
/// Contract: an empty input produces zero spans; input shorter than the
/// configured chunk size produces exactly one span with no overlap padding;
/// spans are emitted in source order.
pub trait TextSplitter {
    fn split_text(&self, text: &str) -> Result<Vec<Span>, ChunkError>;
}

/// Unit of measurement for chunk size and overlap in the character-based
/// strategies. Holds its own encoder handle so nothing reaches for global
/// state.
#[derive(Clone)]
pub enum Measure {
    Characters,
    Tokens(Arc<TokenEncoder>),
}

impl Measure {
    pub fn size_of(&self, text: &str) -> usize {
        match self {
            Measure::Characters => text.chars().count(),
            Measure::Tokens(encoder) => encoder.count(text),
        }
    }
}

/// Build the splitter matching `config.strategy`.
///
/// For the semantic strategy this wires up the blocking HTTP embedding
/// client; use [`build_splitter_with_provider`] to inject a different
/// provider.
pub fn build_splitter(config: &ChunkConfig) -> Result<Box<dyn TextSplitter>, ChunkError> {
    if config.strategy == Strategy::Semantic {
        let endpoint = config.embed_endpoint.clone().ok_or_else(|| {
            ChunkError::Configuration(
                "semantic strategy requires an embedding endpoint".to_string(),
            )
        })?;
        let client = HttpEmbeddingClient::new(
            endpoint,
            config.embed_model.clone(),
            config.azure_deployment.clone(),
        );
        return build_splitter_with_provider(config, Box::new(client));
    }
    build_with(config, None)
}

/// Build a splitter with an explicit embedding provider (ignored by the
/// non-semantic strategies).
pub fn build_splitter_with_provider(
    config: &ChunkConfig,
    provider: Box<dyn EmbeddingProvider>,
) -> Result<Box<dyn TextSplitter>, ChunkError> {
    build_with(config, Some(provider))
}

fn build_with(
    config: &ChunkConfig,
    provider: Option<Box<dyn EmbeddingProvider>>,
) -> Result<Box<dyn TextSplitter>, ChunkError> {
    // Guard against configs assembled field-by-field, bypassing the
    // constructor's validation.
    config.validate()?;

    let encoder = if config.needs_encoder() {
        Some(Arc::new(TokenEncoder::by_name(&config.encoding_name)?))
    } else {
        None
    };

    let measure = match (&config.overlap_unit, &encoder) {
        (OverlapUnit::Characters, _) => Measure::Characters,
        (OverlapUnit::Tokens, Some(encoder)) => Measure::Tokens(Arc::clone(encoder)),
        // needs_encoder() covers this arm.
        (OverlapUnit::Tokens, None) => unreachable!("encoder built for token overlap"),
    };

    match config.strategy {
        Strategy::Recursive => Ok(Box::new(RecursiveSplitter::new(
            config.chunk_size,
            config.chunk_overlap,
            measure,
            config.separators.clone(),
        ))),
        Strategy::Markdown => Ok(Box::new(MarkdownSplitter::new(
            config.chunk_size,
            config.chunk_overlap,
            measure,
            config.separators.clone(),
        ))),
        Strategy::Token => {
            let encoder = encoder.expect("needs_encoder() is true for the token strategy");
            Ok(Box::new(TokenSplitter::new(
                config.chunk_size,
                config.chunk_overlap,
                encoder,
            )))
        }
        Strategy::Semantic => {
            let provider = provider.ok_or_else(|| {
                ChunkError::EmbeddingUnavailable(
                    "no embedding provider configured for the semantic strategy".to_string(),
                )
            })?;
            Ok(Box::new(SemanticSplitter::new(
                config.chunk_size,
                config.chunk_overlap,
                measure,
                config.semantic_threshold_percentile,
                provider,
            )))
        }
    }
}

/// Default separator cascade, coarsest first: paragraph break, line break,
/// sentence enders, clause breaks, word break, then character level.
pub(crate) fn default_separators() -> Vec<String> {
    [
        "\n\n", "\n", ". ", "! ", "? ", "; ", ", ", " ", "",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
