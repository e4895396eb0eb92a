use serde::{Deserialize, Serialize};

use crate::error::ChunkError;

/// Default tiktoken encoding table.
pub const DEFAULT_ENCODING: &str = "cl100k_base";

/// Default percentile above which a sentence-distance spike becomes a split point.
pub const DEFAULT_SEMANTIC_PERCENTILE: f64 = 95.0;

/// Which splitting algorithm to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Recursive,
    Markdown,
    Token,
    Semantic,
}

impl Strategy {
    pub fn parse(name: &str) -> Result<Self, ChunkError> {
        match name {
            "recursive" => Ok(Self::Recursive),
            "markdown" => Ok(Self::Markdown),
            "token" => Ok(Self::Token),
            "semantic" => Ok(Self::Semantic),
            other => Err(ChunkError::UnsupportedStrategy(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Recursive => "recursive",
            Self::Markdown => "markdown",
            Self::Token => "token",
            Self::Semantic => "semantic",
        }
    }
}

/// Unit in which chunk overlap (and, for the character-based strategies,
/// chunk size) is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlapUnit {
    Tokens,
    Characters,
}

/// Validated parameter set consumed by every splitter strategy.
///
/// Construction is the validation boundary: a `ChunkConfig` that exists is
/// a `ChunkConfig` whose invariants hold, in particular
/// `chunk_overlap < chunk_size`.
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    pub strategy: Strategy,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub overlap_unit: OverlapUnit,
    pub encoding_name: String,
    /// Separator cascade override. Empty means the strategy default.
    pub separators: Vec<String>,
    pub embed_model: Option<String>,
    pub azure_deployment: Option<String>,
    pub embed_endpoint: Option<String>,
    pub semantic_threshold_percentile: f64,
}

impl ChunkConfig {
    pub fn new(strategy: Strategy, chunk_size: usize, chunk_overlap: usize) -> Result<Self, ChunkError> {
        let config = Self {
            strategy,
            chunk_size,
            chunk_overlap,
            overlap_unit: OverlapUnit::Characters,
            encoding_name: DEFAULT_ENCODING.to_string(),
            separators: Vec::new(),
            embed_model: None,
            azure_deployment: None,
            embed_endpoint: None,
            semantic_threshold_percentile: DEFAULT_SEMANTIC_PERCENTILE,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_overlap_unit(mut self, unit: OverlapUnit) -> Self {
        self.overlap_unit = unit;
        self
    }

    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding_name = encoding.into();
        self
    }

    pub fn with_separators(mut self, separators: Vec<String>) -> Self {
        self.separators = separators;
        self
    }

    pub fn with_embedding(
        mut self,
        endpoint: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, ChunkError> {
        self.embed_endpoint = Some(endpoint.into());
        self.embed_model = Some(model.into());
        self.validate()?;
        Ok(self)
    }

    pub fn with_azure_deployment(mut self, deployment: impl Into<String>) -> Self {
        self.azure_deployment = Some(deployment.into());
        self
    }

    pub fn with_semantic_percentile(mut self, percentile: f64) -> Result<Self, ChunkError> {
        self.semantic_threshold_percentile = percentile;
        self.validate()?;
        Ok(self)
    }

    /// Re-check every invariant. Called from the constructors; exposed so the
    /// factory can guard against configs assembled field-by-field.
    pub fn validate(&self) -> Result<(), ChunkError> {
        if self.chunk_size == 0 {
            return Err(ChunkError::Configuration(
                "chunk_size must be positive".to_string(),
            ));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(ChunkError::Configuration(format!(
                "chunk_overlap ({}) must be strictly less than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if !(0.0..=100.0).contains(&self.semantic_threshold_percentile) {
            return Err(ChunkError::Configuration(format!(
                "semantic_threshold_percentile ({}) must lie in [0, 100]",
                self.semantic_threshold_percentile
            )));
        }
        if self.strategy == Strategy::Semantic
            && self.embed_model.is_none()
            && self.azure_deployment.is_none()
        {
            return Err(ChunkError::Configuration(
                "semantic strategy requires an embedding model or Azure deployment".to_string(),
            ));
        }
        Ok(())
    }

    /// True when any strategy parameter needs a token encoding table.
    pub fn needs_encoder(&self) -> bool {
        self.strategy == Strategy::Token || self.overlap_unit == OverlapUnit::Tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_config() {
        let config = ChunkConfig::new(Strategy::Recursive, 512, 64).unwrap();
        assert_eq!(config.chunk_size, 512);
        assert_eq!(config.encoding_name, "cl100k_base");
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let err = ChunkConfig::new(Strategy::Recursive, 0, 0).unwrap_err();
        assert!(matches!(err, ChunkError::Configuration(_)));
    }

    #[test]
    fn test_overlap_must_be_less_than_size() {
        assert!(ChunkConfig::new(Strategy::Token, 100, 100).is_err());
        assert!(ChunkConfig::new(Strategy::Token, 100, 150).is_err());
        assert!(ChunkConfig::new(Strategy::Token, 100, 99).is_ok());
    }

    #[test]
    fn test_semantic_requires_embedding_target() {
        let err = ChunkConfig::new(Strategy::Semantic, 512, 64).unwrap_err();
        assert!(matches!(err, ChunkError::Configuration(_)));

        let config = ChunkConfig::new(Strategy::Recursive, 512, 64)
            .unwrap()
            .with_embedding("http://localhost:18115", "text-embedding-3-small")
            .unwrap();
        assert!(config.embed_model.is_some());
    }

    #[test]
    fn test_percentile_bounds() {
        let config = ChunkConfig::new(Strategy::Recursive, 512, 64).unwrap();
        assert!(config.clone().with_semantic_percentile(101.0).is_err());
        assert!(config.clone().with_semantic_percentile(-1.0).is_err());
        assert!(config.with_semantic_percentile(90.0).is_ok());
    }

    #[test]
    fn test_strategy_parse() {
        assert_eq!(Strategy::parse("markdown").unwrap(), Strategy::Markdown);
        assert!(matches!(
            Strategy::parse("quantum"),
            Err(ChunkError::UnsupportedStrategy(_))
        ));
    }
}
