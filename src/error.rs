use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChunkError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Unsupported splitter strategy: {0}")]
    UnsupportedStrategy(String),

    #[error("Malformed record in {source_id} (line {line:?}): {reason}")]
    MalformedRecord {
        source_id: String,
        line: Option<usize>,
        reason: String,
    },

    #[error("Embedding provider unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("ID policy violation: {0}")]
    Policy(String),

    #[error("Unsupported input extension: {0}")]
    UnsupportedInput(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl ChunkError {
    /// Build a per-record ingestion error with an optional line number.
    pub fn malformed(source_id: impl Into<String>, line: Option<usize>, reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            source_id: source_id.into(),
            line,
            reason: reason.into(),
        }
    }
}
