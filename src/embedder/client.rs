use reqwest::blocking::Client;

use super::types::{EmbeddingRequest, EmbeddingResponse};
use super::EmbeddingProvider;
use crate::error::ChunkError;

/// Blocking HTTP client for an `/embed` endpoint.
///
/// The optional model name and Azure deployment are forwarded in the
/// request body so one server can front several models.
pub struct HttpEmbeddingClient {
    http: Client,
    endpoint: String,
    model: Option<String>,
    deployment: Option<String>,
}

impl HttpEmbeddingClient {
    pub fn new(
        endpoint: impl Into<String>,
        model: Option<String>,
        deployment: Option<String>,
    ) -> Self {
        Self {
            http: Client::new(),
            endpoint: endpoint.into(),
            model,
            deployment,
        }
    }
}

impl EmbeddingProvider for HttpEmbeddingClient {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ChunkError> {
        let request = EmbeddingRequest {
            texts: texts.to_vec(),
            model: self.model.clone(),
            deployment: self.deployment.clone(),
        };

        let response = self
            .http
            .post(format!("{}/embed", self.endpoint))
            .json(&request)
            .send()
            .map_err(|e| ChunkError::EmbeddingUnavailable(e.to_string()))?
            .error_for_status()
            .map_err(|e| ChunkError::EmbeddingUnavailable(e.to_string()))?;

        let body: EmbeddingResponse = response
            .json()
            .map_err(|e| ChunkError::EmbeddingUnavailable(format!("bad response body: {e}")))?;

        if body.embeddings.len() != texts.len() {
            return Err(ChunkError::EmbeddingUnavailable(format!(
                "provider returned {} embeddings for {} inputs",
                body.embeddings.len(),
                texts.len()
            )));
        }
        Ok(body.embeddings)
    }
}
