use crate::config::EmbeddingConfig;
use crate::traits::{Embedder, RetrievalError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    texts: &'a [String],
    batch_size: usize,
    normalize: bool,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    embeddings: Vec<Vec<f32>>,
}

/// Client for a text-embedding server that accepts
/// `{texts, batch_size, normalize}` and answers `{embeddings}`.
pub struct HttpEmbedder {
    client: reqwest::Client,
    url: String,
    batch_size: usize,
    normalize: bool,
}

impl HttpEmbedder {
    pub fn from_config(config: &EmbeddingConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self {
            client,
            url: config.url.clone(),
            batch_size: config.batch_size,
            normalize: config.normalize,
        }
    }
}

fn check_embeddings(
    embeddings: Vec<Vec<f32>>,
    expected: usize,
) -> Result<Vec<Vec<f32>>, RetrievalError> {
    if embeddings.len() < expected {
        return Err(RetrievalError::Embedding(format!(
            "expected {} embeddings, got {}",
            expected,
            embeddings.len()
        )));
    }
    if embeddings.iter().take(expected).any(Vec::is_empty) {
        return Err(RetrievalError::Embedding("empty embedding vector".to_string()));
    }
    Ok(embeddings)
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RetrievalError> {
        let body = EmbedRequest {
            texts,
            batch_size: self.batch_size,
            normalize: self.normalize,
        };

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RetrievalError::Embedding(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(RetrievalError::Embedding(format!(
                "status {}: {}",
                status, error_text
            )));
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| RetrievalError::Embedding(format!("invalid response: {}", e)))?;

        tracing::debug!(count = parsed.embeddings.len(), "Embeddings received");
        check_embeddings(parsed.embeddings, texts.len())
    }
}
