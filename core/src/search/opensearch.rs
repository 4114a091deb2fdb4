use crate::config::SearchConfig;
use crate::traits::{RetrievalError, VectorStore};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::time::Duration;

/// Minimal OpenSearch REST client: k-NN `_search` and index existence.
pub struct OpenSearchClient {
    client: reqwest::Client,
    base_url: String,
    index: String,
}

impl OpenSearchClient {
    pub fn new(base_url: impl Into<String>, index: impl Into<String>) -> Self {
        Self::with_timeout(base_url, index, Duration::from_secs(30))
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        index: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            index: index.into(),
        }
    }

    pub fn from_config(config: &SearchConfig) -> Self {
        Self::with_timeout(
            config.base_url(),
            &config.index,
            Duration::from_secs(config.timeout_secs),
        )
    }

    fn index_url(&self) -> String {
        format!("{}/{}", self.base_url, self.index)
    }
}

pub fn knn_query(field: &str, vector: &[f32], k: usize) -> Value {
    json!({
        "size": k,
        "query": {
            "knn": {
                field: {
                    "vector": vector,
                    "k": k
                }
            }
        }
    })
}

#[async_trait]
impl VectorStore for OpenSearchClient {
    fn index(&self) -> &str {
        &self.index
    }

    async fn knn_search(
        &self,
        field: &str,
        vector: &[f32],
        k: usize,
    ) -> Result<Value, RetrievalError> {
        let body = knn_query(field, vector, k);

        let response = self
            .client
            .post(format!("{}/_search", self.index_url()))
            .json(&body)
            .send()
            .await
            .map_err(|e| RetrievalError::Search(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(RetrievalError::Search(format!(
                "status {}: {}",
                status, error_text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| RetrievalError::Search(format!("invalid response: {}", e)))
    }

    async fn index_exists(&self) -> Result<bool, RetrievalError> {
        let response = self
            .client
            .head(self.index_url())
            .send()
            .await
            .map_err(|e| RetrievalError::Search(e.to_string()))?;

        match response.status() {
            s if s.is_success() => Ok(true),
            reqwest::StatusCode::NOT_FOUND => Ok(false),
            s => Err(RetrievalError::Search(format!(
                "index check for '{}' returned {}",
                self.index, s
            ))),
        }
    }
}
