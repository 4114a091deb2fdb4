use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("opensearch knn search failed: {0}")]
    Search(String),

    #[error("unexpected opensearch response structure")]
    UnexpectedShape,
}

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns one vector per input text, in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RetrievalError>;
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    fn index(&self) -> &str;

    /// k-nearest-neighbour query on `field`; returns the backend's response
    /// document untouched.
    async fn knn_search(
        &self,
        field: &str,
        vector: &[f32],
        k: usize,
    ) -> Result<Value, RetrievalError>;

    async fn index_exists(&self) -> Result<bool, RetrievalError>;
}
