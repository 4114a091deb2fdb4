use crate::config::SearchConfig;
use crate::tools::extract_string_arg_opt;
use crate::traits::{Embedder, RetrievalError, Tool, ToolResult, VectorStore};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;

/// Removes `field` from the `_source` of every hit in a search response.
///
/// A response without `hits` passes through unchanged. A `hits` that is not
/// an object, a hit list that is not an array, or a hit that is not an
/// object is rejected.
pub fn sanitize_hits(mut response: Value, field: &str) -> Result<Value, RetrievalError> {
    if response.get("hits").is_some_and(|hits| !hits.is_object()) {
        return Err(RetrievalError::UnexpectedShape);
    }
    let Some(hits) = response.pointer_mut("/hits/hits") else {
        return Ok(response);
    };
    let hits = hits.as_array_mut().ok_or(RetrievalError::UnexpectedShape)?;
    for hit in hits.iter_mut() {
        let hit = hit.as_object_mut().ok_or(RetrievalError::UnexpectedShape)?;
        if let Some(Value::Object(source)) = hit.get_mut("_source") {
            source.remove(field);
        }
    }

    Ok(response)
}

pub struct RagSearchTool {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    embedding_field: String,
    top_k: usize,
}

impl RagSearchTool {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        embedding_field: impl Into<String>,
        top_k: usize,
    ) -> Self {
        Self {
            embedder,
            store,
            embedding_field: embedding_field.into(),
            top_k,
        }
    }

    pub fn from_config(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        config: &SearchConfig,
    ) -> Self {
        Self::new(embedder, store, &config.embedding_field, config.top_k)
    }

    /// Embed, search, sanitize. Every failure comes back as `Err` so the
    /// caller can turn it into tool output.
    pub async fn search(&self, query: &str) -> Result<String, RetrievalError> {
        let mut embeddings = self.embedder.embed(&[query.to_string()]).await?;
        if embeddings.is_empty() {
            return Err(RetrievalError::Embedding("no embedding returned".to_string()));
        }
        let vector = embeddings.swap_remove(0);

        let response = self
            .store
            .knn_search(&self.embedding_field, &vector, self.top_k)
            .await?;

        let hit_count = response
            .pointer("/hits/hits")
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        tracing::debug!(index = self.store.index(), hits = hit_count, "kNN search complete");

        let sanitized = sanitize_hits(response, &self.embedding_field)?;
        serde_json::to_string(&sanitized).map_err(|_| RetrievalError::UnexpectedShape)
    }
}

#[async_trait]
impl Tool for RagSearchTool {
    fn name(&self) -> &str {
        "rag_search"
    }

    fn description(&self) -> &str {
        "Semantic document search. Embeds the query, runs a k-NN vector search against \
         the document index, and returns the raw search response JSON with the embedding \
         field removed from every hit."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search query (required). Short keyword phrases of 3-8 tokens work best, e.g. \"2024 performance plan\"."
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<ToolResult> {
        let query = extract_string_arg_opt(&args, "query", "");
        if query.trim().is_empty() {
            return Ok(ToolResult::error("query is required"));
        }

        match self.search(&query).await {
            Ok(output) => Ok(ToolResult::success(output)),
            Err(e) => {
                tracing::warn!(error = %e, "rag_search failed");
                Ok(ToolResult::error(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{CannedStore, StaticEmbedder, two_hits};

    fn tool(embedder: Arc<StaticEmbedder>, store: Arc<CannedStore>) -> RagSearchTool {
        RagSearchTool::new(embedder, store, "embedding", 5)
    }

    fn parse(result: ToolResult) -> Value {
        serde_json::from_str(&result.into_content()).unwrap()
    }

    #[tokio::test]
    async fn hits_come_back_without_embedding_field() {
        let embedder = Arc::new(StaticEmbedder::zeros(4));
        let store = Arc::new(CannedStore::ok(two_hits()));
        let tool = tool(embedder.clone(), store.clone());

        let result = tool.execute(json!({ "query": "2024 plan" })).await.unwrap();
        assert!(result.success);

        let value = parse(result);
        let hits = value["hits"]["hits"].as_array().unwrap();
        assert_eq!(hits.len(), 2);
        for hit in hits {
            assert!(hit["_source"].get("embedding").is_none());
            assert!(hit["_source"].get("title").is_some());
        }
        assert_eq!(value["took"], 3);
        assert_eq!(hits[1]["_source"]["page"], 7);

        assert_eq!(embedder.calls(), 1);
        let searches = store.searches();
        assert_eq!(searches.len(), 1);
        assert_eq!(searches[0].field, "embedding");
        assert_eq!(searches[0].dims, 4);
        assert_eq!(searches[0].k, 5);
    }

    #[tokio::test]
    async fn blank_query_never_reaches_backends() {
        let embedder = Arc::new(StaticEmbedder::zeros(4));
        let store = Arc::new(CannedStore::ok(two_hits()));
        let tool = tool(embedder.clone(), store.clone());

        for args in [json!({ "query": " \t " }), json!({}), json!({ "query": 42 })] {
            let value = parse(tool.execute(args).await.unwrap());
            assert_eq!(value, json!({ "error": "query is required" }));
        }

        assert_eq!(embedder.calls(), 0);
        assert!(store.searches().is_empty());
    }

    #[tokio::test]
    async fn embedding_failure_skips_search() {
        let embedder = Arc::new(StaticEmbedder::failing("connection refused"));
        let store = Arc::new(CannedStore::ok(two_hits()));
        let tool = tool(embedder, store.clone());

        let value = parse(tool.execute(json!({ "query": "q" })).await.unwrap());
        let message = value["error"].as_str().unwrap();
        assert!(message.starts_with("embedding failed"));
        assert!(message.contains("connection refused"));
        assert!(store.searches().is_empty());
    }

    #[tokio::test]
    async fn search_failure_becomes_error_payload() {
        let embedder = Arc::new(StaticEmbedder::zeros(4));
        let store = Arc::new(CannedStore::failing("index_not_found_exception"));
        let tool = tool(embedder, store);

        let value = parse(tool.execute(json!({ "query": "q" })).await.unwrap());
        let message = value["error"].as_str().unwrap();
        assert!(message.starts_with("opensearch knn search failed"));
        assert!(message.contains("index_not_found_exception"));
    }

    #[tokio::test]
    async fn malformed_hit_list_becomes_error_payload() {
        let embedder = Arc::new(StaticEmbedder::zeros(4));
        let store = Arc::new(CannedStore::ok(json!({ "hits": { "hits": "nope" } })));
        let tool = tool(embedder, store);

        let value = parse(tool.execute(json!({ "query": "q" })).await.unwrap());
        assert_eq!(value["error"], "unexpected opensearch response structure");
    }

    #[test]
    fn sanitize_leaves_other_fields_and_missing_sources() {
        let response = json!({
            "hits": { "hits": [
                { "_id": "a" },
                { "_id": "b", "_source": { "embedding": [1.0], "text": "t" } },
                { "_id": "c", "_source": { "text": "u" } }
            ] }
        });

        let sanitized = sanitize_hits(response, "embedding").unwrap();
        let hits = sanitized["hits"]["hits"].as_array().unwrap();
        assert_eq!(hits[0], json!({ "_id": "a" }));
        assert_eq!(hits[1]["_source"], json!({ "text": "t" }));
        assert_eq!(hits[2]["_source"], json!({ "text": "u" }));
    }

    #[test]
    fn sanitize_uses_configured_field_name() {
        let response = json!({
            "hits": { "hits": [
                { "_source": { "doc_vector": [1.0], "embedding": "kept" } }
            ] }
        });

        let sanitized = sanitize_hits(response, "doc_vector").unwrap();
        assert_eq!(sanitized["hits"]["hits"][0]["_source"], json!({ "embedding": "kept" }));
    }

    #[test]
    fn sanitize_passes_through_responses_without_hits() {
        let response = json!({ "timed_out": false });
        assert_eq!(sanitize_hits(response.clone(), "embedding").unwrap(), response);
    }

    #[test]
    fn sanitize_rejects_non_object_hits_section() {
        for response in [json!({ "hits": "x" }), json!({ "hits": [] }), json!({ "hits": null })] {
            assert!(matches!(
                sanitize_hits(response, "embedding"),
                Err(RetrievalError::UnexpectedShape)
            ));
        }
    }

    #[tokio::test]
    async fn non_object_hits_section_becomes_error_payload() {
        let embedder = Arc::new(StaticEmbedder::zeros(4));
        let store = Arc::new(CannedStore::ok(json!({ "hits": [] })));
        let tool = tool(embedder, store);

        let value = parse(tool.execute(json!({ "query": "q" })).await.unwrap());
        assert_eq!(value["error"], "unexpected opensearch response structure");
    }

    #[test]
    fn sanitize_rejects_non_object_hit() {
        let response = json!({ "hits": { "hits": [1, 2] } });
        assert!(matches!(
            sanitize_hits(response, "embedding"),
            Err(RetrievalError::UnexpectedShape)
        ));
    }

    #[test]
    fn advertised_parameters_require_query() {
        let embedder = Arc::new(StaticEmbedder::zeros(4));
        let store = Arc::new(CannedStore::ok(json!({})));
        let spec = tool(embedder, store).spec();
        assert_eq!(spec.name, "rag_search");
        assert_eq!(spec.parameters.required, vec!["query".to_string()]);
        assert_eq!(spec.parameters.properties["query"].kind, "string");
    }
}
