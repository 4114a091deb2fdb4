//! In-memory doubles for the completion, embedding and search services.

use crate::traits::{
    ChatMessage, ChatRequest, ChatResponse, Embedder, Provider, RetrievalError, ToolCall,
    ToolChoice, VectorStore,
};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

pub fn call(id: &str, name: &str, arguments: &str) -> ToolCall {
    ToolCall {
        id: id.to_string(),
        name: name.to_string(),
        arguments: arguments.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub messages: Vec<ChatMessage>,
    pub tool_names: Vec<String>,
    pub tool_choice: ToolChoice,
}

/// Replays queued responses in order; errors once the script runs out.
#[derive(Default)]
pub struct ScriptedProvider {
    script: Mutex<VecDeque<anyhow::Result<ChatResponse>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<ChatResponse>) -> Self {
        Self {
            script: Mutex::new(responses.into_iter().map(Ok).collect()),
            requests: Mutex::new(vec![]),
        }
    }

    pub fn then_fail(self, message: &str) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(Err(anyhow::anyhow!(message.to_string())));
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    async fn chat(&self, request: ChatRequest<'_>) -> anyhow::Result<ChatResponse> {
        self.requests.lock().unwrap().push(RecordedRequest {
            messages: request.messages.to_vec(),
            tool_names: request
                .tools
                .unwrap_or_default()
                .iter()
                .map(|t| t.name.clone())
                .collect(),
            tool_choice: request.tool_choice,
        });

        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(anyhow::anyhow!("script exhausted")))
    }
}

/// Returns a fixed vector per text, or a failure, counting calls.
pub struct StaticEmbedder {
    pub calls: AtomicUsize,
    vector: Result<Vec<f32>, String>,
}

impl StaticEmbedder {
    pub fn zeros(dims: usize) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            vector: Ok(vec![0.0; dims]),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            vector: Err(message.to_string()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for StaticEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RetrievalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.vector {
            Ok(vector) => Ok(texts.iter().map(|_| vector.clone()).collect()),
            Err(message) => Err(RetrievalError::Embedding(message.clone())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct KnnCall {
    pub field: String,
    pub dims: usize,
    pub k: usize,
}

/// Answers every k-NN query with the same document, counting calls.
pub struct CannedStore {
    response: Result<Value, String>,
    searches: Mutex<Vec<KnnCall>>,
}

impl CannedStore {
    pub fn ok(response: Value) -> Self {
        Self {
            response: Ok(response),
            searches: Mutex::new(vec![]),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            response: Err(message.to_string()),
            searches: Mutex::new(vec![]),
        }
    }

    pub fn searches(&self) -> Vec<KnnCall> {
        self.searches.lock().unwrap().clone()
    }
}

#[async_trait]
impl VectorStore for CannedStore {
    fn index(&self) -> &str {
        "rag-index"
    }

    async fn knn_search(
        &self,
        field: &str,
        vector: &[f32],
        k: usize,
    ) -> Result<Value, RetrievalError> {
        self.searches.lock().unwrap().push(KnnCall {
            field: field.to_string(),
            dims: vector.len(),
            k,
        });
        self.response.clone().map_err(RetrievalError::Search)
    }

    async fn index_exists(&self) -> Result<bool, RetrievalError> {
        Ok(true)
    }
}

/// Search response with two hits, each carrying an `embedding` field.
pub fn two_hits() -> Value {
    serde_json::json!({
        "took": 3,
        "timed_out": false,
        "hits": {
            "total": { "value": 2, "relation": "eq" },
            "hits": [
                { "_index": "rag-index", "_id": "1", "_score": 0.92,
                  "_source": { "title": "2024 performance plan", "embedding": [0.1, 0.2, 0.3] } },
                { "_index": "rag-index", "_id": "2", "_score": 0.81,
                  "_source": { "title": "Program goal 1-1", "page": 7, "embedding": [0.4, 0.5, 0.6] } }
            ]
        }
    })
}
