pub mod opensearch;

pub use opensearch::OpenSearchClient;
