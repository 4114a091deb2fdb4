pub mod http;

pub use http::HttpEmbedder;
