//! Membank
//!
//! A REST, CLI and web front end for a Weaviate-backed memory bank. Storage,
//! indexing and similarity search are delegated to Weaviate; this crate is the
//! operational glue around it.

pub mod api;
pub mod chunker;
pub mod client;
pub mod config;
pub mod content;
pub mod embed;
pub mod ingest;
pub mod model;
pub mod weaviate;
pub mod web;

pub use model::*;
pub use weaviate::WeaviateClient;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration values
pub mod defaults {
    pub const CHUNK_SIZE: usize = 1_000;
    pub const CHUNK_OVERLAP: usize = 200;
    pub const VECTOR_DIM: usize = 384;
    pub const QUERY_LIMIT: usize = 3;
    pub const SCRAPE_TIMEOUT_S: u64 = 5;
    pub const DASHBOARD_ENTRY_LIMIT: usize = 20;
}

/// Error types for the memory bank
pub mod errors {
    use anyhow::Error;

    pub type Result<T> = std::result::Result<T, Error>;

    #[derive(Debug, thiserror::Error)]
    pub enum MemoryBankError {
        #[error("Object not found: {0}")]
        NotFound(String),

        #[error("Invalid URL: {0}")]
        InvalidUrl(String),

        #[error("File not found: {0}")]
        FileNotFound(String),

        #[error("Unsupported content type: {0}")]
        UnsupportedContentType(String),

        #[error("Weaviate error: {0}")]
        Weaviate(String),
    }
}
