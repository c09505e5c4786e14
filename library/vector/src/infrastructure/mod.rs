// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Infrastructure adapters for the indexing layer.

pub mod chunker;
pub mod content_extraction;
pub mod embedding_client;
pub mod metadata_extraction;
pub mod qdrant_store;

pub use chunker::{Chunker, ChunkerConfig};
pub use content_extraction::ContentExtractor;
pub use embedding_client::OllamaEmbeddingClient;
pub use metadata_extraction::MetadataExtractor;
pub use embedding_client::Embedder;
pub use qdrant_store::{
    chunk_doc_id, parse_chunk_library, score_from_distance, InMemoryVectorStore,
    QdrantVectorStore, ScoredChunk, StoredChunk, VectorStore,
};
