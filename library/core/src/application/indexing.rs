// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Semantic indexing pipeline.
//!
//! fetch bytes → extract text → chunk → extract metadata → embed → upsert.
//! At-least-once and best-effort: callers spawn these operations after
//! their own transaction commits, and failures here are logged and dropped
//! — they never fail the user-visible operation.

use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use alexandria_vector::domain::Language;
use alexandria_vector::infrastructure::{chunk_doc_id, Chunker, ContentExtractor, Embedder, MetadataExtractor, VectorStore};

use crate::domain::file::FileMetadata;
use crate::domain::repository::{FileRepository, LibraryRepository};
use crate::infrastructure::object_store::ObjectStore;

const EMBED_TEXT_CAP: usize = 8000;

pub struct IndexingService {
    files: Arc<dyn FileRepository>,
    libraries: Arc<dyn LibraryRepository>,
    storage: Arc<dyn ObjectStore>,
    extractor: Arc<ContentExtractor>,
    chunker: Arc<Chunker>,
    metadata: Arc<MetadataExtractor>,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
}

impl IndexingService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        files: Arc<dyn FileRepository>,
        libraries: Arc<dyn LibraryRepository>,
        storage: Arc<dyn ObjectStore>,
        extractor: Arc<ContentExtractor>,
        chunker: Arc<Chunker>,
        metadata: Arc<MetadataExtractor>,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        Self {
            files,
            libraries,
            storage,
            extractor,
            chunker,
            metadata,
            embedder,
            store,
        }
    }

    /// Index one file. Returns the number of chunks upserted.
    pub async fn index_file(&self, file_id: Uuid) -> anyhow::Result<usize> {
        let Some(file) = self.files.find_by_id(file_id).await? else {
            anyhow::bail!("file {file_id} not found or deleted");
        };
        let Some(library) = self.libraries.find_by_id(file.library_id).await? else {
            anyhow::bail!("library {} not found or deleted", file.library_id);
        };

        let bytes = self.storage.download_file(&library.bucket_name, &file.storage_key).await?;
        let text = self
            .extractor
            .extract_text(&bytes, &file.content_type, &file.filename, file.size_bytes as u64)
            .await?;

        let chunks = self.chunker.chunk_content(&text, &file.filename, Some(&file.content_type));
        if chunks.is_empty() {
            info!(%file_id, "no indexable chunks");
            return Ok(0);
        }

        // File-level metadata, attached to every chunk for facet queries.
        let language = alexandria_vector::domain::chunk::detect_language(&file.filename, Some(&text));
        let file_payload = if language.is_code() {
            self.metadata
                .extract_code_metadata(&text, &file.filename, language)
                .to_payload()
        } else if language == Language::Markdown {
            self.metadata.extract_document_metadata(&text).to_payload()
        } else {
            Map::new()
        };

        let doc_id = file.id.to_string();
        let full_path = file.full_path();

        let mut ids = Vec::with_capacity(chunks.len());
        let mut contents = Vec::with_capacity(chunks.len());
        let mut embeddings = Vec::with_capacity(chunks.len());
        let mut metadatas = Vec::with_capacity(chunks.len());

        for chunk in &chunks {
            let capped = cap_chars(&chunk.content, EMBED_TEXT_CAP);
            let embedding = match self.embedder.embed(capped).await {
                Ok(embedding) => embedding,
                Err(e) => {
                    warn!(%file_id, chunk_index = chunk.index, error = %e, "chunk embedding failed; skipping");
                    continue;
                }
            };

            ids.push(chunk_doc_id(file.library_id, Some(&doc_id), chunk.index as i64, &full_path));
            contents.push(chunk.content.clone());
            embeddings.push(embedding);
            metadatas.push(self.chunk_payload(&file, &full_path, chunk.to_metadata(), &file_payload));
        }

        if ids.is_empty() {
            anyhow::bail!("every chunk embedding failed for file {file_id}");
        }

        let count = ids.len();
        self.store
            .upsert(file.library_id, &ids, &contents, &embeddings, &metadatas)
            .await?;

        info!(%file_id, chunks = count, "file indexed");
        Ok(count)
    }

    fn chunk_payload(
        &self,
        file: &FileMetadata,
        full_path: &str,
        mut chunk_meta: Map<String, Value>,
        file_payload: &Map<String, Value>,
    ) -> Map<String, Value> {
        for (key, value) in file_payload {
            chunk_meta.entry(key.clone()).or_insert_with(|| value.clone());
        }
        chunk_meta.insert("path".into(), json!(full_path));
        chunk_meta.insert("doc_id".into(), json!(file.id.to_string()));
        chunk_meta.insert("file_id".into(), json!(file.id.to_string()));
        chunk_meta.insert("library_id".into(), json!(file.library_id.to_string()));
        chunk_meta.insert("file_name".into(), json!(file.filename));
        chunk_meta.insert("mime_type".into(), json!(file.content_type));
        chunk_meta
    }

    /// Remove every chunk of one file from the library's collection.
    pub async fn deindex_file(&self, file_id: Uuid, library_id: Uuid) -> anyhow::Result<usize> {
        let clauses = vec![("doc_id".to_string(), file_id.to_string())];
        let deleted = self.store.delete_by_filter(library_id, &clauses).await?;
        info!(%file_id, deleted, "file deindexed");
        Ok(deleted)
    }

    /// Remove every chunk whose path starts with `prefix` (directory
    /// delete/move).
    pub async fn deindex_path_prefix(&self, library_id: Uuid, prefix: &str) -> anyhow::Result<usize> {
        let deleted = self.store.delete_by_path_prefix(library_id, prefix).await?;
        info!(%library_id, prefix, deleted, "path prefix deindexed");
        Ok(deleted)
    }

    /// Drop a library's whole collection (permanent library purge).
    pub async fn drop_library_index(&self, library_id: Uuid) -> anyhow::Result<()> {
        self.store.delete_collection(library_id).await?;
        Ok(())
    }

    /// Re-index every non-deleted file of a library. Returns
    /// (files indexed, files failed).
    pub async fn reindex_library(&self, library_id: Uuid) -> anyhow::Result<(usize, usize)> {
        let files = self.files.list_non_deleted_by_library(library_id).await?;
        let mut indexed = 0usize;
        let mut failed = 0usize;

        for file in files {
            match self.index_file(file.id).await {
                Ok(_) => indexed += 1,
                Err(e) => {
                    warn!(file_id = %file.id, error = %e, "reindex failed for file");
                    failed += 1;
                }
            }
        }

        info!(%library_id, indexed, failed, "library reindexed");
        Ok((indexed, failed))
    }
}

fn cap_chars(text: &str, cap: usize) -> &str {
    if text.len() <= cap {
        return text;
    }
    let mut end = cap;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
