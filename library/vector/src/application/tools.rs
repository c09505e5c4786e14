// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! The four agent-facing vector tools.
//!
//! `vector.query`, `vector.upsert_documents`, `vector.get`, and
//! `vector.delete`. Partial failure is reported, never thrown: per-item
//! policy and embedding failures become entries in the `errors` array while
//! the remaining items proceed.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::access::AccessControl;
use crate::error::ToolError;
use crate::infrastructure::{chunk_doc_id, parse_chunk_library, Embedder, VectorStore};

const DEFAULT_TOP_K: usize = 8;
const MAX_TOP_K: usize = 50;
const EMBED_TEXT_CAP: usize = 8000;

// ============================================================================
// Tool input/output schemas
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct QueryInput {
    pub text: String,
    #[serde(default)]
    pub top_k: Option<usize>,
    #[serde(default)]
    pub filters: Option<QueryFilters>,
}

#[derive(Debug, Default, Deserialize)]
pub struct QueryFilters {
    pub library_id: Option<String>,
    pub doc_id: Option<String>,
    pub path: Option<String>,
    pub doc_type: Option<String>,
    pub language: Option<String>,
    pub chunk_type: Option<String>,
    pub tags: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct QueryOutput {
    pub results: Vec<QueryResult>,
    pub low_confidence: bool,
    pub query_id: String,
}

#[derive(Debug, Serialize)]
pub struct QueryResult {
    pub id: String,
    pub text: String,
    pub score: f64,
    pub metadata: ResultMetadata,
}

#[derive(Debug, Default, Serialize)]
pub struct ResultMetadata {
    pub path: String,
    pub chunk_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub library_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_start: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_end: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpsertInput {
    pub chunks: Vec<String>,
    pub metadata: Vec<UpsertMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpsertMetadata {
    pub path: String,
    pub chunk_id: i64,
    pub library_id: String,
    #[serde(default)]
    pub doc_id: Option<String>,
    #[serde(default)]
    pub line_start: Option<i64>,
    #[serde(default)]
    pub line_end: Option<i64>,
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub chunk_type: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UpsertOutput {
    pub upserted_count: usize,
    pub ids: Vec<String>,
    pub errors: Vec<UpsertError>,
}

#[derive(Debug, Serialize)]
pub struct UpsertError {
    pub index: usize,
    pub error: String,
}

#[derive(Debug, Deserialize)]
pub struct GetInput {
    pub ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct GetOutput {
    pub items: Vec<GetItem>,
}

#[derive(Debug, Serialize)]
pub struct GetItem {
    pub id: String,
    pub text: String,
    pub metadata: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteInput {
    #[serde(rename = "where")]
    pub where_clause: DeleteWhere,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteWhere {
    pub doc_id: Option<String>,
    pub path_prefix: Option<String>,
    pub library_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeleteOutput {
    pub deleted_count: usize,
}

// ============================================================================
// Service
// ============================================================================

pub struct VectorToolService {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    access: Arc<AccessControl>,
    low_confidence_threshold: f64,
}

impl VectorToolService {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        access: Arc<AccessControl>,
        low_confidence_threshold: f64,
    ) -> Self {
        Self {
            store,
            embedder,
            access,
            low_confidence_threshold,
        }
    }

    /// Dispatch a vector tool call by name with raw JSON arguments.
    pub async fn dispatch(&self, agent_id: &str, name: &str, args: Value) -> Result<Value, ToolError> {
        match name {
            "vector.query" => {
                let input: QueryInput = parse_args(args)?;
                Ok(json!(self.query(agent_id, input).await))
            }
            "vector.upsert_documents" => {
                let input: UpsertInput = parse_args(args)?;
                Ok(json!(self.upsert_documents(agent_id, input).await))
            }
            "vector.get" => {
                let input: GetInput = parse_args(args)?;
                Ok(json!(self.get(agent_id, input).await))
            }
            "vector.delete" => {
                let input: DeleteInput = parse_args(args)?;
                Ok(json!(self.delete(agent_id, input).await))
            }
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }

    /// Semantic search across every library the agent can read, or one
    /// library when the filter names it.
    pub async fn query(&self, agent_id: &str, input: QueryInput) -> QueryOutput {
        let start = Instant::now();
        let query_id = Uuid::new_v4().to_string();
        let top_k = input.top_k.unwrap_or(DEFAULT_TOP_K).clamp(1, MAX_TOP_K);

        let empty = |query_id: String| QueryOutput {
            results: Vec::new(),
            low_confidence: true,
            query_id,
        };

        let filters = input.filters.unwrap_or_default();
        let mut where_clauses: Vec<(String, String)> = Vec::new();
        if let Some(path) = &filters.path {
            where_clauses.push(("path".into(), path.clone()));
        }
        if let Some(doc_id) = &filters.doc_id {
            where_clauses.push(("doc_id".into(), doc_id.clone()));
        }
        if let Some(doc_type) = &filters.doc_type {
            where_clauses.push(("mime_type".into(), doc_type.clone()));
        }
        if let Some(language) = &filters.language {
            where_clauses.push(("language".into(), language.clone()));
        }
        if let Some(chunk_type) = &filters.chunk_type {
            where_clauses.push(("chunk_type".into(), chunk_type.clone()));
        }
        if let Some(tags) = &filters.tags {
            where_clauses.push(("tags".into(), tags.clone()));
        }

        let library_ids = match &filters.library_id {
            Some(raw) => {
                let Ok(lib_id) = Uuid::parse_str(raw) else {
                    return empty(query_id);
                };
                if !self.access.check_library_access(lib_id, agent_id, false).await {
                    return empty(query_id);
                }
                vec![lib_id]
            }
            None => self.access.accessible_libraries(agent_id, false).await,
        };

        if library_ids.is_empty() {
            return empty(query_id);
        }

        let query_embedding = match self.embedder.embed(&input.text).await {
            Ok(embedding) => embedding,
            Err(e) => {
                warn!(query_id, error = %e, "query embedding failed");
                return empty(query_id);
            }
        };

        // Per-library searches run concurrently; results are merged, sorted
        // by score, and truncated to top_k.
        let searches = library_ids.iter().map(|lib_id| {
            let store = self.store.clone();
            let embedding = query_embedding.clone();
            let clauses = where_clauses.clone();
            let lib_id = *lib_id;
            async move { store.search(lib_id, embedding, top_k, &clauses).await }
        });
        let mut all_results = Vec::new();
        for outcome in futures::future::join_all(searches).await {
            match outcome {
                Ok(hits) => all_results.extend(hits),
                Err(e) => warn!(query_id, error = %e, "per-library search failed"),
            }
        }

        all_results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        all_results.truncate(top_k);

        let low_confidence = all_results.is_empty()
            || all_results.iter().all(|r| r.score < self.low_confidence_threshold);

        let results: Vec<QueryResult> = all_results
            .into_iter()
            .map(|hit| {
                let md = &hit.metadata;
                let get_str = |key: &str| md.get(key).and_then(Value::as_str).map(str::to_string);
                let get_int = |key: &str| md.get(key).and_then(Value::as_i64);
                QueryResult {
                    metadata: ResultMetadata {
                        path: get_str("path").unwrap_or_default(),
                        chunk_id: get_int("chunk_index").or_else(|| get_int("chunk_id")).unwrap_or(0),
                        doc_id: get_str("doc_id").or_else(|| get_str("file_id")),
                        library_id: get_str("library_id"),
                        line_start: get_int("line_start"),
                        line_end: get_int("line_end"),
                        page: get_int("page"),
                        language: get_str("language"),
                        chunk_type: get_str("chunk_type"),
                        name: get_str("name"),
                        heading: get_str("heading"),
                        file_name: get_str("file_name"),
                    },
                    id: hit.id,
                    text: hit.text,
                    score: hit.score,
                }
            })
            .collect();

        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
        info!(
            query_id,
            agent_id,
            result_count = results.len(),
            top_k,
            low_confidence,
            duration_ms,
            "vector query complete"
        );
        metrics::counter!("vector_query_total").increment(1);
        metrics::histogram!("vector_query_duration_ms").record(duration_ms);
        if results.is_empty() {
            metrics::counter!("vector_query_no_results_total").increment(1);
        }
        if low_confidence {
            metrics::counter!("vector_query_low_confidence_total").increment(1);
        }

        QueryOutput {
            results,
            low_confidence,
            query_id,
        }
    }

    /// Upsert chunks grouped by library. Per-item failures are reported in
    /// the output; other items proceed.
    pub async fn upsert_documents(&self, agent_id: &str, input: UpsertInput) -> UpsertOutput {
        if input.chunks.len() != input.metadata.len() {
            return UpsertOutput {
                upserted_count: 0,
                ids: Vec::new(),
                errors: vec![UpsertError {
                    index: 0,
                    error: "chunks and metadata arrays must have the same length".into(),
                }],
            };
        }

        let mut errors: Vec<UpsertError> = Vec::new();
        let mut by_library: HashMap<Uuid, Vec<(usize, String, UpsertMetadata)>> = HashMap::new();

        for (i, (chunk, metadata)) in input.chunks.into_iter().zip(input.metadata).enumerate() {
            let Ok(lib_id) = Uuid::parse_str(&metadata.library_id) else {
                errors.push(UpsertError {
                    index: i,
                    error: format!("invalid library_id {}", metadata.library_id),
                });
                continue;
            };

            if !self.access.check_library_access(lib_id, agent_id, true).await {
                errors.push(UpsertError {
                    index: i,
                    error: format!("write access denied for library {lib_id}"),
                });
                continue;
            }

            by_library.entry(lib_id).or_default().push((i, chunk, metadata));
        }

        let mut upserted_ids = Vec::new();

        for (lib_id, items) in by_library {
            let mut ids = Vec::new();
            let mut contents = Vec::new();
            let mut embeddings = Vec::new();
            let mut metadatas = Vec::new();

            for (i, chunk, metadata) in items {
                let capped = cap_chars(&chunk, EMBED_TEXT_CAP);
                let embedding = match self.embedder.embed(capped).await {
                    Ok(embedding) => embedding,
                    Err(e) => {
                        errors.push(UpsertError {
                            index: i,
                            error: format!("failed to generate embedding: {e}"),
                        });
                        continue;
                    }
                };

                ids.push(chunk_doc_id(
                    lib_id,
                    metadata.doc_id.as_deref(),
                    metadata.chunk_id,
                    &metadata.path,
                ));
                contents.push(chunk);
                embeddings.push(embedding);
                metadatas.push(payload_for(&metadata));
            }

            if ids.is_empty() {
                continue;
            }

            match self
                .store
                .upsert(lib_id, &ids, &contents, &embeddings, &metadatas)
                .await
            {
                Ok(()) => upserted_ids.extend(ids),
                Err(e) => {
                    warn!(%lib_id, error = %e, "batch upsert failed");
                    errors.push(UpsertError {
                        index: 0,
                        error: format!("failed to upsert batch to library {lib_id}"),
                    });
                }
            }
        }

        metrics::counter!("vector_upsert_total").increment(1);
        info!(
            agent_id,
            upserted_count = upserted_ids.len(),
            error_count = errors.len(),
            "vector upsert complete"
        );

        UpsertOutput {
            upserted_count: upserted_ids.len(),
            ids: upserted_ids,
            errors,
        }
    }

    /// Fetch chunks by exact id. Library ids are parsed out of the chunk
    /// ids and read access enforced per library; inaccessible libraries are
    /// silently skipped.
    pub async fn get(&self, agent_id: &str, input: GetInput) -> GetOutput {
        let mut by_library: HashMap<Uuid, Vec<String>> = HashMap::new();
        for id in input.ids {
            if let Some(lib_id) = parse_chunk_library(&id) {
                by_library.entry(lib_id).or_default().push(id);
            }
        }

        let mut items = Vec::new();
        for (lib_id, ids) in by_library {
            if !self.access.check_library_access(lib_id, agent_id, false).await {
                continue;
            }
            match self.store.get(lib_id, &ids).await {
                Ok(chunks) => items.extend(chunks.into_iter().map(|c| GetItem {
                    id: c.id,
                    text: c.text,
                    metadata: c.metadata,
                })),
                Err(e) => warn!(%lib_id, error = %e, "vector get failed"),
            }
        }

        GetOutput { items }
    }

    /// Delete by `library_id` (drops the collection, returning its prior
    /// count), `doc_id`, or `path_prefix`. The latter two iterate every
    /// library the agent can write.
    pub async fn delete(&self, agent_id: &str, input: DeleteInput) -> DeleteOutput {
        let where_clause = input.where_clause;
        let mut deleted_count = 0usize;

        if let Some(raw) = &where_clause.library_id {
            let Ok(lib_id) = Uuid::parse_str(raw) else {
                return DeleteOutput { deleted_count: 0 };
            };
            if !self.access.check_library_access(lib_id, agent_id, true).await {
                warn!(library_id = raw, agent_id, "vector delete access denied");
                return DeleteOutput { deleted_count: 0 };
            }

            let count = self.store.count(lib_id).await.unwrap_or(0);
            match self.store.delete_collection(lib_id).await {
                Ok(()) => deleted_count = count,
                Err(e) => warn!(%lib_id, error = %e, "collection delete failed"),
            }
        } else if let Some(doc_id) = &where_clause.doc_id {
            for lib_id in self.access.accessible_libraries(agent_id, true).await {
                let clauses = vec![("doc_id".to_string(), doc_id.clone())];
                match self.store.delete_by_filter(lib_id, &clauses).await {
                    Ok(count) => deleted_count += count,
                    Err(e) => warn!(%lib_id, error = %e, "delete by doc_id failed"),
                }
            }
        } else if let Some(prefix) = &where_clause.path_prefix {
            for lib_id in self.access.accessible_libraries(agent_id, true).await {
                match self.store.delete_by_path_prefix(lib_id, prefix).await {
                    Ok(count) => deleted_count += count,
                    Err(e) => warn!(%lib_id, error = %e, "delete by path prefix failed"),
                }
            }
        }
        // No filter at all deletes nothing.

        metrics::counter!("vector_delete_total").increment(1);
        info!(agent_id, deleted_count, "vector delete complete");
        DeleteOutput { deleted_count }
    }
}

fn parse_args<T: serde::de::DeserializeOwned>(args: Value) -> Result<T, ToolError> {
    serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments(e.to_string()))
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

fn payload_for(metadata: &UpsertMetadata) -> Map<String, Value> {
    let mut meta = Map::new();
    meta.insert("path".into(), json!(metadata.path));
    meta.insert("chunk_id".into(), json!(metadata.chunk_id));
    meta.insert("library_id".into(), json!(metadata.library_id));

    if let Some(doc_id) = &metadata.doc_id {
        meta.insert("doc_id".into(), json!(doc_id));
        meta.insert("file_id".into(), json!(doc_id));
    }
    if let Some(v) = metadata.line_start {
        meta.insert("line_start".into(), json!(v));
    }
    if let Some(v) = metadata.line_end {
        meta.insert("line_end".into(), json!(v));
    }
    if let Some(v) = metadata.page {
        meta.insert("page".into(), json!(v));
    }
    if let Some(v) = &metadata.hash {
        meta.insert("hash".into(), json!(v));
    }
    let updated_at = metadata
        .updated_at
        .clone()
        .unwrap_or_else(|| chrono::Utc::now().to_rfc3339());
    meta.insert("updated_at".into(), json!(updated_at));
    if let Some(v) = &metadata.language {
        meta.insert("language".into(), json!(v));
    }
    if let Some(v) = &metadata.chunk_type {
        meta.insert("chunk_type".into(), json!(v));
    }
    if let Some(v) = &metadata.name {
        meta.insert("name".into(), json!(v));
    }
    if let Some(v) = &metadata.file_name {
        meta.insert("file_name".into(), json!(v));
    }
    if let Some(v) = &metadata.mime_type {
        meta.insert("mime_type".into(), json!(v));
    }
    meta
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::access::{CatalogEntry, LibraryCatalog};
    use crate::error::EmbeddingError;
    use crate::infrastructure::InMemoryVectorStore;
    use async_trait::async_trait;

    struct StubCatalog {
        entries: Vec<CatalogEntry>,
    }

    #[async_trait]
    impl LibraryCatalog for StubCatalog {
        async fn list_libraries(&self) -> anyhow::Result<Vec<CatalogEntry>> {
            Ok(self.entries.clone())
        }
        async fn write_flag(&self, library_id: Uuid) -> anyhow::Result<Option<bool>> {
            Ok(self
                .entries
                .iter()
                .find(|e| e.library_id == library_id)
                .map(|e| e.mcp_write_enabled))
        }
    }

    /// Embeds to a constant vector; optionally fails on texts containing a
    /// marker substring.
    struct StubEmbedder {
        fail_marker: Option<&'static str>,
    }

    #[async_trait]
    impl Embedder for StubEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            if let Some(marker) = self.fail_marker {
                if text.contains(marker) {
                    return Err(EmbeddingError::Empty);
                }
            }
            Ok(vec![1.0, 0.0, 0.0])
        }
    }

    fn service(libraries: Vec<(Uuid, bool)>) -> VectorToolService {
        let entries = libraries
            .into_iter()
            .map(|(library_id, mcp_write_enabled)| CatalogEntry {
                library_id,
                mcp_write_enabled,
            })
            .collect();
        let access = Arc::new(AccessControl::new(
            Arc::new(StubCatalog { entries }),
            true,
            100,
            60,
        ));
        VectorToolService::new(
            Arc::new(InMemoryVectorStore::new()),
            Arc::new(StubEmbedder { fail_marker: None }),
            access,
            0.3,
        )
    }

    fn upsert_input(lib: Uuid, texts: &[&str]) -> UpsertInput {
        UpsertInput {
            chunks: texts.iter().map(|t| t.to_string()).collect(),
            metadata: texts
                .iter()
                .enumerate()
                .map(|(i, _)| UpsertMetadata {
                    path: "/docs/file.md".into(),
                    chunk_id: i as i64,
                    library_id: lib.to_string(),
                    doc_id: Some("doc-1".into()),
                    line_start: None,
                    line_end: None,
                    page: None,
                    hash: None,
                    updated_at: None,
                    language: None,
                    chunk_type: None,
                    name: None,
                    file_name: Some("file.md".into()),
                    mime_type: None,
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn empty_collection_query_is_low_confidence() {
        let lib = Uuid::new_v4();
        let svc = service(vec![(lib, true)]);

        let out = svc
            .query(
                "agent",
                QueryInput {
                    text: "anything".into(),
                    top_k: Some(5),
                    filters: None,
                },
            )
            .await;

        assert!(out.results.is_empty());
        assert!(out.low_confidence);
        assert!(!out.query_id.is_empty());
    }

    #[tokio::test]
    async fn upsert_then_query_round_trips() {
        let lib = Uuid::new_v4();
        let svc = service(vec![(lib, true)]);

        let out = svc.upsert_documents("agent", upsert_input(lib, &["first chunk", "second chunk"])).await;
        assert_eq!(out.upserted_count, 2);
        assert!(out.errors.is_empty());

        let query = svc
            .query(
                "agent",
                QueryInput {
                    text: "first".into(),
                    top_k: None,
                    filters: None,
                },
            )
            .await;
        assert_eq!(query.results.len(), 2);
        assert!(!query.low_confidence);
        assert_eq!(query.results[0].metadata.path, "/docs/file.md");
        assert_eq!(query.results[0].metadata.doc_id.as_deref(), Some("doc-1"));
    }

    #[tokio::test]
    async fn double_upsert_is_idempotent() {
        let lib = Uuid::new_v4();
        let svc = service(vec![(lib, true)]);

        let first = svc.upsert_documents("agent", upsert_input(lib, &["a", "b"])).await;
        let second = svc.upsert_documents("agent", upsert_input(lib, &["a", "b"])).await;

        assert_eq!(first.ids, second.ids);
        assert_eq!(svc.store.count(lib).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn upsert_denied_for_write_disabled_library() {
        let lib = Uuid::new_v4();
        let svc = service(vec![(lib, false)]);

        let out = svc.upsert_documents("agent", upsert_input(lib, &["chunk"])).await;
        assert_eq!(out.upserted_count, 0);
        assert_eq!(out.errors.len(), 1);
        assert!(out.errors[0].error.contains("access denied"));
    }

    #[tokio::test]
    async fn mismatched_arrays_error_without_throwing() {
        let lib = Uuid::new_v4();
        let svc = service(vec![(lib, true)]);
        let mut input = upsert_input(lib, &["one"]);
        input.chunks.push("extra".into());

        let out = svc.upsert_documents("agent", input).await;
        assert_eq!(out.upserted_count, 0);
        assert_eq!(out.errors.len(), 1);
    }

    #[tokio::test]
    async fn embedding_failure_is_per_item() {
        let lib = Uuid::new_v4();
        let entries = vec![CatalogEntry { library_id: lib, mcp_write_enabled: true }];
        let access = Arc::new(AccessControl::new(
            Arc::new(StubCatalog { entries }),
            true,
            100,
            60,
        ));
        let svc = VectorToolService::new(
            Arc::new(InMemoryVectorStore::new()),
            Arc::new(StubEmbedder { fail_marker: Some("poison") }),
            access,
            0.3,
        );

        let out = svc
            .upsert_documents("agent", upsert_input(lib, &["good chunk", "poison chunk"]))
            .await;
        assert_eq!(out.upserted_count, 1);
        assert_eq!(out.errors.len(), 1);
        assert_eq!(out.errors[0].index, 1);
    }

    #[tokio::test]
    async fn get_skips_inaccessible_libraries() {
        let readable = Uuid::new_v4();
        let svc = service(vec![(readable, true)]);
        svc.upsert_documents("agent", upsert_input(readable, &["visible"])).await;

        // One valid id, one from a library the catalog does not know —
        // default policy still reads it, so craft a denied one via policy.
        let denied = Uuid::new_v4();
        svc.access.set_policy(crate::domain::LibraryPolicy::new(denied, false, false));

        let valid_id = chunk_doc_id(readable, Some("doc-1"), 0, "/docs/file.md");
        let denied_id = chunk_doc_id(denied, Some("doc-9"), 0, "/other");

        let out = svc.get("agent", GetInput { ids: vec![valid_id.clone(), denied_id] }).await;
        assert_eq!(out.items.len(), 1);
        assert_eq!(out.items[0].id, valid_id);
    }

    #[tokio::test]
    async fn delete_by_library_reports_prior_count() {
        let lib = Uuid::new_v4();
        let svc = service(vec![(lib, true)]);
        svc.upsert_documents("agent", upsert_input(lib, &["a", "b", "c"])).await;

        let out = svc
            .delete(
                "agent",
                DeleteInput {
                    where_clause: DeleteWhere {
                        library_id: Some(lib.to_string()),
                        ..DeleteWhere::default()
                    },
                },
            )
            .await;
        assert_eq!(out.deleted_count, 3);
        assert_eq!(svc.store.count(lib).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn delete_requires_some_filter() {
        let lib = Uuid::new_v4();
        let svc = service(vec![(lib, true)]);
        svc.upsert_documents("agent", upsert_input(lib, &["a"])).await;

        let out = svc
            .delete("agent", DeleteInput { where_clause: DeleteWhere::default() })
            .await;
        assert_eq!(out.deleted_count, 0);
        assert_eq!(svc.store.count(lib).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn dispatch_rejects_unknown_tool() {
        let svc = service(vec![]);
        let err = svc.dispatch("agent", "vector.compact", json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::UnknownTool(_)));
    }

    #[tokio::test]
    async fn dispatch_rejects_malformed_arguments() {
        let svc = service(vec![]);
        let err = svc
            .dispatch("agent", "vector.query", json!({"top_k": "not-a-number"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
