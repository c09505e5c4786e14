// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Vector store adapter: one collection per library.
//!
//! Collections are created lazily and cached per process. Chunk identity is
//! deterministic — `{library_id}:{doc_id}:chunk:{index}`, falling back to
//! the first 16 hex of `sha256(path)` when no doc id exists — so repeated
//! indexing of the same document overwrites instead of duplicating.
//!
//! Qdrant point ids must be UUIDs, so the chunk id string is mapped to a
//! UUIDv5 over a fixed namespace; the original string rides in the payload
//! and is what callers see.

use async_trait::async_trait;
use dashmap::DashMap;
use qdrant_client::qdrant::{
    value::Kind, Condition, CountPointsBuilder, CreateCollectionBuilder, DeletePointsBuilder,
    Distance, Filter, GetPointsBuilder, PointId, PointStruct, ScrollPointsBuilder,
    SearchPointsBuilder, UpsertPointsBuilder, Value as QdrantValue, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::VectorStoreError;

const COLLECTION_PREFIX: &str = "alexandria_lib_";
const SCROLL_PAGE: u32 = 256;

/// Build the deterministic chunk document id.
pub fn chunk_doc_id(library_id: Uuid, doc_id: Option<&str>, chunk_index: i64, path: &str) -> String {
    match doc_id {
        Some(doc) if !doc.is_empty() => format!("{library_id}:{doc}:chunk:{chunk_index}"),
        _ => {
            let digest = Sha256::digest(path.as_bytes());
            let hash = hex::encode(digest);
            format!("{library_id}:{}:chunk:{chunk_index}", &hash[..16])
        }
    }
}

/// Extract the library id from a chunk document id.
pub fn parse_chunk_library(chunk_id: &str) -> Option<Uuid> {
    chunk_id.split(':').next().and_then(|s| Uuid::parse_str(s).ok())
}

/// Convert a raw distance into a bounded relevance score.
pub fn score_from_distance(distance: f64) -> f64 {
    if distance < 1.0 {
        (1.0 - distance).max(0.0)
    } else {
        1.0 / (1.0 + distance)
    }
}

fn collection_name(library_id: Uuid) -> String {
    format!("{COLLECTION_PREFIX}{}", library_id.to_string().replace('-', "_"))
}

fn point_id_for(chunk_id: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_URL, chunk_id.as_bytes()).to_string()
}

/// A search hit.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub id: String,
    pub text: String,
    pub metadata: Map<String, Value>,
    pub score: f64,
    pub distance: f64,
}

/// A chunk fetched by id.
#[derive(Debug, Clone)]
pub struct StoredChunk {
    pub id: String,
    pub text: String,
    pub metadata: Map<String, Value>,
}

/// Collection-per-library vector store operations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn search(
        &self,
        library_id: Uuid,
        query_embedding: Vec<f32>,
        n_results: usize,
        where_clauses: &[(String, String)],
    ) -> Result<Vec<ScoredChunk>, VectorStoreError>;

    /// Overwrite-safe batch insert. All slices must be equal length.
    async fn upsert(
        &self,
        library_id: Uuid,
        ids: &[String],
        contents: &[String],
        embeddings: &[Vec<f32>],
        metadatas: &[Map<String, Value>],
    ) -> Result<(), VectorStoreError>;

    async fn get(&self, library_id: Uuid, ids: &[String]) -> Result<Vec<StoredChunk>, VectorStoreError>;

    /// Delete chunks matching every clause; returns the number removed.
    async fn delete_by_filter(
        &self,
        library_id: Uuid,
        where_clauses: &[(String, String)],
    ) -> Result<usize, VectorStoreError>;

    /// Prefix queries are not native to the store; this scans payload
    /// metadata and deletes matching ids.
    async fn delete_by_path_prefix(&self, library_id: Uuid, prefix: &str) -> Result<usize, VectorStoreError>;

    async fn delete_collection(&self, library_id: Uuid) -> Result<(), VectorStoreError>;

    async fn count(&self, library_id: Uuid) -> Result<usize, VectorStoreError>;
}

// ============================================================================
// In-memory implementation (development and testing)
// ============================================================================

type MemoryCollection = HashMap<String, (String, Map<String, Value>, Vec<f32>)>;

/// In-memory [`VectorStore`] with brute-force cosine search.
#[derive(Default)]
pub struct InMemoryVectorStore {
    collections: DashMap<Uuid, MemoryCollection>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
        if a.len() != b.len() || a.is_empty() {
            return 0.0;
        }
        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        if mag_a == 0.0 || mag_b == 0.0 {
            return 0.0;
        }
        (dot / (mag_a * mag_b)) as f64
    }

    fn matches(metadata: &Map<String, Value>, clauses: &[(String, String)]) -> bool {
        clauses.iter().all(|(key, expected)| {
            metadata.get(key).is_some_and(|v| match v {
                Value::String(s) => s == expected,
                other => other.to_string() == *expected,
            })
        })
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn search(
        &self,
        library_id: Uuid,
        query_embedding: Vec<f32>,
        n_results: usize,
        where_clauses: &[(String, String)],
    ) -> Result<Vec<ScoredChunk>, VectorStoreError> {
        let Some(collection) = self.collections.get(&library_id) else {
            return Ok(Vec::new());
        };

        let mut hits: Vec<ScoredChunk> = collection
            .iter()
            .filter(|(_, (_, metadata, _))| Self::matches(metadata, where_clauses))
            .map(|(id, (text, metadata, embedding))| {
                let distance = 1.0 - Self::cosine_similarity(&query_embedding, embedding);
                ScoredChunk {
                    id: id.clone(),
                    text: text.clone(),
                    metadata: metadata.clone(),
                    score: score_from_distance(distance),
                    distance,
                }
            })
            .collect();

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(n_results);
        Ok(hits)
    }

    async fn upsert(
        &self,
        library_id: Uuid,
        ids: &[String],
        contents: &[String],
        embeddings: &[Vec<f32>],
        metadatas: &[Map<String, Value>],
    ) -> Result<(), VectorStoreError> {
        let mut collection = self.collections.entry(library_id).or_default();
        for i in 0..ids.len() {
            collection.insert(
                ids[i].clone(),
                (contents[i].clone(), metadatas[i].clone(), embeddings[i].clone()),
            );
        }
        Ok(())
    }

    async fn get(&self, library_id: Uuid, ids: &[String]) -> Result<Vec<StoredChunk>, VectorStoreError> {
        let Some(collection) = self.collections.get(&library_id) else {
            return Ok(Vec::new());
        };
        Ok(ids
            .iter()
            .filter_map(|id| {
                collection.get(id).map(|(text, metadata, _)| StoredChunk {
                    id: id.clone(),
                    text: text.clone(),
                    metadata: metadata.clone(),
                })
            })
            .collect())
    }

    async fn delete_by_filter(
        &self,
        library_id: Uuid,
        where_clauses: &[(String, String)],
    ) -> Result<usize, VectorStoreError> {
        let Some(mut collection) = self.collections.get_mut(&library_id) else {
            return Ok(0);
        };
        let to_delete: Vec<String> = collection
            .iter()
            .filter(|(_, (_, metadata, _))| Self::matches(metadata, where_clauses))
            .map(|(id, _)| id.clone())
            .collect();
        for id in &to_delete {
            collection.remove(id);
        }
        Ok(to_delete.len())
    }

    async fn delete_by_path_prefix(&self, library_id: Uuid, prefix: &str) -> Result<usize, VectorStoreError> {
        let Some(mut collection) = self.collections.get_mut(&library_id) else {
            return Ok(0);
        };
        let to_delete: Vec<String> = collection
            .iter()
            .filter(|(_, (_, metadata, _))| {
                metadata
                    .get("path")
                    .and_then(Value::as_str)
                    .is_some_and(|p| p.starts_with(prefix))
            })
            .map(|(id, _)| id.clone())
            .collect();
        for id in &to_delete {
            collection.remove(id);
        }
        Ok(to_delete.len())
    }

    async fn delete_collection(&self, library_id: Uuid) -> Result<(), VectorStoreError> {
        self.collections.remove(&library_id);
        Ok(())
    }

    async fn count(&self, library_id: Uuid) -> Result<usize, VectorStoreError> {
        Ok(self.collections.get(&library_id).map_or(0, |c| c.len()))
    }
}

// ============================================================================
// Qdrant implementation
// ============================================================================

pub struct QdrantVectorStore {
    client: Qdrant,
    vector_dim: u64,
    /// Lazily-created collections, at most one creation per key.
    known_collections: DashMap<String, ()>,
}

impl QdrantVectorStore {
    pub fn new(url: &str, vector_dim: u64) -> Result<Self, VectorStoreError> {
        let client = Qdrant::from_url(url)
            .build()
            .map_err(|e| VectorStoreError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            vector_dim,
            known_collections: DashMap::new(),
        })
    }

    async fn ensure_collection(&self, library_id: Uuid) -> Result<String, VectorStoreError> {
        let name = collection_name(library_id);
        if self.known_collections.contains_key(&name) {
            return Ok(name);
        }

        let exists = self
            .client
            .collection_exists(&name)
            .await
            .map_err(|e| VectorStoreError::Unavailable(e.to_string()))?;

        if !exists {
            self.client
                .create_collection(
                    CreateCollectionBuilder::new(&name)
                        .vectors_config(VectorParamsBuilder::new(self.vector_dim, Distance::Cosine)),
                )
                .await
                .map_err(|e| VectorStoreError::Collection {
                    library_id: library_id.to_string(),
                    message: e.to_string(),
                })?;
        }

        self.known_collections.insert(name.clone(), ());
        Ok(name)
    }

    fn filter_from(clauses: &[(String, String)]) -> Option<Filter> {
        if clauses.is_empty() {
            return None;
        }
        let conditions: Vec<Condition> = clauses
            .iter()
            .map(|(key, value)| Condition::matches(key.clone(), value.clone()))
            .collect();
        Some(Filter::must(conditions))
    }

    fn payload_from(chunk_id: &str, text: &str, metadata: &Map<String, Value>) -> HashMap<String, QdrantValue> {
        let mut payload = HashMap::new();
        payload.insert("chunk_doc_id".to_string(), chunk_id.to_string().into());
        payload.insert("text".to_string(), text.to_string().into());
        for (key, value) in metadata {
            let converted: QdrantValue = match value {
                Value::String(s) => s.clone().into(),
                Value::Bool(b) => (*b).into(),
                Value::Number(n) if n.is_i64() => n.as_i64().unwrap_or_default().into(),
                Value::Number(n) if n.is_u64() => (n.as_u64().unwrap_or_default() as i64).into(),
                Value::Number(n) => n.as_f64().unwrap_or_default().into(),
                other => other.to_string().into(),
            };
            payload.insert(key.clone(), converted);
        }
        payload
    }

    fn payload_to_chunk(payload: &HashMap<String, QdrantValue>) -> (String, String, Map<String, Value>) {
        let mut id = String::new();
        let mut text = String::new();
        let mut metadata = Map::new();

        for (key, value) in payload {
            let json = Self::qdrant_value_to_json(value);
            match key.as_str() {
                "chunk_doc_id" => {
                    if let Value::String(s) = &json {
                        id = s.clone();
                    }
                }
                "text" => {
                    if let Value::String(s) = &json {
                        text = s.clone();
                    }
                }
                _ => {
                    metadata.insert(key.clone(), json);
                }
            }
        }

        (id, text, metadata)
    }

    fn qdrant_value_to_json(value: &QdrantValue) -> Value {
        match &value.kind {
            Some(Kind::StringValue(s)) => Value::String(s.clone()),
            Some(Kind::IntegerValue(i)) => Value::from(*i),
            Some(Kind::DoubleValue(d)) => {
                serde_json::Number::from_f64(*d).map(Value::Number).unwrap_or(Value::Null)
            }
            Some(Kind::BoolValue(b)) => Value::Bool(*b),
            _ => Value::Null,
        }
    }
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    async fn search(
        &self,
        library_id: Uuid,
        query_embedding: Vec<f32>,
        n_results: usize,
        where_clauses: &[(String, String)],
    ) -> Result<Vec<ScoredChunk>, VectorStoreError> {
        let collection = self.ensure_collection(library_id).await?;

        let mut builder = SearchPointsBuilder::new(&collection, query_embedding, n_results as u64)
            .with_payload(true);
        if let Some(filter) = Self::filter_from(where_clauses) {
            builder = builder.filter(filter);
        }

        let response = self
            .client
            .search_points(builder)
            .await
            .map_err(|e| VectorStoreError::Unavailable(e.to_string()))?;

        let mut hits = Vec::with_capacity(response.result.len());
        for point in response.result {
            let (id, text, metadata) = Self::payload_to_chunk(&point.payload);
            // Cosine similarity comes back as a score; recover the distance
            // so the bounded conversion applies uniformly.
            let distance = 1.0 - point.score as f64;
            hits.push(ScoredChunk {
                id,
                text,
                metadata,
                score: score_from_distance(distance),
                distance,
            });
        }
        Ok(hits)
    }

    async fn upsert(
        &self,
        library_id: Uuid,
        ids: &[String],
        contents: &[String],
        embeddings: &[Vec<f32>],
        metadatas: &[Map<String, Value>],
    ) -> Result<(), VectorStoreError> {
        let collection = self.ensure_collection(library_id).await?;

        let points: Vec<PointStruct> = (0..ids.len())
            .map(|i| {
                PointStruct::new(
                    point_id_for(&ids[i]),
                    embeddings[i].clone(),
                    Self::payload_from(&ids[i], &contents[i], &metadatas[i]),
                )
            })
            .collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(&collection, points))
            .await
            .map_err(|e| VectorStoreError::Unavailable(e.to_string()))?;
        Ok(())
    }

    async fn get(&self, library_id: Uuid, ids: &[String]) -> Result<Vec<StoredChunk>, VectorStoreError> {
        let collection = self.ensure_collection(library_id).await?;

        let point_ids: Vec<PointId> = ids.iter().map(|id| PointId::from(point_id_for(id))).collect();
        let response = self
            .client
            .get_points(GetPointsBuilder::new(&collection, point_ids).with_payload(true))
            .await
            .map_err(|e| VectorStoreError::Unavailable(e.to_string()))?;

        Ok(response
            .result
            .iter()
            .map(|point| {
                let (id, text, metadata) = Self::payload_to_chunk(&point.payload);
                StoredChunk { id, text, metadata }
            })
            .collect())
    }

    async fn delete_by_filter(
        &self,
        library_id: Uuid,
        where_clauses: &[(String, String)],
    ) -> Result<usize, VectorStoreError> {
        let collection = self.ensure_collection(library_id).await?;
        let filter = Self::filter_from(where_clauses);

        // Collect matching ids first so the affected count is exact.
        let mut matched: Vec<PointId> = Vec::new();
        let mut offset: Option<PointId> = None;
        loop {
            let mut builder = ScrollPointsBuilder::new(&collection).limit(SCROLL_PAGE);
            if let Some(f) = filter.clone() {
                builder = builder.filter(f);
            }
            if let Some(off) = offset.clone() {
                builder = builder.offset(off);
            }

            let response = self
                .client
                .scroll(builder)
                .await
                .map_err(|e| VectorStoreError::Unavailable(e.to_string()))?;

            if response.result.is_empty() {
                break;
            }
            matched.extend(response.result.iter().filter_map(|p| p.id.clone()));

            offset = response.next_page_offset;
            if offset.is_none() {
                break;
            }
        }

        if matched.is_empty() {
            return Ok(0);
        }

        let count = matched.len();
        self.client
            .delete_points(DeletePointsBuilder::new(&collection).points(matched))
            .await
            .map_err(|e| VectorStoreError::Unavailable(e.to_string()))?;
        Ok(count)
    }

    async fn delete_by_path_prefix(&self, library_id: Uuid, prefix: &str) -> Result<usize, VectorStoreError> {
        let collection = self.ensure_collection(library_id).await?;

        let mut matched: Vec<PointId> = Vec::new();
        let mut offset: Option<PointId> = None;
        loop {
            let mut builder = ScrollPointsBuilder::new(&collection)
                .with_payload(true)
                .limit(SCROLL_PAGE);
            if let Some(off) = offset.clone() {
                builder = builder.offset(off);
            }

            let response = self
                .client
                .scroll(builder)
                .await
                .map_err(|e| VectorStoreError::Unavailable(e.to_string()))?;

            if response.result.is_empty() {
                break;
            }

            for point in &response.result {
                let path_matches = point
                    .payload
                    .get("path")
                    .and_then(|v| match &v.kind {
                        Some(Kind::StringValue(s)) => Some(s.as_str()),
                        _ => None,
                    })
                    .is_some_and(|p| p.starts_with(prefix));
                if path_matches {
                    if let Some(id) = point.id.clone() {
                        matched.push(id);
                    }
                }
            }

            offset = response.next_page_offset;
            if offset.is_none() {
                break;
            }
        }

        if matched.is_empty() {
            return Ok(0);
        }

        let count = matched.len();
        self.client
            .delete_points(DeletePointsBuilder::new(&collection).points(matched))
            .await
            .map_err(|e| VectorStoreError::Unavailable(e.to_string()))?;
        Ok(count)
    }

    async fn delete_collection(&self, library_id: Uuid) -> Result<(), VectorStoreError> {
        let name = collection_name(library_id);
        self.client
            .delete_collection(&name)
            .await
            .map_err(|e| VectorStoreError::Collection {
                library_id: library_id.to_string(),
                message: e.to_string(),
            })?;
        self.known_collections.remove(&name);
        Ok(())
    }

    async fn count(&self, library_id: Uuid) -> Result<usize, VectorStoreError> {
        let collection = self.ensure_collection(library_id).await?;
        let response = self
            .client
            .count(CountPointsBuilder::new(&collection).exact(true))
            .await
            .map_err(|e| VectorStoreError::Unavailable(e.to_string()))?;
        Ok(response.result.map_or(0, |r| r.count as usize))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meta(path: &str, doc_id: &str) -> Map<String, Value> {
        let mut m = Map::new();
        m.insert("path".into(), json!(path));
        m.insert("doc_id".into(), json!(doc_id));
        m
    }

    #[test]
    fn chunk_id_uses_doc_id_when_present() {
        let lib = Uuid::nil();
        let id = chunk_doc_id(lib, Some("doc-1"), 3, "/a/b.txt");
        assert_eq!(id, format!("{lib}:doc-1:chunk:3"));
    }

    #[test]
    fn chunk_id_falls_back_to_path_hash() {
        let lib = Uuid::nil();
        let id_a = chunk_doc_id(lib, None, 0, "/a/b.txt");
        let id_b = chunk_doc_id(lib, None, 0, "/a/b.txt");
        let id_c = chunk_doc_id(lib, None, 0, "/other.txt");
        assert_eq!(id_a, id_b);
        assert_ne!(id_a, id_c);
        // 16-hex hash segment.
        let segment = id_a.split(':').nth(1).unwrap();
        assert_eq!(segment.len(), 16);
    }

    #[test]
    fn chunk_library_round_trips() {
        let lib = Uuid::new_v4();
        let id = chunk_doc_id(lib, Some("d"), 0, "");
        assert_eq!(parse_chunk_library(&id), Some(lib));
        assert_eq!(parse_chunk_library("not-a-uuid:x"), None);
    }

    #[test]
    fn score_conversion_is_bounded() {
        assert_eq!(score_from_distance(0.0), 1.0);
        assert!((score_from_distance(0.25) - 0.75).abs() < 1e-9);
        assert!((score_from_distance(3.0) - 0.25).abs() < 1e-9);
        assert!(score_from_distance(0.999) > 0.0);
        for d in [0.0, 0.5, 0.99, 1.0, 10.0, 1000.0] {
            let s = score_from_distance(d);
            assert!((0.0..=1.0).contains(&s), "score {s} out of range for distance {d}");
        }
    }

    #[tokio::test]
    async fn upsert_is_idempotent() {
        let store = InMemoryVectorStore::new();
        let lib = Uuid::new_v4();
        let ids = vec![chunk_doc_id(lib, Some("d1"), 0, "/f.txt")];
        let contents = vec!["hello".to_string()];
        let embeddings = vec![vec![1.0, 0.0]];
        let metadatas = vec![meta("/f.txt", "d1")];

        store.upsert(lib, &ids, &contents, &embeddings, &metadatas).await.unwrap();
        store.upsert(lib, &ids, &contents, &embeddings, &metadatas).await.unwrap();

        assert_eq!(store.count(lib).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn search_orders_by_similarity_and_respects_filters() {
        let store = InMemoryVectorStore::new();
        let lib = Uuid::new_v4();
        store
            .upsert(
                lib,
                &["a".into(), "b".into()],
                &["close".into(), "far".into()],
                &[vec![1.0, 0.0], vec![0.0, 1.0]],
                &[meta("/x.txt", "d1"), meta("/y.txt", "d2")],
            )
            .await
            .unwrap();

        let hits = store.search(lib, vec![0.9, 0.1], 10, &[]).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "a");
        assert!(hits[0].score > hits[1].score);

        let filtered = store
            .search(lib, vec![0.9, 0.1], 10, &[("doc_id".into(), "d2".into())])
            .await
            .unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, "b");
    }

    #[tokio::test]
    async fn delete_by_filter_reports_count() {
        let store = InMemoryVectorStore::new();
        let lib = Uuid::new_v4();
        store
            .upsert(
                lib,
                &["a".into(), "b".into(), "c".into()],
                &["1".into(), "2".into(), "3".into()],
                &[vec![1.0], vec![1.0], vec![1.0]],
                &[meta("/x.txt", "d1"), meta("/x.txt", "d1"), meta("/y.txt", "d2")],
            )
            .await
            .unwrap();

        let deleted = store
            .delete_by_filter(lib, &[("doc_id".into(), "d1".into())])
            .await
            .unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(store.count(lib).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn delete_by_path_prefix_scans_metadata() {
        let store = InMemoryVectorStore::new();
        let lib = Uuid::new_v4();
        store
            .upsert(
                lib,
                &["a".into(), "b".into(), "c".into()],
                &["1".into(), "2".into(), "3".into()],
                &[vec![1.0], vec![1.0], vec![1.0]],
                &[
                    meta("/reports/q1.pdf", "d1"),
                    meta("/reports/q2.pdf", "d2"),
                    meta("/notes/n.md", "d3"),
                ],
            )
            .await
            .unwrap();

        let deleted = store.delete_by_path_prefix(lib, "/reports/").await.unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(store.count(lib).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn missing_collection_is_empty_not_error() {
        let store = InMemoryVectorStore::new();
        let lib = Uuid::new_v4();
        assert!(store.search(lib, vec![1.0], 5, &[]).await.unwrap().is_empty());
        assert_eq!(store.count(lib).await.unwrap(), 0);
        assert_eq!(store.delete_by_path_prefix(lib, "/x").await.unwrap(), 0);
    }

    #[test]
    fn point_ids_are_deterministic() {
        let a = point_id_for("lib:doc:chunk:0");
        let b = point_id_for("lib:doc:chunk:0");
        let c = point_id_for("lib:doc:chunk:1");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
