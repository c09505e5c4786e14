// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Pipeline-level tests: chunker → metadata → deterministic ids → store.

use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use alexandria_vector::application::{AccessControl, CatalogEntry, LibraryCatalog, VectorToolService};
use alexandria_vector::domain::{ChunkType, Language};
use alexandria_vector::error::EmbeddingError;
use alexandria_vector::infrastructure::{
    chunk_doc_id, Chunker, ChunkerConfig, Embedder, InMemoryVectorStore, MetadataExtractor,
    QdrantVectorStore, VectorStore,
};

const PYTHON_SERVICE: &str = r#"
import asyncio
from fastapi import FastAPI

app = FastAPI()

def normalize_name(raw: str) -> str:
    """Lowercase and strip a display name before storing or comparing it."""
    return raw.strip().lower()

class AccountService:
    def __init__(self, repository):
        self.repository = repository

    async def rename(self, account_id, new_name):
        normalized = normalize_name(new_name)
        return await self.repository.update_name(account_id, normalized)
"#;

const GUIDE_MARKDOWN: &str = r#"# Operations Guide

This guide describes the day-to-day operation of the service in detail.

## Backups

Nightly backups run at 02:00 UTC and land in the archive bucket. Restore
drills happen monthly and should take under fifteen minutes end to end.

## Monitoring

Dashboards track ingest latency and queue depth. Alerts page the on-call
engineer when the error budget burn rate doubles.

```bash
make deploy-dashboards
```
"#;

struct AllowAll {
    libraries: Vec<Uuid>,
}

#[async_trait::async_trait]
impl LibraryCatalog for AllowAll {
    async fn list_libraries(&self) -> anyhow::Result<Vec<CatalogEntry>> {
        Ok(self
            .libraries
            .iter()
            .map(|id| CatalogEntry {
                library_id: *id,
                mcp_write_enabled: true,
            })
            .collect())
    }

    async fn write_flag(&self, library_id: Uuid) -> anyhow::Result<Option<bool>> {
        Ok(self.libraries.contains(&library_id).then_some(true))
    }
}

struct LengthEmbedder;

#[async_trait::async_trait]
impl Embedder for LengthEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(vec![text.len() as f32, (text.lines().count() + 1) as f32, 1.0])
    }
}

#[test]
fn python_file_chunks_to_symbols_with_metadata() {
    let chunker = Chunker::new(ChunkerConfig::default());
    let chunks = chunker.chunk_content(PYTHON_SERVICE, "account_service.py", None);

    assert!(chunks.len() >= 2);
    let func = chunks
        .iter()
        .find(|c| c.name.as_deref() == Some("normalize_name"))
        .expect("function chunk");
    assert_eq!(func.chunk_type, ChunkType::Function);
    assert!(func.docstring.as_deref().unwrap().contains("Lowercase"));
    assert!(func.imports.contains(&"asyncio".to_string()));

    let class = chunks
        .iter()
        .find(|c| c.name.as_deref() == Some("AccountService"))
        .expect("class chunk");
    assert_eq!(class.chunk_type, ChunkType::Class);

    let meta = MetadataExtractor::new().extract_code_metadata(
        PYTHON_SERVICE,
        "account_service.py",
        Language::Python,
    );
    assert!(meta.frameworks.contains(&"fastapi".to_string()));
    assert!(meta.classes.contains(&"AccountService".to_string()));
}

#[test]
fn markdown_guide_chunks_by_section() {
    let chunker = Chunker::new(ChunkerConfig::default());
    let chunks = chunker.chunk_content(GUIDE_MARKDOWN, "guide.md", Some("text/markdown"));

    let headings: Vec<_> = chunks.iter().filter_map(|c| c.heading.as_deref()).collect();
    assert!(headings.contains(&"Operations Guide"));
    assert!(headings.contains(&"Backups"));
    assert!(headings.contains(&"Monitoring"));

    let monitoring = chunks
        .iter()
        .find(|c| c.heading.as_deref() == Some("Monitoring"))
        .unwrap();
    assert!(monitoring.has_code_blocks);
    assert_eq!(monitoring.code_languages, vec!["bash".to_string()]);
    assert_eq!(monitoring.parent_heading.as_deref(), Some("Operations Guide"));
}

#[tokio::test]
async fn chunks_flow_through_upsert_query_delete() {
    let library = Uuid::new_v4();
    let store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
    let access = Arc::new(AccessControl::new(
        Arc::new(AllowAll { libraries: vec![library] }),
        false,
        100,
        60,
    ));
    let tools = VectorToolService::new(store.clone(), Arc::new(LengthEmbedder), access, 0.3);

    // Chunk a real document, then feed the chunks through the tool
    // surface the way the indexing pipeline would.
    let chunker = Chunker::new(ChunkerConfig::default());
    let chunks = chunker.chunk_content(GUIDE_MARKDOWN, "guide.md", None);
    assert!(!chunks.is_empty());

    let args = json!({
        "chunks": chunks.iter().map(|c| c.content.clone()).collect::<Vec<_>>(),
        "metadata": chunks.iter().map(|c| json!({
            "path": "/docs/guide.md",
            "chunk_id": c.index,
            "library_id": library.to_string(),
            "doc_id": "guide-doc",
            "chunk_type": c.chunk_type.as_str(),
            "file_name": "guide.md",
        })).collect::<Vec<_>>(),
    });

    let upsert = tools.dispatch("agent-1", "vector.upsert_documents", args.clone()).await.unwrap();
    assert_eq!(upsert["upserted_count"].as_u64().unwrap() as usize, chunks.len());
    assert!(upsert["errors"].as_array().unwrap().is_empty());

    // Idempotence: same ids, unchanged count.
    let again = tools.dispatch("agent-1", "vector.upsert_documents", args).await.unwrap();
    assert_eq!(again["ids"], upsert["ids"]);
    assert_eq!(store.count(library).await.unwrap(), chunks.len());

    let query = tools
        .dispatch("agent-1", "vector.query", json!({ "text": "backups and restore drills", "top_k": 3 }))
        .await
        .unwrap();
    assert!(!query["results"].as_array().unwrap().is_empty());
    assert!(query["query_id"].as_str().is_some());

    // Fetch by id.
    let first_id = upsert["ids"][0].as_str().unwrap();
    assert_eq!(first_id, chunk_doc_id(library, Some("guide-doc"), 0, "/docs/guide.md"));
    let got = tools
        .dispatch("agent-1", "vector.get", json!({ "ids": [first_id] }))
        .await
        .unwrap();
    assert_eq!(got["items"].as_array().unwrap().len(), 1);

    // Delete everything for the document.
    let deleted = tools
        .dispatch("agent-1", "vector.delete", json!({ "where": { "doc_id": "guide-doc" } }))
        .await
        .unwrap();
    assert_eq!(deleted["deleted_count"].as_u64().unwrap() as usize, chunks.len());
    assert_eq!(store.count(library).await.unwrap(), 0);
}

#[tokio::test]
#[ignore] // Requires a running Qdrant instance
async fn qdrant_round_trip() {
    let store = QdrantVectorStore::new("http://localhost:6334", 3).unwrap();
    let library = Uuid::new_v4();

    let ids = vec![chunk_doc_id(library, Some("d1"), 0, "/a.txt")];
    let contents = vec!["integration chunk".to_string()];
    let embeddings = vec![vec![0.1, 0.2, 0.3]];
    let mut meta = serde_json::Map::new();
    meta.insert("path".into(), json!("/a.txt"));
    meta.insert("doc_id".into(), json!("d1"));

    store
        .upsert(library, &ids, &contents, &embeddings, &[meta])
        .await
        .unwrap();
    assert_eq!(store.count(library).await.unwrap(), 1);

    let hits = store.search(library, vec![0.1, 0.2, 0.3], 5, &[]).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, ids[0]);
    assert!(hits[0].score > 0.9);

    store.delete_collection(library).await.unwrap();
}
