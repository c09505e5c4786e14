// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! End-to-end tests of the upload state machine, versioning, trash
//! restore, and the indexing pipeline, running over in-memory adapters.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use alexandria_core::application::file_service::{
    FileService, InitUploadOutcome, InitUploadRequest, UploadInitResponse,
};
use alexandria_core::application::trash_service::RestoreRequest;
use alexandria_core::application::{AuditService, IndexingService, TrashService};
use alexandria_core::domain::audit::AuditEvent;
use alexandria_core::domain::directory::Directory;
use alexandria_core::domain::file::{FileMetadata, FileVersion};
use alexandria_core::domain::identity::{RequestContext, UserContext};
use alexandria_core::domain::library::Library;
use alexandria_core::domain::repository::{
    AuditRepository, DirectoryRepository, FileRepository, LibraryRepository, RepoResult,
    RepositoryError,
};
use alexandria_core::domain::trash::TrashItemType;
use alexandria_core::domain::upload::OnDuplicate;
use alexandria_core::error::ServiceError;
use alexandria_core::infrastructure::{EntityCache, MemoryObjectStore, ObjectStore, RealtimeBus};

use alexandria_vector::error::EmbeddingError;
use alexandria_vector::infrastructure::{
    Chunker, ChunkerConfig, ContentExtractor, Embedder, InMemoryVectorStore, MetadataExtractor,
    VectorStore,
};

const CHUNK_SIZE: u64 = 64;
const MAX_FILE_SIZE: u64 = 4096;
const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

// ---------------------------------------------------------------------------
// In-memory repositories
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MemoryLibraryRepository {
    rows: Mutex<HashMap<Uuid, Library>>,
}

#[async_trait]
impl LibraryRepository for MemoryLibraryRepository {
    async fn insert(&self, library: &Library) -> RepoResult<()> {
        self.rows.lock().insert(library.id, library.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<Library>> {
        Ok(self.rows.lock().get(&id).filter(|l| !l.is_deleted).cloned())
    }

    async fn find_any_by_id(&self, id: Uuid) -> RepoResult<Option<Library>> {
        Ok(self.rows.lock().get(&id).cloned())
    }

    async fn list_non_deleted(&self) -> RepoResult<Vec<Library>> {
        Ok(self.rows.lock().values().filter(|l| !l.is_deleted).cloned().collect())
    }

    async fn list_for_owner(&self, owner_id: Uuid) -> RepoResult<Vec<Library>> {
        Ok(self
            .rows
            .lock()
            .values()
            .filter(|l| !l.is_deleted && l.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn update(&self, library: &Library) -> RepoResult<()> {
        self.rows.lock().insert(library.id, library.clone());
        Ok(())
    }

    async fn soft_delete(&self, id: Uuid, actor: Uuid, at: DateTime<Utc>) -> RepoResult<()> {
        let mut rows = self.rows.lock();
        let library = rows
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::NotFound(format!("library {id}")))?;
        library.is_deleted = true;
        library.deleted_at = Some(at);
        library.deleted_by = Some(actor);
        Ok(())
    }

    async fn hard_delete(&self, id: Uuid) -> RepoResult<()> {
        self.rows.lock().remove(&id);
        Ok(())
    }

    async fn stats(&self, _id: Uuid) -> RepoResult<(i64, i64, i64)> {
        Ok((0, 0, 0))
    }
}

#[derive(Default)]
struct MemoryDirectoryRepository {
    rows: Mutex<HashMap<Uuid, Directory>>,
}

#[async_trait]
impl DirectoryRepository for MemoryDirectoryRepository {
    async fn insert(&self, directory: &Directory) -> RepoResult<()> {
        self.rows.lock().insert(directory.id, directory.clone());
        Ok(())
    }

    async fn find_by_id(&self, library_id: Uuid, id: Uuid) -> RepoResult<Option<Directory>> {
        Ok(self
            .rows
            .lock()
            .get(&id)
            .filter(|d| d.library_id == library_id && !d.is_deleted)
            .cloned())
    }

    async fn find_any_by_id(&self, id: Uuid) -> RepoResult<Option<Directory>> {
        Ok(self.rows.lock().get(&id).cloned())
    }

    async fn find_child_by_name(
        &self,
        library_id: Uuid,
        parent_id: Option<Uuid>,
        name: &str,
    ) -> RepoResult<Option<Directory>> {
        Ok(self
            .rows
            .lock()
            .values()
            .find(|d| {
                d.library_id == library_id && d.parent_id == parent_id && d.name == name && !d.is_deleted
            })
            .cloned())
    }

    async fn list_children(&self, library_id: Uuid, parent_id: Option<Uuid>) -> RepoResult<Vec<Directory>> {
        Ok(self
            .rows
            .lock()
            .values()
            .filter(|d| d.library_id == library_id && d.parent_id == parent_id && !d.is_deleted)
            .cloned()
            .collect())
    }

    async fn rename(&self, _id: Uuid, _new_name: &str, _actor: Uuid) -> RepoResult<Directory> {
        unreachable!("rename cascade is covered by the Postgres integration tests")
    }

    async fn move_to(
        &self,
        _id: Uuid,
        _new_parent_id: Option<Uuid>,
        _new_parent_path: &str,
        _actor: Uuid,
    ) -> RepoResult<Directory> {
        unreachable!("move cascade is covered by the Postgres integration tests")
    }

    async fn soft_delete_cascade(&self, _id: Uuid, _actor: Uuid, _at: DateTime<Utc>) -> RepoResult<(u64, u64)> {
        unreachable!("delete cascade is covered by the Postgres integration tests")
    }

    async fn restore_cascade(
        &self,
        _id: Uuid,
        _new_parent_id: Option<Uuid>,
        _new_parent_path: &str,
        _actor: Uuid,
    ) -> RepoResult<Directory> {
        unreachable!("restore cascade is covered by the Postgres integration tests")
    }

    async fn list_deleted(&self, library_id: Option<Uuid>) -> RepoResult<Vec<Directory>> {
        Ok(self
            .rows
            .lock()
            .values()
            .filter(|d| d.is_deleted && library_id.is_none_or(|lib| d.library_id == lib))
            .cloned()
            .collect())
    }

    async fn list_deleted_children(&self, parent_id: Uuid) -> RepoResult<Vec<Directory>> {
        Ok(self
            .rows
            .lock()
            .values()
            .filter(|d| d.parent_id == Some(parent_id) && d.is_deleted)
            .cloned()
            .collect())
    }

    async fn hard_delete(&self, id: Uuid) -> RepoResult<()> {
        self.rows.lock().remove(&id);
        Ok(())
    }
}

#[derive(Default)]
struct MemoryFileRepository {
    files: Mutex<HashMap<Uuid, FileMetadata>>,
    versions: Mutex<Vec<FileVersion>>,
}

#[async_trait]
impl FileRepository for MemoryFileRepository {
    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<FileMetadata>> {
        Ok(self.files.lock().get(&id).filter(|f| !f.is_deleted).cloned())
    }

    async fn find_any_by_id(&self, id: Uuid) -> RepoResult<Option<FileMetadata>> {
        Ok(self.files.lock().get(&id).cloned())
    }

    async fn find_by_name(
        &self,
        library_id: Uuid,
        directory_id: Option<Uuid>,
        filename: &str,
    ) -> RepoResult<Option<FileMetadata>> {
        Ok(self
            .files
            .lock()
            .values()
            .find(|f| {
                f.library_id == library_id
                    && f.directory_id == directory_id
                    && f.filename == filename
                    && !f.is_deleted
            })
            .cloned())
    }

    async fn list_in_directory(&self, library_id: Uuid, directory_id: Option<Uuid>) -> RepoResult<Vec<FileMetadata>> {
        Ok(self
            .files
            .lock()
            .values()
            .filter(|f| f.library_id == library_id && f.directory_id == directory_id && !f.is_deleted)
            .cloned()
            .collect())
    }

    async fn list_non_deleted_by_library(&self, library_id: Uuid) -> RepoResult<Vec<FileMetadata>> {
        Ok(self
            .files
            .lock()
            .values()
            .filter(|f| f.library_id == library_id && !f.is_deleted)
            .cloned()
            .collect())
    }

    async fn search_by_name(&self, library_id: Uuid, query: &str, limit: i64) -> RepoResult<Vec<FileMetadata>> {
        let needle = query.to_lowercase();
        Ok(self
            .files
            .lock()
            .values()
            .filter(|f| {
                f.library_id == library_id && !f.is_deleted && f.filename.to_lowercase().contains(&needle)
            })
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn commit_new_file(&self, file: &FileMetadata, version: &FileVersion) -> RepoResult<()> {
        self.files.lock().insert(file.id, file.clone());
        self.versions.lock().push(version.clone());
        Ok(())
    }

    async fn commit_overwrite(
        &self,
        file_id: Uuid,
        size_bytes: i64,
        checksum_sha256: &str,
        storage_key: &str,
        modified_by: Uuid,
        comment: Option<String>,
    ) -> RepoResult<(FileMetadata, FileVersion)> {
        let mut files = self.files.lock();
        let file = files
            .get_mut(&file_id)
            .filter(|f| !f.is_deleted)
            .ok_or_else(|| RepositoryError::NotFound(format!("file {file_id}")))?;

        file.current_version += 1;
        file.size_bytes = size_bytes;
        file.checksum_sha256 = checksum_sha256.to_string();
        file.storage_key = storage_key.to_string();
        file.modified_by = modified_by;
        file.updated_at = Utc::now();

        let version = FileVersion::new(
            file_id,
            file.current_version,
            size_bytes,
            checksum_sha256.to_string(),
            storage_key.to_string(),
            modified_by,
            comment,
        );
        self.versions.lock().push(version.clone());
        Ok((file.clone(), version))
    }

    async fn rename(&self, id: Uuid, new_filename: &str, actor: Uuid) -> RepoResult<FileMetadata> {
        let mut files = self.files.lock();
        let file = files
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::NotFound(format!("file {id}")))?;
        file.filename = new_filename.to_string();
        file.modified_by = actor;
        Ok(file.clone())
    }

    async fn move_to(
        &self,
        id: Uuid,
        directory_id: Option<Uuid>,
        new_path: &str,
        actor: Uuid,
    ) -> RepoResult<FileMetadata> {
        let mut files = self.files.lock();
        let file = files
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::NotFound(format!("file {id}")))?;
        file.directory_id = directory_id;
        file.path = new_path.to_string();
        file.modified_by = actor;
        Ok(file.clone())
    }

    async fn soft_delete(&self, id: Uuid, actor: Uuid, at: DateTime<Utc>) -> RepoResult<()> {
        let mut files = self.files.lock();
        let file = files
            .get_mut(&id)
            .filter(|f| !f.is_deleted)
            .ok_or_else(|| RepositoryError::NotFound(format!("file {id}")))?;
        file.is_deleted = true;
        file.deleted_at = Some(at);
        file.deleted_by = Some(actor);
        file.updated_at = at;
        Ok(())
    }

    async fn restore(&self, id: Uuid, directory_id: Option<Uuid>, path: &str, actor: Uuid) -> RepoResult<FileMetadata> {
        let mut files = self.files.lock();
        let file = files
            .get_mut(&id)
            .filter(|f| f.is_deleted)
            .ok_or_else(|| RepositoryError::NotFound(format!("file {id} in trash")))?;
        file.is_deleted = false;
        file.deleted_at = None;
        file.deleted_by = None;
        file.directory_id = directory_id;
        file.path = path.to_string();
        file.modified_by = actor;
        file.updated_at = Utc::now();
        Ok(file.clone())
    }

    async fn list_deleted(&self, library_id: Option<Uuid>) -> RepoResult<Vec<FileMetadata>> {
        Ok(self
            .files
            .lock()
            .values()
            .filter(|f| f.is_deleted && library_id.is_none_or(|lib| f.library_id == lib))
            .cloned()
            .collect())
    }

    async fn list_deleted_in_directory(&self, directory_id: Uuid) -> RepoResult<Vec<FileMetadata>> {
        Ok(self
            .files
            .lock()
            .values()
            .filter(|f| f.directory_id == Some(directory_id) && f.is_deleted)
            .cloned()
            .collect())
    }

    async fn versions(&self, file_id: Uuid) -> RepoResult<Vec<FileVersion>> {
        let mut versions: Vec<FileVersion> = self
            .versions
            .lock()
            .iter()
            .filter(|v| v.file_id == file_id)
            .cloned()
            .collect();
        versions.sort_by_key(|v| std::cmp::Reverse(v.version_number));
        Ok(versions)
    }

    async fn hard_delete(&self, id: Uuid) -> RepoResult<()> {
        self.files.lock().remove(&id);
        self.versions.lock().retain(|v| v.file_id != id);
        Ok(())
    }
}

#[derive(Default)]
struct MemoryAuditRepository {
    events: Mutex<Vec<AuditEvent>>,
}

#[async_trait]
impl AuditRepository for MemoryAuditRepository {
    async fn append(&self, event: &AuditEvent) -> RepoResult<()> {
        self.events.lock().push(event.clone());
        Ok(())
    }

    async fn by_correlation(&self, correlation_id: Uuid) -> RepoResult<Vec<AuditEvent>> {
        let mut events: Vec<AuditEvent> = self
            .events
            .lock()
            .iter()
            .filter(|e| e.correlation_id == correlation_id)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.timestamp);
        Ok(events)
    }

    async fn by_library(&self, library_id: Uuid, limit: i64, _offset: i64) -> RepoResult<Vec<AuditEvent>> {
        Ok(self
            .events
            .lock()
            .iter()
            .filter(|e| e.library_id == Some(library_id))
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn by_actor(&self, actor_id: Uuid, limit: i64, _offset: i64) -> RepoResult<Vec<AuditEvent>> {
        Ok(self
            .events
            .lock()
            .iter()
            .filter(|e| e.actor_id == actor_id)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn by_target(&self, target_type: &str, target_id: Uuid, limit: i64) -> RepoResult<Vec<AuditEvent>> {
        Ok(self
            .events
            .lock()
            .iter()
            .filter(|e| e.target_type == target_type && e.target_id == target_id)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn summary(&self, _library_id: Uuid, _since: DateTime<Utc>) -> RepoResult<Vec<(String, i64)>> {
        Ok(Vec::new())
    }
}

struct FixedEmbedder;

#[async_trait]
impl Embedder for FixedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        // Deterministic and text-sensitive, so repeat runs are stable.
        Ok(vec![text.len() as f32, 1.0, 0.0])
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

struct Harness {
    files: Arc<FileService>,
    trash: Arc<TrashService>,
    indexer: Arc<IndexingService>,
    vector_store: Arc<InMemoryVectorStore>,
    file_repo: Arc<MemoryFileRepository>,
    library: Library,
    ctx: RequestContext,
}

fn owner_context(owner_id: Uuid) -> RequestContext {
    let user = UserContext {
        user_id: owner_id,
        email: Some("owner@example.com".into()),
        preferred_username: Some("owner".into()),
        roles: vec!["library-user".into()],
        groups: Vec::new(),
        is_guest: false,
    };
    RequestContext::new(user, Uuid::new_v4())
}

async fn harness() -> Harness {
    let owner = Uuid::new_v4();
    let library = Library::new("Test Library".into(), None, owner, "alexandria-lib-");

    let library_repo = Arc::new(MemoryLibraryRepository::default());
    library_repo.insert(&library).await.unwrap();
    let directory_repo = Arc::new(MemoryDirectoryRepository::default());
    let file_repo = Arc::new(MemoryFileRepository::default());
    let audit_repo = Arc::new(MemoryAuditRepository::default());

    let storage = Arc::new(MemoryObjectStore::new());
    storage.create_bucket(&library.bucket_name).await.unwrap();

    let vector_store = Arc::new(InMemoryVectorStore::new());
    let indexer = Arc::new(IndexingService::new(
        file_repo.clone(),
        library_repo.clone(),
        storage.clone(),
        Arc::new(ContentExtractor::new("http://localhost:3000")),
        Arc::new(Chunker::new(ChunkerConfig::default())),
        Arc::new(MetadataExtractor::new()),
        Arc::new(FixedEmbedder),
        vector_store.clone(),
    ));

    let cache = EntityCache::new(300, "test:");
    let bus = Arc::new(RealtimeBus::new());
    let audit = Arc::new(AuditService::new(audit_repo));

    let files = Arc::new(FileService::new(
        file_repo.clone(),
        directory_repo.clone(),
        library_repo.clone(),
        storage.clone(),
        cache.clone(),
        bus,
        audit.clone(),
        indexer.clone(),
        CHUNK_SIZE,
        MAX_FILE_SIZE,
        3600,
    ));

    let trash = Arc::new(TrashService::new(
        file_repo.clone(),
        directory_repo,
        library_repo,
        storage,
        cache,
        audit,
        indexer.clone(),
        30,
    ));

    Harness {
        files,
        trash,
        indexer,
        vector_store,
        file_repo,
        ctx: owner_context(owner),
        library,
    }
}

fn init_request(h: &Harness, filename: &str, size: i64, on_duplicate: OnDuplicate) -> InitUploadRequest {
    InitUploadRequest {
        library_id: h.library.id,
        filename: filename.to_string(),
        content_type: "text/plain".into(),
        size_bytes: size,
        directory_id: None,
        on_duplicate,
    }
}

async fn started(h: &Harness, filename: &str, size: i64, on_duplicate: OnDuplicate) -> UploadInitResponse {
    match h.files.init_upload(&h.ctx, init_request(h, filename, size, on_duplicate)).await.unwrap() {
        InitUploadOutcome::Started(response) => response,
        other => panic!("expected upload to start, got {other:?}"),
    }
}

/// Upload a whole payload through the state machine, multipart or not.
async fn upload(h: &Harness, filename: &str, payload: &[u8], on_duplicate: OnDuplicate) -> FileMetadata {
    let init = started(h, filename, payload.len() as i64, on_duplicate).await;

    if init.total_chunks > 1 {
        for (i, part) in payload.chunks(CHUNK_SIZE as usize).enumerate() {
            h.files
                .upload_part(&init.upload_id, (i + 1) as i32, Bytes::copy_from_slice(part))
                .await
                .unwrap();
        }
    } else {
        h.files
            .upload_part(&init.upload_id, 1, Bytes::copy_from_slice(payload))
            .await
            .unwrap();
    }

    let (file, _version) = h.files.complete_upload(&h.ctx, &init.upload_id, None, None).await.unwrap();
    file
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn zero_byte_upload_yields_valid_empty_checksum() {
    let h = harness().await;
    let init = started(&h, "empty.txt", 0, OnDuplicate::Ask).await;
    assert_eq!(init.total_chunks, 1);

    h.files.upload_part(&init.upload_id, 1, Bytes::new()).await.unwrap();
    let (file, version) = h.files.complete_upload(&h.ctx, &init.upload_id, None, None).await.unwrap();

    assert_eq!(file.size_bytes, 0);
    assert_eq!(file.checksum_sha256, EMPTY_SHA256);
    assert_eq!(version.version_number, 1);
    assert_eq!(version.size_bytes, 0);
}

#[tokio::test]
async fn exactly_chunk_size_takes_single_part_path() {
    let h = harness().await;
    let init = started(&h, "exact.bin", CHUNK_SIZE as i64, OnDuplicate::Ask).await;
    assert_eq!(init.total_chunks, 1);
}

#[tokio::test]
async fn chunk_size_plus_one_takes_multipart_path() {
    let h = harness().await;
    let payload = vec![7u8; CHUNK_SIZE as usize + 1];
    let init = started(&h, "big.bin", payload.len() as i64, OnDuplicate::Ask).await;
    assert_eq!(init.total_chunks, 2);

    for (i, part) in payload.chunks(CHUNK_SIZE as usize).enumerate() {
        let response = h
            .files
            .upload_part(&init.upload_id, (i + 1) as i32, Bytes::copy_from_slice(part))
            .await
            .unwrap();
        assert_eq!(response.part_number, (i + 1) as i32);
        assert!(!response.etag.is_empty());
    }

    let (file, version) = h.files.complete_upload(&h.ctx, &init.upload_id, None, None).await.unwrap();
    assert_eq!(file.size_bytes, payload.len() as i64);
    assert_eq!(file.current_version, 1);
    assert_eq!(version.version_number, 1);
}

#[tokio::test]
async fn oversize_init_is_limit_exceeded() {
    let h = harness().await;
    let result = h
        .files
        .init_upload(&h.ctx, init_request(&h, "huge.bin", MAX_FILE_SIZE as i64 + 1, OnDuplicate::Ask))
        .await;
    assert!(matches!(result, Err(ServiceError::LimitExceeded { .. })));
}

#[tokio::test]
async fn duplicate_ask_returns_conflict_with_suggestion() {
    let h = harness().await;
    upload(&h, "q1.pdf", b"original report content", OnDuplicate::Ask).await;

    let outcome = h
        .files
        .init_upload(&h.ctx, init_request(&h, "q1.pdf", 10, OnDuplicate::Ask))
        .await
        .unwrap();

    match outcome {
        InitUploadOutcome::DuplicateConflict { existing, suggested_name } => {
            assert_eq!(existing.filename, "q1.pdf");
            assert!(suggested_name.starts_with("q1_"));
            assert!(suggested_name.ends_with(".pdf"));
        }
        other => panic!("expected a conflict, got {other:?}"),
    }
}

#[tokio::test]
async fn duplicate_rename_coexists_with_original() {
    let h = harness().await;
    upload(&h, "q1.pdf", b"original report content", OnDuplicate::Ask).await;
    let renamed = upload(&h, "q1.pdf", b"second report content!", OnDuplicate::Rename).await;

    // `{stem}_{epoch}.{ext}`
    assert!(renamed.filename.starts_with("q1_"));
    assert!(renamed.filename.ends_with(".pdf"));
    let middle = &renamed.filename["q1_".len()..renamed.filename.len() - ".pdf".len()];
    assert!(middle.chars().all(|c| c.is_ascii_digit()));

    let original = h
        .file_repo
        .find_by_name(h.library.id, None, "q1.pdf")
        .await
        .unwrap();
    assert!(original.is_some());
    assert_ne!(original.unwrap().id, renamed.id);
}

#[tokio::test]
async fn overwrite_bumps_version_with_new_key_and_checksum() {
    let h = harness().await;
    let v1 = upload(&h, "report.txt", b"version one contents", OnDuplicate::Ask).await;
    let v2 = upload(&h, "report.txt", b"version two contents!", OnDuplicate::Overwrite).await;
    let v3 = upload(&h, "report.txt", b"version three contents", OnDuplicate::Overwrite).await;

    assert_eq!(v2.id, v1.id);
    assert_eq!(v3.id, v1.id);
    assert_eq!(v3.current_version, 3);
    assert_ne!(v3.checksum_sha256, v1.checksum_sha256);
    assert_ne!(v3.storage_key, v1.storage_key);
    assert!(v3.storage_key.ends_with("_v3"));

    // current_version equals both max(version_number) and the row count.
    let versions = h.file_repo.versions(v1.id).await.unwrap();
    assert_eq!(versions.len(), 3);
    assert_eq!(versions[0].version_number, 3);
    let keys: std::collections::HashSet<_> = versions.iter().map(|v| v.storage_key.clone()).collect();
    assert_eq!(keys.len(), 3, "version storage keys are never reused");
}

#[tokio::test]
async fn abort_is_idempotent_and_forgets_the_registration() {
    let h = harness().await;
    let init = started(&h, "gone.bin", (CHUNK_SIZE * 3) as i64, OnDuplicate::Ask).await;
    assert_eq!(h.files.pending_upload_count(), 1);

    h.files.abort_upload(&init.upload_id).await.unwrap();
    h.files.abort_upload(&init.upload_id).await.unwrap();
    assert_eq!(h.files.pending_upload_count(), 0);

    // A completed abort means completion must fail.
    let result = h.files.complete_upload(&h.ctx, &init.upload_id, None, None).await;
    assert!(matches!(result, Err(ServiceError::NotFound(_))));
}

#[tokio::test]
async fn stale_uploads_are_swept() {
    let h = harness().await;
    started(&h, "stale.bin", 10, OnDuplicate::Ask).await;
    assert_eq!(h.files.pending_upload_count(), 1);

    // Zero max-age: everything is stale.
    let swept = h.files.sweep_stale_uploads(0).await;
    assert_eq!(swept, 1);
    assert_eq!(h.files.pending_upload_count(), 0);
}

#[tokio::test]
async fn indexing_round_trip_after_upload() {
    let h = harness().await;
    let body = "A searchable paragraph about quarterly revenue, long enough to chunk.";
    let file = upload(&h, "notes.txt", body.as_bytes(), OnDuplicate::Ask).await;

    let chunks = h.indexer.index_file(file.id).await.unwrap();
    assert!(chunks > 0);
    assert_eq!(h.vector_store.count(h.library.id).await.unwrap(), chunks);

    // Deterministic ids: re-indexing does not grow the collection.
    h.indexer.index_file(file.id).await.unwrap();
    assert_eq!(h.vector_store.count(h.library.id).await.unwrap(), chunks);

    let deleted = h.indexer.deindex_file(file.id, h.library.id).await.unwrap();
    assert_eq!(deleted, chunks);
    assert_eq!(h.vector_store.count(h.library.id).await.unwrap(), 0);
}

#[tokio::test]
async fn soft_delete_then_restore_preserves_attributes() {
    let h = harness().await;
    let file = upload(&h, "keep.txt", b"content that must survive the trash", OnDuplicate::Ask).await;

    h.files.delete_file(&h.ctx, file.id).await.unwrap();
    assert!(h.file_repo.find_by_id(file.id).await.unwrap().is_none());

    let (items, total, total_size) = h.trash.list(&h.ctx, Some(h.library.id), 50, 0).await.unwrap();
    assert_eq!(total, 1);
    assert_eq!(items[0].item_type, TrashItemType::File);
    assert_eq!(items[0].original_path, "/keep.txt");
    assert!(items[0].can_restore);
    assert_eq!(total_size, file.size_bytes);

    let restored_path = h
        .trash
        .restore(
            &h.ctx,
            RestoreRequest {
                item_type: TrashItemType::File,
                item_id: file.id,
                restore_to_original: true,
                new_parent_id: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(restored_path, "/keep.txt");

    let restored = h.file_repo.find_by_id(file.id).await.unwrap().unwrap();
    assert_eq!(restored.checksum_sha256, file.checksum_sha256);
    assert_eq!(restored.storage_key, file.storage_key);
    assert_eq!(restored.current_version, file.current_version);
    assert!(!restored.is_deleted);
    assert!(restored.deleted_at.is_none());
}

#[tokio::test]
async fn purge_removes_rows_and_blobs() {
    let h = harness().await;
    let file = upload(&h, "doomed.txt", b"will be purged permanently", OnDuplicate::Ask).await;
    h.files.delete_file(&h.ctx, file.id).await.unwrap();

    h.trash
        .permanent_delete(&h.ctx, TrashItemType::File, file.id)
        .await
        .unwrap();

    assert!(h.file_repo.find_any_by_id(file.id).await.unwrap().is_none());
    assert!(h.file_repo.versions(file.id).await.unwrap().is_empty());

    let (_, total, _) = h.trash.list(&h.ctx, Some(h.library.id), 50, 0).await.unwrap();
    assert_eq!(total, 0);
}

#[tokio::test]
async fn part_number_out_of_range_is_rejected() {
    let h = harness().await;
    let init = started(&h, "parts.bin", (CHUNK_SIZE * 2) as i64, OnDuplicate::Ask).await;

    let result = h.files.upload_part(&init.upload_id, 0, Bytes::from_static(b"x")).await;
    assert!(matches!(result, Err(ServiceError::Validation(_))));
    let result = h.files.upload_part(&init.upload_id, 10_001, Bytes::from_static(b"x")).await;
    assert!(matches!(result, Err(ServiceError::Validation(_))));
}
