// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Library-scoped agent tools.
//!
//! The non-vector half of the agent tool surface: library listing,
//! directory browsing, file read/create/update, and name search. Every
//! call is gated by the per-library policy engine; writes additionally
//! require the library's own `mcp_write_enabled` flag (enforced inside
//! [`AccessControl`]).

use bytes::Bytes;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use alexandria_vector::application::AccessControl;
use alexandria_vector::error::ToolError;
use alexandria_vector::infrastructure::ContentExtractor;

use crate::domain::file::{unique_filename, validate_filename, FileMetadata, FileVersion};
use crate::domain::repository::{DirectoryRepository, FileRepository, LibraryRepository};
use crate::infrastructure::object_store::{calculate_checksum, generate_storage_key, ObjectStore};
use super::indexing::IndexingService;

/// Agent-readable files are capped; `file.read` refuses anything larger.
const READ_SIZE_CAP: i64 = 512 * 1024;
const SEARCH_LIMIT: i64 = 50;

#[derive(Debug, Deserialize)]
struct BrowseInput {
    library_id: Uuid,
    #[serde(default)]
    directory_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
struct ReadFileInput {
    file_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct CreateFileInput {
    library_id: Uuid,
    #[serde(default)]
    directory_id: Option<Uuid>,
    filename: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct UpdateFileInput {
    file_id: Uuid,
    content: String,
}

#[derive(Debug, Deserialize)]
struct SearchInput {
    library_id: Uuid,
    query: String,
}

pub struct LibraryToolService {
    access: Arc<AccessControl>,
    libraries: Arc<dyn LibraryRepository>,
    directories: Arc<dyn DirectoryRepository>,
    files: Arc<dyn FileRepository>,
    storage: Arc<dyn ObjectStore>,
    extractor: Arc<ContentExtractor>,
    indexer: Arc<IndexingService>,
}

impl LibraryToolService {
    pub fn new(
        access: Arc<AccessControl>,
        libraries: Arc<dyn LibraryRepository>,
        directories: Arc<dyn DirectoryRepository>,
        files: Arc<dyn FileRepository>,
        storage: Arc<dyn ObjectStore>,
        extractor: Arc<ContentExtractor>,
        indexer: Arc<IndexingService>,
    ) -> Self {
        Self {
            access,
            libraries,
            directories,
            files,
            storage,
            extractor,
            indexer,
        }
    }

    /// Dispatch a library tool call by name with raw JSON arguments.
    pub async fn dispatch(&self, agent_id: &str, name: &str, args: Value) -> Result<Value, ToolError> {
        match name {
            "library.list" => self.list_libraries(agent_id).await,
            "library.browse" => {
                let input: BrowseInput = parse(args)?;
                self.browse(agent_id, input).await
            }
            "file.read" => {
                let input: ReadFileInput = parse(args)?;
                self.read_file(agent_id, input).await
            }
            "file.create" => {
                let input: CreateFileInput = parse(args)?;
                self.create_file(agent_id, input).await
            }
            "file.update" => {
                let input: UpdateFileInput = parse(args)?;
                self.update_file(agent_id, input).await
            }
            "file.search" => {
                let input: SearchInput = parse(args)?;
                self.search(agent_id, input).await
            }
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }

    async fn list_libraries(&self, agent_id: &str) -> Result<Value, ToolError> {
        let readable = self.access.accessible_libraries(agent_id, false).await;
        let mut out = Vec::new();
        for library_id in readable {
            match self.libraries.find_by_id(library_id).await {
                Ok(Some(library)) => out.push(json!({
                    "id": library.id,
                    "name": library.name,
                    "description": library.description,
                    "mcp_write_enabled": library.mcp_write_enabled,
                })),
                Ok(None) => {}
                Err(e) => warn!(%library_id, error = %e, "library lookup failed"),
            }
        }
        Ok(json!({ "libraries": out }))
    }

    async fn browse(&self, agent_id: &str, input: BrowseInput) -> Result<Value, ToolError> {
        self.require_read(agent_id, input.library_id).await?;

        let directories = self
            .directories
            .list_children(input.library_id, input.directory_id)
            .await
            .map_err(internal)?;
        let files = self
            .files
            .list_in_directory(input.library_id, input.directory_id)
            .await
            .map_err(internal)?;

        Ok(json!({
            "directories": directories.iter().map(|d| json!({
                "id": d.id,
                "name": d.name,
                "path": d.full_path(),
            })).collect::<Vec<_>>(),
            "files": files.iter().map(file_view).collect::<Vec<_>>(),
        }))
    }

    async fn read_file(&self, agent_id: &str, input: ReadFileInput) -> Result<Value, ToolError> {
        let file = self.load_file(input.file_id).await?;
        self.require_read(agent_id, file.library_id).await?;

        if file.size_bytes > READ_SIZE_CAP {
            return Err(ToolError::InvalidArguments(format!(
                "file exceeds the {READ_SIZE_CAP} byte read cap"
            )));
        }
        if !self.extractor.can_extract(&file.content_type, &file.filename) {
            return Err(ToolError::InvalidArguments("file is not text-readable".into()));
        }

        let library = self.load_library(file.library_id).await?;
        let bytes = self
            .storage
            .download_file(&library.bucket_name, &file.storage_key)
            .await
            .map_err(internal)?;
        let content = String::from_utf8_lossy(&bytes).into_owned();

        Ok(json!({
            "file": file_view(&file),
            "content": content,
        }))
    }

    async fn create_file(&self, agent_id: &str, input: CreateFileInput) -> Result<Value, ToolError> {
        if !self.access.check_library_access(input.library_id, agent_id, true).await {
            return Err(ToolError::AccessDenied(input.library_id.to_string()));
        }
        validate_filename(&input.filename).map_err(ToolError::InvalidArguments)?;

        let library = self.load_library(input.library_id).await?;

        let dir_path = match input.directory_id {
            None => "/".to_string(),
            Some(directory_id) => self
                .directories
                .find_by_id(input.library_id, directory_id)
                .await
                .map_err(internal)?
                .ok_or_else(|| ToolError::InvalidArguments("directory not found".into()))?
                .full_path(),
        };

        // Agents never overwrite implicitly: collisions get a unique name.
        let mut filename = input.filename;
        if self
            .files
            .find_by_name(input.library_id, input.directory_id, &filename)
            .await
            .map_err(internal)?
            .is_some()
        {
            filename = unique_filename(&filename, Utc::now().timestamp());
        }

        let content_type = mime_guess::from_path(&filename)
            .first_raw()
            .unwrap_or("text/plain")
            .to_string();
        let data = Bytes::from(input.content.into_bytes());
        let storage_key = generate_storage_key(input.library_id, &dir_path, &filename, 1);
        let result = self
            .storage
            .upload_file(&library.bucket_name, &storage_key, data.clone(), &content_type, None)
            .await
            .map_err(internal)?;

        let now = Utc::now();
        let file = FileMetadata {
            id: Uuid::new_v4(),
            library_id: input.library_id,
            directory_id: input.directory_id,
            filename: filename.clone(),
            path: dir_path,
            size_bytes: result.size_bytes,
            checksum_sha256: calculate_checksum(&data),
            content_type,
            storage_key: storage_key.clone(),
            current_version: 1,
            created_by: Uuid::nil(),
            modified_by: Uuid::nil(),
            is_deleted: false,
            deleted_at: None,
            deleted_by: None,
            created_at: now,
            updated_at: now,
        };
        let version = FileVersion::new(
            file.id,
            1,
            file.size_bytes,
            file.checksum_sha256.clone(),
            storage_key,
            Uuid::nil(),
            Some(format!("created by agent {agent_id}")),
        );
        self.files.commit_new_file(&file, &version).await.map_err(internal)?;

        self.spawn_index(file.id);
        Ok(json!({ "file": file_view(&file) }))
    }

    async fn update_file(&self, agent_id: &str, input: UpdateFileInput) -> Result<Value, ToolError> {
        let file = self.load_file(input.file_id).await?;
        if !self.access.check_library_access(file.library_id, agent_id, true).await {
            return Err(ToolError::AccessDenied(file.library_id.to_string()));
        }

        let library = self.load_library(file.library_id).await?;
        let data = Bytes::from(input.content.into_bytes());
        let checksum = calculate_checksum(&data);
        let storage_key = generate_storage_key(
            file.library_id,
            &file.path,
            &file.filename,
            file.current_version + 1,
        );

        self.storage
            .upload_file(&library.bucket_name, &storage_key, data.clone(), &file.content_type, None)
            .await
            .map_err(internal)?;

        let (updated, version) = self
            .files
            .commit_overwrite(
                file.id,
                data.len() as i64,
                &checksum,
                &storage_key,
                Uuid::nil(),
                Some(format!("updated by agent {agent_id}")),
            )
            .await
            .map_err(internal)?;

        self.spawn_index(updated.id);
        Ok(json!({
            "file": file_view(&updated),
            "version": version.version_number,
        }))
    }

    async fn search(&self, agent_id: &str, input: SearchInput) -> Result<Value, ToolError> {
        self.require_read(agent_id, input.library_id).await?;
        let files = self
            .files
            .search_by_name(input.library_id, &input.query, SEARCH_LIMIT)
            .await
            .map_err(internal)?;
        Ok(json!({ "files": files.iter().map(file_view).collect::<Vec<_>>() }))
    }

    async fn require_read(&self, agent_id: &str, library_id: Uuid) -> Result<(), ToolError> {
        if !self.access.check_library_access(library_id, agent_id, false).await {
            return Err(ToolError::AccessDenied(library_id.to_string()));
        }
        Ok(())
    }

    async fn load_file(&self, file_id: Uuid) -> Result<FileMetadata, ToolError> {
        self.files
            .find_by_id(file_id)
            .await
            .map_err(internal)?
            .ok_or_else(|| ToolError::InvalidArguments("file not found".into()))
    }

    async fn load_library(&self, library_id: Uuid) -> Result<crate::domain::library::Library, ToolError> {
        self.libraries
            .find_by_id(library_id)
            .await
            .map_err(internal)?
            .ok_or_else(|| ToolError::AccessDenied(library_id.to_string()))
    }

    fn spawn_index(&self, file_id: Uuid) {
        let indexer = self.indexer.clone();
        tokio::spawn(async move {
            if let Err(e) = indexer.index_file(file_id).await {
                warn!(%file_id, error = %e, "agent file indexing failed");
            }
        });
    }
}

fn parse<T: serde::de::DeserializeOwned>(args: Value) -> Result<T, ToolError> {
    serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

fn internal(e: impl std::fmt::Display) -> ToolError {
    ToolError::Internal(e.to_string())
}

fn file_view(file: &FileMetadata) -> Value {
    json!({
        "id": file.id,
        "filename": file.filename,
        "path": file.full_path(),
        "size_bytes": file.size_bytes,
        "content_type": file.content_type,
        "version": file.current_version,
    })
}
