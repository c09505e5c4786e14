// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Process wiring: construct every adapter and service once, hand them to
//! the presentation layer through `AppState`.

use anyhow::{Context, Result};
use std::sync::Arc;

use alexandria_core::application::{
    AuditService, DirectoryService, FileService, IndexingService, LibraryService,
    LibraryToolService, NotificationService, ShareService, TrashService,
};
use alexandria_core::config::Settings;
use alexandria_core::infrastructure::repositories::{
    PostgresAuditRepository, PostgresDirectoryRepository, PostgresFileRepository,
    PostgresLibraryRepository, PostgresNotificationRepository, PostgresShareRepository,
};
use alexandria_core::infrastructure::identity_admin::{IdentityAdmin, KeycloakIdentityAdmin};
use alexandria_core::infrastructure::{
    Database, EntityCache, NoopEmailGateway, PostgresLibraryCatalog, RealtimeBus, S3ObjectStore,
};
use alexandria_core::infrastructure::jwks::KeycloakValidator;
use alexandria_core::infrastructure::object_store::ObjectStore;
use alexandria_core::presentation::AppState;

use alexandria_vector::application::{AccessControl, VectorToolService};
use alexandria_vector::infrastructure::{
    Chunker, ChunkerConfig, ContentExtractor, Embedder, MetadataExtractor, OllamaEmbeddingClient,
    QdrantVectorStore, VectorStore,
};

pub async fn build_state(settings: Settings) -> Result<Arc<AppState>> {
    // Adapters
    let database = Database::new(&settings.database_url, settings.db_max_connections)
        .await
        .context("failed to connect to the metadata store")?;
    let pool = database.get_pool().clone();

    let storage: Arc<dyn ObjectStore> = Arc::new(
        S3ObjectStore::new(
            &settings.s3_endpoint,
            &settings.s3_access_key,
            &settings.s3_secret_key,
            &settings.s3_region,
        )
        .await,
    );

    let vector_store: Arc<dyn VectorStore> = Arc::new(
        QdrantVectorStore::new(&settings.qdrant_url, settings.embedding_dim)
            .context("failed to create the vector store client")?,
    );

    let embedder: Arc<dyn Embedder> = Arc::new(OllamaEmbeddingClient::new(
        settings.ollama_url.clone(),
        settings.ollama_embedding_model.clone(),
        settings.embedding_timeout,
    ));

    let cache = EntityCache::new(settings.cache_ttl_seconds, settings.cache_prefix.clone());
    let bus = Arc::new(RealtimeBus::new());

    // Repositories
    let libraries_repo = Arc::new(PostgresLibraryRepository::new(pool.clone()));
    let directories_repo = Arc::new(PostgresDirectoryRepository::new(pool.clone()));
    let files_repo = Arc::new(PostgresFileRepository::new(pool.clone()));
    let shares_repo = Arc::new(PostgresShareRepository::new(pool.clone()));
    let audit_repo = Arc::new(PostgresAuditRepository::new(pool.clone()));
    let notifications_repo = Arc::new(PostgresNotificationRepository::new(pool));

    // Indexing pipeline
    let extractor = Arc::new(ContentExtractor::new(settings.gotenberg_url.clone()));
    let chunker = Arc::new(Chunker::new(ChunkerConfig {
        chunk_size_code: settings.chunk_size_code,
        chunk_size_docs: settings.chunk_size_docs,
        chunk_overlap: settings.chunk_overlap,
        max_chunks_per_file: settings.max_chunks_per_file,
    }));
    let metadata = Arc::new(MetadataExtractor::new());
    let indexer = Arc::new(IndexingService::new(
        files_repo.clone(),
        libraries_repo.clone(),
        storage.clone(),
        extractor.clone(),
        chunker,
        metadata,
        embedder.clone(),
        vector_store.clone(),
    ));

    // Services
    let audit = Arc::new(AuditService::new(audit_repo));
    let notifications = Arc::new(NotificationService::new(
        notifications_repo,
        bus.clone(),
        Arc::new(NoopEmailGateway),
    ));
    let libraries = Arc::new(LibraryService::new(
        libraries_repo.clone(),
        storage.clone(),
        cache.clone(),
        audit.clone(),
        settings.storage_bucket_prefix.clone(),
    ));
    let directories = Arc::new(DirectoryService::new(
        directories_repo.clone(),
        files_repo.clone(),
        libraries_repo.clone(),
        cache.clone(),
        bus.clone(),
        audit.clone(),
        indexer.clone(),
    ));
    let files = Arc::new(FileService::new(
        files_repo.clone(),
        directories_repo.clone(),
        libraries_repo.clone(),
        storage.clone(),
        cache.clone(),
        bus.clone(),
        audit.clone(),
        indexer.clone(),
        settings.storage_chunk_size,
        settings.storage_max_file_size,
        settings.storage_presigned_url_expiry,
    ));
    let trash = Arc::new(TrashService::new(
        files_repo.clone(),
        directories_repo.clone(),
        libraries_repo.clone(),
        storage.clone(),
        cache,
        audit.clone(),
        indexer.clone(),
        settings.trash_retention_days,
    ));
    let identity_admin: Option<Arc<dyn IdentityAdmin>> =
        settings.keycloak_client_secret.as_ref().map(|secret| {
            Arc::new(KeycloakIdentityAdmin::new(
                settings.keycloak_url.clone(),
                settings.keycloak_realm.clone(),
                settings.keycloak_client_id.clone(),
                secret.clone(),
            )) as Arc<dyn IdentityAdmin>
        });
    let shares = Arc::new(ShareService::new(
        shares_repo,
        files_repo.clone(),
        directories_repo.clone(),
        libraries_repo.clone(),
        audit.clone(),
        notifications.clone(),
        identity_admin,
        settings.base_url.clone(),
        settings.share_link_max_expiry_days,
        settings.share_link_default_expiry_days,
    ));

    // Agent tool surface
    let catalog = Arc::new(PostgresLibraryCatalog::new(libraries_repo.clone()));
    let access = Arc::new(AccessControl::new(
        catalog,
        settings.mcp_default_write_enabled,
        settings.mcp_rate_limit_requests,
        settings.mcp_rate_limit_window,
    ));
    let vector_tools = Arc::new(VectorToolService::new(
        vector_store,
        embedder,
        access.clone(),
        settings.low_confidence_threshold,
    ));
    let library_tools = Arc::new(LibraryToolService::new(
        access.clone(),
        libraries_repo,
        directories_repo,
        files_repo,
        storage,
        extractor,
        indexer.clone(),
    ));

    // Identity
    let validator = Arc::new(KeycloakValidator::new(
        settings.keycloak_jwks_url(),
        settings.keycloak_issuer(),
        settings.keycloak_client_id.clone(),
        settings.keycloak_audience.clone(),
        settings.keycloak_verify_token,
    ));

    Ok(Arc::new(AppState {
        settings,
        libraries,
        directories,
        files,
        trash,
        shares,
        audit,
        notifications,
        indexer,
        bus,
        validator,
        access,
        vector_tools,
        library_tools,
    }))
}
