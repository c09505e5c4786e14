// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Namespace-tree integration tests against a live PostgreSQL.
//!
//! Run with a schema-loaded database:
//! `DATABASE_URL=postgres://... cargo test -- --ignored`

use chrono::Utc;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use alexandria_core::domain::directory::Directory;
use alexandria_core::domain::file::{FileMetadata, FileVersion};
use alexandria_core::domain::library::Library;
use alexandria_core::domain::repository::{DirectoryRepository, FileRepository, LibraryRepository};
use alexandria_core::infrastructure::repositories::{
    PostgresDirectoryRepository, PostgresFileRepository, PostgresLibraryRepository,
};

async fn pool() -> sqlx::PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for integration tests");
    PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
        .expect("failed to connect")
}

async fn seed_library(libraries: &PostgresLibraryRepository) -> Library {
    let library = Library::new(
        format!("it-{}", Uuid::new_v4()),
        None,
        Uuid::new_v4(),
        "alexandria-lib-",
    );
    libraries.insert(&library).await.unwrap();
    library
}

fn directory(library: &Library, parent: Option<&Directory>, name: &str) -> Directory {
    let parent_path = parent.map(|p| p.full_path()).unwrap_or_else(|| "/".to_string());
    Directory::new(
        library.id,
        parent.map(|p| p.id),
        name.to_string(),
        parent_path,
        library.owner_id,
    )
}

fn file_in(library: &Library, dir: &Directory, filename: &str) -> (FileMetadata, FileVersion) {
    let now = Utc::now();
    let file = FileMetadata {
        id: Uuid::new_v4(),
        library_id: library.id,
        directory_id: Some(dir.id),
        filename: filename.to_string(),
        path: dir.full_path(),
        size_bytes: 3,
        checksum_sha256: "abc".into(),
        content_type: "text/plain".into(),
        storage_key: format!("{}/{}/{}_v1", library.id, dir.full_path().trim_matches('/'), filename),
        current_version: 1,
        created_by: library.owner_id,
        modified_by: library.owner_id,
        is_deleted: false,
        deleted_at: None,
        deleted_by: None,
        created_at: now,
        updated_at: now,
    };
    let version = FileVersion::new(
        file.id,
        1,
        3,
        "abc".into(),
        file.storage_key.clone(),
        library.owner_id,
        None,
    );
    (file, version)
}

#[tokio::test]
#[ignore] // Requires a running PostgreSQL with the schema loaded
async fn rename_cascades_paths_to_descendants() {
    let pool = pool().await;
    let libraries = PostgresLibraryRepository::new(pool.clone());
    let directories = PostgresDirectoryRepository::new(pool.clone());
    let files = PostgresFileRepository::new(pool);

    let library = seed_library(&libraries).await;
    let a = directory(&library, None, "a");
    directories.insert(&a).await.unwrap();
    let b = directory(&library, Some(&a), "b");
    directories.insert(&b).await.unwrap();
    let (x, v) = file_in(&library, &b, "x.md");
    files.commit_new_file(&x, &v).await.unwrap();

    // /a → /z: descendant paths rewrite everywhere.
    let renamed = directories.rename(a.id, "z", library.owner_id).await.unwrap();
    assert_eq!(renamed.full_path(), "/z");

    let b_after = directories.find_by_id(library.id, b.id).await.unwrap().unwrap();
    assert_eq!(b_after.path, "/z");
    assert_eq!(b_after.full_path(), "/z/b");

    let x_after = files.find_by_id(x.id).await.unwrap().unwrap();
    assert_eq!(x_after.path, "/z/b");

    // Rename back: byte-identical paths.
    directories.rename(a.id, "a", library.owner_id).await.unwrap();
    let b_back = directories.find_by_id(library.id, b.id).await.unwrap().unwrap();
    assert_eq!(b_back.full_path(), "/a/b");
    let x_back = files.find_by_id(x.id).await.unwrap().unwrap();
    assert_eq!(x_back.path, "/a/b");
}

#[tokio::test]
#[ignore] // Requires a running PostgreSQL with the schema loaded
async fn soft_delete_cascade_and_restore_round_trip() {
    let pool = pool().await;
    let libraries = PostgresLibraryRepository::new(pool.clone());
    let directories = PostgresDirectoryRepository::new(pool.clone());
    let files = PostgresFileRepository::new(pool);

    let library = seed_library(&libraries).await;
    let parent = directory(&library, None, "docs");
    directories.insert(&parent).await.unwrap();
    let child = directory(&library, Some(&parent), "archive");
    directories.insert(&child).await.unwrap();
    let (f, v) = file_in(&library, &child, "old.txt");
    files.commit_new_file(&f, &v).await.unwrap();

    let (dirs_marked, files_marked) = directories
        .soft_delete_cascade(parent.id, library.owner_id, Utc::now())
        .await
        .unwrap();
    assert_eq!(dirs_marked, 2);
    assert_eq!(files_marked, 1);
    assert!(directories.find_by_id(library.id, child.id).await.unwrap().is_none());
    assert!(files.find_by_id(f.id).await.unwrap().is_none());

    let restored = directories
        .restore_cascade(parent.id, None, "/", library.owner_id)
        .await
        .unwrap();
    assert_eq!(restored.full_path(), "/docs");

    let child_back = directories.find_by_id(library.id, child.id).await.unwrap().unwrap();
    assert_eq!(child_back.full_path(), "/docs/archive");
    let file_back = files.find_by_id(f.id).await.unwrap().unwrap();
    assert_eq!(file_back.path, "/docs/archive");
}

#[tokio::test]
#[ignore] // Requires a running PostgreSQL with the schema loaded
async fn sibling_uniqueness_is_enforced_by_the_database() {
    let pool = pool().await;
    let libraries = PostgresLibraryRepository::new(pool.clone());
    let directories = PostgresDirectoryRepository::new(pool);

    let library = seed_library(&libraries).await;
    let first = directory(&library, None, "dup");
    directories.insert(&first).await.unwrap();

    let second = directory(&library, None, "dup");
    let result = directories.insert(&second).await;
    assert!(matches!(
        result,
        Err(alexandria_core::domain::repository::RepositoryError::Conflict(_))
    ));
}

#[tokio::test]
#[ignore] // Requires a running PostgreSQL with the schema loaded
async fn concurrent_overwrites_keep_versions_linear() {
    let pool = pool().await;
    let libraries = PostgresLibraryRepository::new(pool.clone());
    let directories = PostgresDirectoryRepository::new(pool.clone());
    let files = std::sync::Arc::new(PostgresFileRepository::new(pool));

    let library = seed_library(&libraries).await;
    let dir = directory(&library, None, "v");
    directories.insert(&dir).await.unwrap();
    let (f, v) = file_in(&library, &dir, "hot.txt");
    files.commit_new_file(&f, &v).await.unwrap();

    let mut handles = Vec::new();
    for i in 0..8 {
        let files = files.clone();
        let file_id = f.id;
        let actor = library.owner_id;
        handles.push(tokio::spawn(async move {
            files
                .commit_overwrite(file_id, 10 + i, "sum", &format!("key_v{i}"), actor, None)
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let versions = files.versions(f.id).await.unwrap();
    assert_eq!(versions.len(), 9);
    // Strictly monotone, no gaps: 1..=9.
    let numbers: Vec<i32> = versions.iter().map(|v| v.version_number).collect();
    assert_eq!(numbers, (1..=9).rev().collect::<Vec<_>>());
}
