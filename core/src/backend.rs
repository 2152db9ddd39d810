//! Capability interfaces the importer talks to.
//!
//! The CLI implements these over the Appwrite REST API; [`crate::db::LocalBackend`]
//! implements the stores over SQLite for offline rehearsal runs.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::StoreResult;
use crate::models::{Document, DocumentList, FileList, FileUpload, Filter, StoredFile};

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn list_documents(&self, collection: &str, filters: &[Filter])
    -> StoreResult<DocumentList>;

    async fn create_document(
        &self,
        collection: &str,
        id: &str,
        fields: &Map<String, Value>,
    ) -> StoreResult<Document>;

    async fn delete_document(&self, collection: &str, id: &str) -> StoreResult<()>;
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn list_files(&self, bucket: &str) -> StoreResult<FileList>;

    async fn create_file(&self, bucket: &str, id: &str, upload: &FileUpload)
    -> StoreResult<StoredFile>;

    async fn delete_file(&self, bucket: &str, id: &str) -> StoreResult<()>;

    /// Direct view URL for a stored file. Pure string construction, no request.
    fn file_view_url(&self, bucket: &str, id: &str) -> String;
}

/// Downloads remote content to local ephemeral storage.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn download(&self, url: &str, dest: &Path) -> StoreResult<PathBuf>;
}

/// The set of services one import run is wired to.
#[derive(Clone, Copy)]
pub struct Backend<'a> {
    pub documents: &'a dyn DocumentStore,
    pub objects: &'a dyn ObjectStore,
    pub fetcher: &'a dyn Fetcher,
}
