//! In-memory fakes of the backend traits, with injectable failures.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::backend::{DocumentStore, Fetcher, ObjectStore};
use crate::error::{StoreError, StoreResult};
use crate::models::{Document, DocumentList, FileList, FileUpload, Filter, StoredFile};

#[derive(Default)]
pub struct MemoryDocuments {
    collections: Mutex<HashMap<String, Vec<Document>>>,
    creates: AtomicUsize,
    reject_creates_in: Mutex<HashSet<String>>,
}

impl MemoryDocuments {
    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn count(&self, collection: &str) -> usize {
        self.collections
            .lock()
            .unwrap()
            .get(collection)
            .map_or(0, Vec::len)
    }

    pub fn all(&self, collection: &str) -> Vec<Document> {
        self.collections
            .lock()
            .unwrap()
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    pub fn reject_creates_in(&self, collection: &str) {
        self.reject_creates_in
            .lock()
            .unwrap()
            .insert(collection.to_string());
    }
}

#[async_trait]
impl DocumentStore for MemoryDocuments {
    async fn list_documents(
        &self,
        collection: &str,
        filters: &[Filter],
    ) -> StoreResult<DocumentList> {
        let matched: Vec<Document> = self
            .all(collection)
            .into_iter()
            .filter(|d| filters.iter().all(|f| f.matches(&d.fields)))
            .collect();
        Ok(DocumentList::page(matched, filters))
    }

    async fn create_document(
        &self,
        collection: &str,
        id: &str,
        fields: &Map<String, Value>,
    ) -> StoreResult<Document> {
        if self.reject_creates_in.lock().unwrap().contains(collection) {
            return Err(StoreError::Rejected {
                status: 500,
                message: format!("create in {collection} refused"),
            });
        }
        tokio::task::yield_now().await;
        self.creates.fetch_add(1, Ordering::SeqCst);
        let doc = Document {
            id: id.to_string(),
            fields: fields.clone(),
        };
        self.collections
            .lock()
            .unwrap()
            .entry(collection.to_string())
            .or_default()
            .push(doc.clone());
        Ok(doc)
    }

    async fn delete_document(&self, collection: &str, id: &str) -> StoreResult<()> {
        if let Some(docs) = self.collections.lock().unwrap().get_mut(collection) {
            docs.retain(|d| d.id != id);
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryObjects {
    buckets: Mutex<HashMap<String, Vec<StoredFile>>>,
    uploads: AtomicUsize,
}

impl MemoryObjects {
    pub fn uploads(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    pub fn count(&self, bucket: &str) -> usize {
        self.buckets.lock().unwrap().get(bucket).map_or(0, Vec::len)
    }
}

#[async_trait]
impl ObjectStore for MemoryObjects {
    async fn list_files(&self, bucket: &str) -> StoreResult<FileList> {
        let files = self
            .buckets
            .lock()
            .unwrap()
            .get(bucket)
            .cloned()
            .unwrap_or_default();
        Ok(FileList {
            total: files.len() as u64,
            files,
        })
    }

    async fn create_file(
        &self,
        bucket: &str,
        id: &str,
        upload: &FileUpload,
    ) -> StoreResult<StoredFile> {
        let size = tokio::fs::metadata(&upload.path).await?.len();
        self.uploads.fetch_add(1, Ordering::SeqCst);
        let file = StoredFile {
            id: id.to_string(),
            name: upload.name.clone(),
            mime_type: upload.mime_type.clone(),
            size,
        };
        self.buckets
            .lock()
            .unwrap()
            .entry(bucket.to_string())
            .or_default()
            .push(file.clone());
        Ok(file)
    }

    async fn delete_file(&self, bucket: &str, id: &str) -> StoreResult<()> {
        if let Some(files) = self.buckets.lock().unwrap().get_mut(bucket) {
            files.retain(|f| f.id != id);
        }
        Ok(())
    }

    fn file_view_url(&self, bucket: &str, id: &str) -> String {
        format!("mem://{bucket}/{id}")
    }
}

/// Writes a few bytes per download; URLs marked as broken always fail.
#[derive(Default)]
pub struct FakeFetcher {
    broken: Mutex<HashSet<String>>,
    attempts: Mutex<HashMap<String, usize>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeFetcher {
    pub fn break_url(&self, url: &str) {
        self.broken.lock().unwrap().insert(url.to_string());
    }

    pub fn heal_all(&self) {
        self.broken.lock().unwrap().clear();
    }

    pub fn attempts(&self, url: &str) -> usize {
        self.attempts.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn download(&self, url: &str, dest: &Path) -> StoreResult<PathBuf> {
        *self
            .attempts
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default() += 1;

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.broken.lock().unwrap().contains(url) {
            return Err(StoreError::Transport(format!("connection reset: {url}")));
        }
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(dest, b"\x89PNG fake").await?;
        Ok(dest.to_path_buf())
    }
}

/// Caps every listing at `page` entries, the way a paginating backend does,
/// and counts the listings made.
pub struct AtMost<S> {
    inner: S,
    page: usize,
    lists: AtomicUsize,
}

impl<S> AtMost<S> {
    pub fn new(inner: S, page: usize) -> Self {
        Self {
            inner,
            page,
            lists: AtomicUsize::new(0),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn lists(&self) -> usize {
        self.lists.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<S: DocumentStore> DocumentStore for AtMost<S> {
    async fn list_documents(
        &self,
        collection: &str,
        filters: &[Filter],
    ) -> StoreResult<DocumentList> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        let mut list = self.inner.list_documents(collection, filters).await?;
        list.documents.truncate(self.page);
        Ok(list)
    }

    async fn create_document(
        &self,
        collection: &str,
        id: &str,
        fields: &Map<String, Value>,
    ) -> StoreResult<Document> {
        self.inner.create_document(collection, id, fields).await
    }

    async fn delete_document(&self, collection: &str, id: &str) -> StoreResult<()> {
        self.inner.delete_document(collection, id).await
    }
}

#[async_trait]
impl<S: ObjectStore> ObjectStore for AtMost<S> {
    async fn list_files(&self, bucket: &str) -> StoreResult<FileList> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        let mut list = self.inner.list_files(bucket).await?;
        list.files.truncate(self.page);
        Ok(list)
    }

    async fn create_file(
        &self,
        bucket: &str,
        id: &str,
        upload: &FileUpload,
    ) -> StoreResult<StoredFile> {
        self.inner.create_file(bucket, id, upload).await
    }

    async fn delete_file(&self, bucket: &str, id: &str) -> StoreResult<()> {
        self.inner.delete_file(bucket, id).await
    }

    fn file_view_url(&self, bucket: &str, id: &str) -> String {
        self.inner.file_view_url(bucket, id)
    }
}
