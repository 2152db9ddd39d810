use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::backend::{DocumentStore, ObjectStore};
use crate::failures::FailureLog;
use crate::importer::Collections;

/// Counts of what a reset removed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResetSummary {
    pub documents_deleted: usize,
    pub files_deleted: usize,
}

/// Delete every document in `collection`, page by page until it lists empty.
pub async fn clear_collection(store: &dyn DocumentStore, collection: &str) -> Result<usize> {
    let mut deleted = 0;
    loop {
        let page = store
            .list_documents(collection, &[])
            .await
            .with_context(|| format!("Failed to list {collection}"))?;
        if page.documents.is_empty() {
            break;
        }
        for doc in page.documents {
            store
                .delete_document(collection, &doc.id)
                .await
                .with_context(|| format!("Failed to delete {collection}/{}", doc.id))?;
            deleted += 1;
        }
    }
    info!(collection, deleted, "collection cleared");
    Ok(deleted)
}

/// Delete every file in `bucket`.
pub async fn clear_bucket(objects: &dyn ObjectStore, bucket: &str) -> Result<usize> {
    let mut deleted = 0;
    loop {
        let page = objects
            .list_files(bucket)
            .await
            .with_context(|| format!("Failed to list files in bucket {bucket}"))?;
        if page.files.is_empty() {
            break;
        }
        for file in page.files {
            objects
                .delete_file(bucket, &file.id)
                .await
                .with_context(|| format!("Failed to delete file {}", file.id))?;
            deleted += 1;
        }
    }
    info!(bucket, deleted, "bucket cleared");
    Ok(deleted)
}

/// Wipe everything a seed run creates, including the local failure record.
pub async fn reset_all(
    store: &dyn DocumentStore,
    objects: &dyn ObjectStore,
    collections: &Collections,
    bucket: &str,
    failures: &FailureLog,
) -> Result<ResetSummary> {
    let mut summary = ResetSummary::default();
    for collection in collections.all() {
        summary.documents_deleted += clear_collection(store, collection).await?;
    }
    summary.files_deleted = clear_bucket(objects, bucket).await?;
    failures.clear();
    Ok(summary)
}
