use std::path::Path;

use tracing::{debug, warn};

use crate::backend::{Fetcher, ObjectStore};
use crate::error::{StoreError, StoreResult};
use crate::models::{FileUpload, IMAGE_MIME_TYPE, new_id};

/// Moves a remote image into the object store and hands back its view URL.
pub struct ImageTransfer<'a> {
    pub fetcher: &'a dyn Fetcher,
    pub objects: &'a dyn ObjectStore,
    pub bucket: &'a str,
    pub scratch_dir: &'a Path,
    pub max_retries: u32,
}

impl ImageTransfer<'_> {
    /// Upload the image at `source_url`, retrying immediately up to
    /// `max_retries` extra times. `None` means the transfer gave up.
    pub async fn upload(&self, source_url: &str) -> Option<String> {
        for attempt in 0..=self.max_retries {
            match self.try_upload(source_url).await {
                Ok(url) => {
                    debug!(source = source_url, view = %url, "image uploaded");
                    return Some(url);
                }
                Err(e) => {
                    warn!(source = source_url, attempt = attempt + 1, error = %e, "image transfer failed");
                }
            }
        }
        None
    }

    async fn try_upload(&self, source_url: &str) -> StoreResult<String> {
        let name = local_file_name(source_url);
        let id = new_id();
        let dest = self.scratch_dir.join(format!("{id}-{name}"));

        let result = async {
            let path = self.fetcher.download(source_url, &dest).await?;
            let upload = FileUpload {
                name,
                mime_type: IMAGE_MIME_TYPE.to_string(),
                path,
            };
            let file = self.objects.create_file(self.bucket, &id, &upload).await?;
            Ok::<_, StoreError>(self.objects.file_view_url(self.bucket, &file.id))
        }
        .await;

        let _ = tokio::fs::remove_file(&dest).await;
        result
    }
}

/// File name for a downloaded image: the URL's last path segment, or a
/// timestamped fallback when the URL ends in a slash.
#[must_use]
pub fn local_file_name(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    match path.rsplit('/').next() {
        Some(segment) if !segment.is_empty() => segment.to_string(),
        _ => format!("file-{}.png", chrono::Utc::now().timestamp_millis()),
    }
}
