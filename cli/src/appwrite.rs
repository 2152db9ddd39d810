use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use menuseed_core::backend::{DocumentStore, ObjectStore};
use menuseed_core::error::{StoreError, StoreResult};
use menuseed_core::models::{Document, DocumentList, FileList, FileUpload, Filter, StoredFile};

use crate::config::RemoteSettings;

/// Upper bound on rows per list request.
const LIST_LIMIT: u32 = 100;

/// Appwrite REST client for the database and storage APIs, authenticated
/// with a server API key.
pub struct AppwriteClient {
    client: reqwest::Client,
    endpoint: String,
    project_id: String,
    database_id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl AppwriteClient {
    pub fn new(settings: &RemoteSettings) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "X-Appwrite-Project",
            HeaderValue::from_str(&settings.project_id).context("Invalid project id")?,
        );
        let mut key = HeaderValue::from_str(&settings.api_key).context("Invalid API key")?;
        key.set_sensitive(true);
        headers.insert("X-Appwrite-Key", key);

        let client = reqwest::Client::builder()
            .user_agent(format!("menuseed/{}", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(30))
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            project_id: settings.project_id.clone(),
            database_id: settings.database_id.clone(),
        })
    }

    fn documents_url(&self, collection: &str) -> String {
        format!(
            "{}/databases/{}/collections/{collection}/documents",
            self.endpoint, self.database_id
        )
    }

    fn files_url(&self, bucket: &str) -> String {
        format!("{}/storage/buckets/{bucket}/files", self.endpoint)
    }
}

/// One entry of the `queries[]` parameter.
#[derive(Serialize)]
struct Query<'a> {
    method: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    attribute: Option<&'a str>,
    values: [Value; 1],
}

impl Query<'_> {
    fn encode(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Encode a filter as an Appwrite JSON query string.
pub fn encode_filter(filter: &Filter) -> String {
    let query = match filter {
        Filter::Equal { attribute, value } => Query {
            method: "equal",
            attribute: Some(attribute.as_str()),
            values: [value.clone()],
        },
        Filter::Search { attribute, value } => Query {
            method: "search",
            attribute: Some(attribute.as_str()),
            values: [Value::from(value.as_str())],
        },
        Filter::Offset(n) => Query {
            method: "offset",
            attribute: None,
            values: [Value::from(*n)],
        },
    };
    query.encode()
}

fn limit_query() -> String {
    Query {
        method: "limit",
        attribute: None,
        values: [Value::from(LIST_LIMIT)],
    }
    .encode()
}

fn transport(e: &reqwest::Error) -> StoreError {
    StoreError::Transport(e.to_string())
}

/// Turn a response into its body, mapping non-2xx statuses to `Rejected`.
async fn read_body(resp: reqwest::Response) -> StoreResult<Vec<u8>> {
    let status = resp.status();
    let body = resp.bytes().await.map_err(|e| transport(&e))?;
    if status.is_success() {
        return Ok(body.to_vec());
    }
    let message = serde_json::from_slice::<ErrorBody>(&body)
        .map(|b| b.message)
        .unwrap_or_else(|_| String::from_utf8_lossy(&body).into_owned());
    Err(StoreError::Rejected {
        status: status.as_u16(),
        message,
    })
}

fn decode<T: DeserializeOwned>(entity: &'static str, body: &[u8]) -> StoreResult<T> {
    serde_json::from_slice(body).map_err(|e| StoreError::malformed(entity, e))
}

#[async_trait]
impl DocumentStore for AppwriteClient {
    async fn list_documents(
        &self,
        collection: &str,
        filters: &[Filter],
    ) -> StoreResult<DocumentList> {
        let mut queries: Vec<(&str, String)> = filters
            .iter()
            .map(|f| ("queries[]", encode_filter(f)))
            .collect();
        queries.push(("queries[]", limit_query()));

        let resp = self
            .client
            .get(self.documents_url(collection))
            .query(&queries)
            .send()
            .await
            .map_err(|e| transport(&e))?;
        decode("document list", &read_body(resp).await?)
    }

    async fn create_document(
        &self,
        collection: &str,
        id: &str,
        fields: &Map<String, Value>,
    ) -> StoreResult<Document> {
        let resp = self
            .client
            .post(self.documents_url(collection))
            .json(&json!({ "documentId": id, "data": fields }))
            .send()
            .await
            .map_err(|e| transport(&e))?;
        decode("document", &read_body(resp).await?)
    }

    async fn delete_document(&self, collection: &str, id: &str) -> StoreResult<()> {
        let resp = self
            .client
            .delete(format!("{}/{id}", self.documents_url(collection)))
            .send()
            .await
            .map_err(|e| transport(&e))?;
        read_body(resp).await?;
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for AppwriteClient {
    async fn list_files(&self, bucket: &str) -> StoreResult<FileList> {
        let resp = self
            .client
            .get(self.files_url(bucket))
            .query(&[("queries[]", limit_query())])
            .send()
            .await
            .map_err(|e| transport(&e))?;
        decode("file list", &read_body(resp).await?)
    }

    async fn create_file(
        &self,
        bucket: &str,
        id: &str,
        upload: &FileUpload,
    ) -> StoreResult<StoredFile> {
        let data = tokio::fs::read(&upload.path).await?;
        let part = Part::bytes(data)
            .file_name(upload.name.clone())
            .mime_str(&upload.mime_type)
            .map_err(|e| StoreError::malformed("file", e))?;
        let form = Form::new().text("fileId", id.to_string()).part("file", part);

        let resp = self
            .client
            .post(self.files_url(bucket))
            .multipart(form)
            .send()
            .await
            .map_err(|e| transport(&e))?;
        decode("file", &read_body(resp).await?)
    }

    async fn delete_file(&self, bucket: &str, id: &str) -> StoreResult<()> {
        let resp = self
            .client
            .delete(format!("{}/{id}", self.files_url(bucket)))
            .send()
            .await
            .map_err(|e| transport(&e))?;
        read_body(resp).await?;
        Ok(())
    }

    fn file_view_url(&self, bucket: &str, id: &str) -> String {
        format!(
            "{}/{id}/view?project={}",
            self.files_url(bucket),
            self.project_id
        )
    }
}
