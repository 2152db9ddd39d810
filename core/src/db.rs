use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Local;
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::{Map, Value};

use crate::backend::{DocumentStore, ObjectStore};
use crate::error::{StoreError, StoreResult};
use crate::models::{Document, DocumentList, FileList, FileUpload, Filter, StoredFile};

/// Document and object store kept in a single SQLite file, for rehearsing a
/// seed run without a live backend.
pub struct LocalBackend {
    conn: Mutex<Connection>,
}

impl LocalBackend {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        use anyhow::Context;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let db = LocalBackend {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = LocalBackend {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn migrate(&self) -> anyhow::Result<()> {
        let conn = self.conn();
        let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS documents (
                    collection TEXT NOT NULL,
                    id TEXT NOT NULL,
                    fields TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    PRIMARY KEY (collection, id)
                );

                CREATE TABLE IF NOT EXISTS files (
                    bucket TEXT NOT NULL,
                    id TEXT NOT NULL,
                    name TEXT NOT NULL,
                    mime_type TEXT NOT NULL,
                    size INTEGER NOT NULL,
                    data BLOB NOT NULL,
                    created_at TEXT NOT NULL,
                    PRIMARY KEY (bucket, id)
                );

                CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(collection);

                PRAGMA user_version = 1;",
            )?;
        }

        Ok(())
    }

    /// Raw bytes of a stored file.
    pub fn read_file(&self, bucket: &str, id: &str) -> StoreResult<Option<Vec<u8>>> {
        let data = self
            .conn()
            .query_row(
                "SELECT data FROM files WHERE bucket = ?1 AND id = ?2",
                params![bucket, id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(data)
    }
}

fn conflict(what: &str, id: &str) -> StoreError {
    StoreError::Rejected {
        status: 409,
        message: format!("{what} with id '{id}' already exists"),
    }
}

fn not_found(what: &str, id: &str) -> StoreError {
    StoreError::Rejected {
        status: 404,
        message: format!("{what} with id '{id}' could not be found"),
    }
}

#[async_trait]
impl DocumentStore for LocalBackend {
    async fn list_documents(
        &self,
        collection: &str,
        filters: &[Filter],
    ) -> StoreResult<DocumentList> {
        let rows: Vec<(String, String)> = {
            let conn = self.conn();
            let mut stmt = conn.prepare(
                "SELECT id, fields FROM documents WHERE collection = ?1 ORDER BY created_at, rowid",
            )?;
            stmt.query_map(params![collection], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<Result<Vec<_>, _>>()?
        };

        let mut matched = Vec::new();
        for (id, raw) in rows {
            let fields: Map<String, Value> = serde_json::from_str(&raw)
                .map_err(|e| StoreError::malformed("document", format!("{collection}/{id}: {e}")))?;
            if filters.iter().all(|f| f.matches(&fields)) {
                matched.push(Document { id, fields });
            }
        }

        Ok(DocumentList::page(matched, filters))
    }

    async fn create_document(
        &self,
        collection: &str,
        id: &str,
        fields: &Map<String, Value>,
    ) -> StoreResult<Document> {
        let raw = serde_json::to_string(fields).map_err(|e| StoreError::malformed("document", e))?;
        let now = Local::now().to_rfc3339();
        let inserted = self.conn().execute(
            "INSERT OR IGNORE INTO documents (collection, id, fields, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![collection, id, raw, now],
        )?;
        if inserted == 0 {
            return Err(conflict("Document", id));
        }
        Ok(Document {
            id: id.to_string(),
            fields: fields.clone(),
        })
    }

    async fn delete_document(&self, collection: &str, id: &str) -> StoreResult<()> {
        let deleted = self.conn().execute(
            "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
            params![collection, id],
        )?;
        if deleted == 0 {
            return Err(not_found("Document", id));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for LocalBackend {
    async fn list_files(&self, bucket: &str) -> StoreResult<FileList> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, name, mime_type, size FROM files WHERE bucket = ?1 ORDER BY created_at, rowid",
        )?;
        let files = stmt
            .query_map(params![bucket], |row| {
                Ok(StoredFile {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    mime_type: row.get(2)?,
                    size: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
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
        let data = tokio::fs::read(&upload.path).await?;
        let size = data.len() as u64;
        let now = Local::now().to_rfc3339();
        let inserted = self.conn().execute(
            "INSERT OR IGNORE INTO files (bucket, id, name, mime_type, size, data, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![bucket, id, upload.name, upload.mime_type, size, data, now],
        )?;
        if inserted == 0 {
            return Err(conflict("File", id));
        }
        Ok(StoredFile {
            id: id.to_string(),
            name: upload.name.clone(),
            mime_type: upload.mime_type.clone(),
            size,
        })
    }

    async fn delete_file(&self, bucket: &str, id: &str) -> StoreResult<()> {
        let deleted = self.conn().execute(
            "DELETE FROM files WHERE bucket = ?1 AND id = ?2",
            params![bucket, id],
        )?;
        if deleted == 0 {
            return Err(not_found("File", id));
        }
        Ok(())
    }

    fn file_view_url(&self, bucket: &str, id: &str) -> String {
        format!("local://buckets/{bucket}/files/{id}/view")
    }
}
