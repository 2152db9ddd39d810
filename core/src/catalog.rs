//! Read-side queries over seeded data.

use anyhow::{Context, Result, bail};
use serde::Serialize;

use crate::backend::DocumentStore;
use crate::error::StoreResult;
use crate::importer::Collections;
use crate::models::{Category, Document, Filter, MenuDocument};
use crate::reconcile::find_by;

#[derive(Debug, Clone, Serialize)]
pub struct Stored<T> {
    pub id: String,
    #[serde(flatten)]
    pub record: T,
}

/// Every document matching `filters`, following offsets across pages until
/// the backend's total is reached.
pub async fn list_all(
    store: &dyn DocumentStore,
    collection: &str,
    filters: &[Filter],
) -> StoreResult<Vec<Document>> {
    let mut documents: Vec<Document> = Vec::new();
    loop {
        let mut page_filters = filters.to_vec();
        if !documents.is_empty() {
            page_filters.push(Filter::Offset(documents.len() as u64));
        }
        let page = store.list_documents(collection, &page_filters).await?;
        let received = page.documents.len();
        documents.extend(page.documents);
        if received == 0 || documents.len() as u64 >= page.total {
            return Ok(documents);
        }
    }
}

pub async fn list_categories(
    store: &dyn DocumentStore,
    collections: &Collections,
) -> Result<Vec<Stored<Category>>> {
    let documents = list_all(store, &collections.categories, &[])
        .await
        .context("Failed to list categories")?;
    documents
        .iter()
        .map(|d| -> Result<Stored<Category>> {
            Ok(Stored {
                id: d.id.clone(),
                record: d.decode("category")?,
            })
        })
        .collect()
}

/// Menu documents, optionally restricted to a category (by name) and a name search.
pub async fn list_menu(
    store: &dyn DocumentStore,
    collections: &Collections,
    category: Option<&str>,
    search: Option<&str>,
) -> Result<Vec<Stored<MenuDocument>>> {
    let mut filters = Vec::new();
    if let Some(name) = category {
        let Some(cat) = find_by(store, &collections.categories, "name", name)
            .await
            .context("Failed to look up category")?
        else {
            bail!("No category named '{name}'");
        };
        filters.push(Filter::equal("categories", cat.id));
    }
    if let Some(q) = search.filter(|q| !q.trim().is_empty()) {
        filters.push(Filter::search("name", q));
    }

    let documents = list_all(store, &collections.menu, &filters)
        .await
        .context("Failed to list menu")?;
    documents
        .iter()
        .map(|d| -> Result<Stored<MenuDocument>> {
            Ok(Stored {
                id: d.id.clone(),
                record: d.decode("menu")?,
            })
        })
        .collect()
}
