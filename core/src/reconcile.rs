use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::backend::DocumentStore;
use crate::error::{StoreError, StoreResult};
use crate::models::{Document, Filter, Named, new_id, to_fields};

/// Run-scoped mapping from a record's natural name to its remote document id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdMap(HashMap<String, String>);

impl IdMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, id: impl Into<String>) {
        self.0.insert(name.into(), id.into());
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// First document in `collection` whose `field` equals `value`.
pub async fn find_by(
    store: &dyn DocumentStore,
    collection: &str,
    field: &str,
    value: &str,
) -> StoreResult<Option<Document>> {
    let list = store
        .list_documents(collection, &[Filter::equal(field, value)])
        .await?;
    Ok(list.documents.into_iter().next())
}

/// Create-if-absent keyed by `identity_field`. Returns the document id.
pub async fn reconcile<T: Serialize>(
    store: &dyn DocumentStore,
    collection: &str,
    identity_field: &str,
    record: &T,
) -> StoreResult<String> {
    let fields = to_fields("reference", record)?;
    let key = fields
        .get(identity_field)
        .and_then(Value::as_str)
        .ok_or_else(|| {
            StoreError::malformed(
                "reference",
                format!("missing string identity field '{identity_field}'"),
            )
        })?;

    if let Some(existing) = find_by(store, collection, identity_field, key).await? {
        debug!(collection, key, id = %existing.id, "already present");
        return Ok(existing.id);
    }

    let created = store.create_document(collection, &new_id(), &fields).await?;
    debug!(collection, key, id = %created.id, "created");
    Ok(created.id)
}

/// Reconcile every record in order, one at a time, by `name`.
pub async fn reconcile_all<T: Serialize + Named>(
    store: &dyn DocumentStore,
    collection: &str,
    records: &[T],
) -> Result<IdMap> {
    let mut map = IdMap::new();
    for record in records {
        let id = reconcile(store, collection, "name", record)
            .await
            .with_context(|| format!("Failed to reconcile '{}' in {collection}", record.name()))?;
        map.insert(record.name(), id);
    }
    info!(collection, count = map.len(), "reference data reconciled");
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Customization, CustomizationType};
    use crate::testing::MemoryDocuments;

    fn burgers() -> Category {
        Category {
            name: "Burgers".to_string(),
            description: "Stacked and juicy".to_string(),
        }
    }

    #[tokio::test]
    async fn test_reconcile_twice_creates_once() {
        let store = MemoryDocuments::default();

        let first = reconcile(&store, "categories", "name", &burgers())
            .await
            .unwrap();
        let second = reconcile(&store, "categories", "name", &burgers())
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(store.creates(), 1);
        assert_eq!(store.count("categories"), 1);
    }

    #[tokio::test]
    async fn test_reconcile_missing_identity_field() {
        let store = MemoryDocuments::default();
        let err = reconcile(&store, "categories", "title", &burgers())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::MalformedRecord { .. }));
        assert_eq!(store.creates(), 0);
    }

    #[tokio::test]
    async fn test_reconcile_all_builds_map() {
        let store = MemoryDocuments::default();
        let records = vec![
            Customization {
                name: "Extra Cheese".to_string(),
                price: 1.5,
                kind: CustomizationType::Topping,
            },
            Customization {
                name: "Fries".to_string(),
                price: 2.0,
                kind: CustomizationType::Side,
            },
        ];

        let map = reconcile_all(&store, "customization", &records).await.unwrap();
        assert_eq!(map.len(), 2);
        let cheese = map.get("Extra Cheese").unwrap();
        let stored = find_by(&store, "customization", "name", "Extra Cheese")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.id, cheese);
        assert_eq!(stored.str_field("type"), Some("topping"));

        // Second pass reuses everything.
        let again = reconcile_all(&store, "customization", &records).await.unwrap();
        assert_eq!(again, map);
        assert_eq!(store.creates(), 2);
    }

    #[tokio::test]
    async fn test_reconcile_all_propagates_failure() {
        let store = MemoryDocuments::default();
        store.reject_creates_in("categories");
        let err = reconcile_all(&store, "categories", &[burgers()])
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("Burgers"));
    }
}
