use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::StoreError;

/// Content type attached to every uploaded menu image.
pub const IMAGE_MIME_TYPE: &str = "image/png";

/// Records keyed by a natural `name` identity.
pub trait Named {
    fn name(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomizationType {
    Topping,
    Side,
    Size,
    Crust,
    Other,
}

impl fmt::Display for CustomizationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CustomizationType::Topping => "topping",
            CustomizationType::Side => "side",
            CustomizationType::Size => "size",
            CustomizationType::Crust => "crust",
            CustomizationType::Other => "other",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customization {
    pub name: String,
    pub price: f64,
    #[serde(rename = "type")]
    pub kind: CustomizationType,
}

/// A menu item as it appears in the source dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub name: String,
    pub description: String,
    pub image_url: String,
    pub price: f64,
    pub rating: f64,
    pub calories: i64,
    pub protein: i64,
    pub category_name: String,
    #[serde(default)]
    pub customizations: Vec<String>,
}

/// A menu item as stored remotely: image rehosted, category resolved to an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuDocument {
    pub name: String,
    pub description: String,
    pub image_url: String,
    pub price: f64,
    pub rating: f64,
    pub calories: i64,
    pub protein: i64,
    #[serde(deserialize_with = "id_or_document")]
    pub categories: String,
}

/// Accept a relationship attribute either as a bare id or as the expanded
/// related document.
fn id_or_document<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Related {
        Id(String),
        Document {
            #[serde(rename = "$id")]
            id: String,
        },
    }

    Ok(match Related::deserialize(deserializer)? {
        Related::Id(id) | Related::Document { id } => id,
    })
}

impl MenuDocument {
    #[must_use]
    pub fn from_source(item: &MenuItem, category_id: &str, image_url: String) -> Self {
        Self {
            name: item.name.clone(),
            description: item.description.clone(),
            image_url,
            price: item.price,
            rating: item.rating,
            calories: item.calories,
            protein: item.protein,
            categories: category_id.to_string(),
        }
    }
}

/// Link between a menu document and one of its customizations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuCustomization {
    pub menu: String,
    pub customization: String,
}

impl Named for Category {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for Customization {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for MenuItem {
    fn name(&self) -> &str {
        &self.name
    }
}

/// A remote document: backend-assigned id plus its attribute map.
///
/// Backend metadata (`$createdAt`, `$collectionId`, ...) is kept in `fields`
/// and ignored when decoding into a typed record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Document {
    /// Decode the document's fields into a typed record.
    pub fn decode<T: DeserializeOwned>(&self, entity: &'static str) -> Result<T, StoreError> {
        serde_json::from_value(Value::Object(self.fields.clone()))
            .map_err(|e| StoreError::malformed(entity, format!("document {}: {e}", self.id)))
    }

    #[must_use]
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentList {
    /// Matching documents on the backend, which may exceed `documents.len()`.
    pub total: u64,
    pub documents: Vec<Document>,
}

impl DocumentList {
    /// Page out of every matching document, honouring an `Offset` filter.
    #[must_use]
    pub fn page(matched: Vec<Document>, filters: &[Filter]) -> Self {
        let total = matched.len() as u64;
        let documents = matched.into_iter().skip(Filter::offset(filters)).collect();
        Self { total, documents }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredFile {
    #[serde(rename = "$id")]
    pub id: String,
    pub name: String,
    #[serde(rename = "mimeType", default)]
    pub mime_type: String,
    #[serde(rename = "sizeOriginal", default)]
    pub size: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileList {
    pub total: u64,
    pub files: Vec<StoredFile>,
}

/// A local file to be uploaded to the object store.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub name: String,
    pub mime_type: String,
    pub path: std::path::PathBuf,
}

/// Document query condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Equal { attribute: String, value: Value },
    Search { attribute: String, value: String },
    /// Skip this many matching documents.
    Offset(u64),
}

impl Filter {
    pub fn equal(attribute: &str, value: impl Into<Value>) -> Self {
        Filter::Equal {
            attribute: attribute.to_string(),
            value: value.into(),
        }
    }

    pub fn search(attribute: &str, value: &str) -> Self {
        Filter::Search {
            attribute: attribute.to_string(),
            value: value.to_string(),
        }
    }

    /// Rows skipped by the first `Offset` in `filters`.
    #[must_use]
    pub fn offset(filters: &[Filter]) -> usize {
        filters
            .iter()
            .find_map(|f| match f {
                Filter::Offset(n) => Some(*n as usize),
                _ => None,
            })
            .unwrap_or(0)
    }

    /// Evaluate the condition against a document's fields.
    ///
    /// Search matches when every whitespace-separated term occurs in the
    /// attribute, case-insensitively.
    #[must_use]
    pub fn matches(&self, fields: &Map<String, Value>) -> bool {
        match self {
            Filter::Equal { attribute, value } => fields.get(attribute) == Some(value),
            Filter::Search { attribute, value } => {
                let Some(haystack) = fields.get(attribute).and_then(Value::as_str) else {
                    return false;
                };
                let haystack = haystack.to_lowercase();
                value
                    .split_whitespace()
                    .all(|term| haystack.contains(&term.to_lowercase()))
            }
            Filter::Offset(_) => true,
        }
    }
}

/// Generate a fresh backend id (32 lowercase hex chars, valid as an Appwrite id).
#[must_use]
pub fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Serialize a record into a document attribute map.
pub fn to_fields<T: Serialize>(
    entity: &'static str,
    record: &T,
) -> Result<Map<String, Value>, StoreError> {
    match serde_json::to_value(record) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(StoreError::malformed(
            entity,
            format!("expected an object, got {other}"),
        )),
        Err(e) => Err(StoreError::malformed(entity, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_document_roundtrips_id_and_ignores_metadata() {
        let d = doc(json!({
            "$id": "abc",
            "$collectionId": "categories",
            "name": "Burgers",
            "description": "Stacked",
        }));
        assert_eq!(d.id, "abc");
        let cat: Category = d.decode("category").unwrap();
        assert_eq!(cat.name, "Burgers");
        assert_eq!(d.str_field("name"), Some("Burgers"));
    }

    #[test]
    fn test_decode_shape_mismatch_is_malformed_record() {
        let d = doc(json!({ "$id": "x1", "name": "Cheese", "price": "free", "type": "topping" }));
        let err = d.decode::<Customization>("customization").unwrap_err();
        match err {
            StoreError::MalformedRecord { entity, reason } => {
                assert_eq!(entity, "customization");
                assert!(reason.contains("x1"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_customization_type_serde() {
        let c: Customization =
            serde_json::from_value(json!({ "name": "Thin", "price": 0.0, "type": "crust" }))
                .unwrap();
        assert_eq!(c.kind, CustomizationType::Crust);
        assert_eq!(c.kind.to_string(), "crust");

        let bad = serde_json::from_value::<Customization>(
            json!({ "name": "Thin", "price": 0.0, "type": "sauce" }),
        );
        assert!(bad.is_err());
    }

    #[test]
    fn test_menu_document_from_source() {
        let item = MenuItem {
            name: "Classic Burger".to_string(),
            description: "Beef patty".to_string(),
            image_url: "https://img.example.com/burger.png".to_string(),
            price: 9.5,
            rating: 4.5,
            calories: 550,
            protein: 25,
            category_name: "Burgers".to_string(),
            customizations: vec!["Extra Cheese".to_string()],
        };
        let d = MenuDocument::from_source(&item, "cat-1", "https://cdn/view".to_string());
        assert_eq!(d.categories, "cat-1");
        assert_eq!(d.image_url, "https://cdn/view");
        assert_eq!(d.calories, 550);

        let fields = to_fields("menu", &d).unwrap();
        assert_eq!(fields.get("categories"), Some(&json!("cat-1")));
        assert!(!fields.contains_key("category_name"));
    }

    #[test]
    fn test_filter_equal_and_search() {
        let fields = to_fields(
            "category",
            &Category {
                name: "Spicy Chicken Wrap".to_string(),
                description: String::new(),
            },
        )
        .unwrap();
        assert!(Filter::equal("name", "Spicy Chicken Wrap").matches(&fields));
        assert!(!Filter::equal("name", "spicy chicken wrap").matches(&fields));
        assert!(Filter::search("name", "chicken SPICY").matches(&fields));
        assert!(!Filter::search("name", "beef").matches(&fields));
        assert!(!Filter::search("missing", "x").matches(&fields));
    }

    #[test]
    fn test_menu_document_accepts_expanded_category() {
        let menu_doc = |categories: Value| {
            doc(json!({
                "$id": "m1",
                "name": "Pepperoni Pizza",
                "description": "",
                "image_url": "https://cdn/view",
                "price": 12.5,
                "rating": 4.8,
                "calories": 980,
                "protein": 42,
                "categories": categories,
            }))
        };

        let d: MenuDocument = menu_doc(json!("cat-2")).decode("menu").unwrap();
        assert_eq!(d.categories, "cat-2");

        let expanded = menu_doc(json!({
            "$id": "cat-2",
            "$collectionId": "categories",
            "name": "Pizzas",
            "description": "Stone-baked"
        }));
        let d: MenuDocument = expanded.decode("menu").unwrap();
        assert_eq!(d.categories, "cat-2");

        assert!(menu_doc(json!(7)).decode::<MenuDocument>("menu").is_err());
    }

    #[test]
    fn test_document_list_page_applies_offset() {
        let docs: Vec<Document> = (0..5)
            .map(|i| doc(json!({ "$id": format!("d{i}") })))
            .collect();

        let first = DocumentList::page(docs.clone(), &[Filter::equal("x", 1)]);
        assert_eq!(first.total, 5);
        assert_eq!(first.documents.len(), 5);

        let rest = DocumentList::page(docs, &[Filter::Offset(3)]);
        assert_eq!(rest.total, 5);
        let ids: Vec<&str> = rest.documents.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["d3", "d4"]);
        assert!(Filter::Offset(3).matches(&Map::new()));
    }

    #[test]
    fn test_new_id_is_unique_and_valid() {
        let a = new_id();
        let b = new_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
