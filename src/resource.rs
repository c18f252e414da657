//! Resource kinds that go through the mutation orchestrator.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use crate::db::DbState;
use crate::error::ValidationError;
use crate::models::Category;
use crate::normalize;

/// A backend collection with a local degraded-mode mirror.
pub trait Resource: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Validated user input for a create or update.
    type Draft: Clone + Send + Sync;

    /// Singular name used in notices and logs.
    const KIND: &'static str;
    /// Local store key of the mirror.
    const MIRROR_KEY: &'static str;
    /// Collection path used for create/update/delete.
    const COLLECTION_PATH: &'static str;
    /// Path returning the full list.
    const LIST_PATH: &'static str;

    fn id(&self) -> i64;

    /// Human label (name or title).
    fn label(&self) -> &str;

    fn from_value(v: &Value) -> Option<Self>;

    /// JSON body sent on POST/PUT.
    fn payload(draft: &Self::Draft) -> Value;

    /// Local record for a degraded-mode write.
    fn from_draft(id: i64, draft: &Self::Draft) -> Self;

    /// Fill fields a draft does not carry on a local record, from the record
    /// it replaces or from other mirrors.
    fn complete_local(&mut self, _previous: Option<&Self>, _db: &DbState) {}

    fn list_from_body(body: &Value) -> Vec<Self> {
        normalize::list_items(body)
            .iter()
            .filter_map(Self::from_value)
            .collect()
    }

    fn item_path(id: i64) -> String {
        format!("{}/{id}", Self::COLLECTION_PATH)
    }
}

/// Category name, trimmed and non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryDraft {
    pub name: String,
}

impl CategoryDraft {
    pub fn new(name: &str) -> Result<Self, ValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::new("Enter a category name"));
        }
        Ok(Self {
            name: name.to_string(),
        })
    }
}

impl Resource for Category {
    type Draft = CategoryDraft;

    const KIND: &'static str = "category";
    const MIRROR_KEY: &'static str = "mock_categories";
    const COLLECTION_PATH: &'static str = "/categories";
    const LIST_PATH: &'static str = "/categories";

    fn id(&self) -> i64 {
        self.id
    }

    fn label(&self) -> &str {
        &self.name
    }

    fn from_value(v: &Value) -> Option<Self> {
        normalize::category(v)
    }

    fn payload(draft: &CategoryDraft) -> Value {
        json!({ "name": draft.name })
    }

    fn from_draft(id: i64, draft: &CategoryDraft) -> Self {
        Category {
            id,
            name: draft.name.clone(),
        }
    }
}
