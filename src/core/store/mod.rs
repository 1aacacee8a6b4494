//! Document storage.
//!
//! Handlers talk to a [`DocumentStore`]: named collections of JSON documents
//! with equality filters and field-level update operators. A single
//! `update_one` is atomic for the document it touches; nothing spans more
//! than one document.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

mod memory;
mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate value for unique field {collection}.{field}")]
    Duplicate { collection: String, field: String },
    #[error("document is not an object")]
    NotAnObject,
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("storage backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert_one(&self, collection: &str, doc: Value) -> StoreResult<()>;

    async fn find_one(&self, collection: &str, filter: &Filter) -> StoreResult<Option<Value>>;

    async fn find(&self, collection: &str, filter: &Filter) -> StoreResult<Vec<Value>>;

    /// Returns whether a document matched `filter`.
    async fn update_one(&self, collection: &str, filter: &Filter, update: &Update) -> StoreResult<bool>;

    async fn update_many(&self, collection: &str, filter: &Filter, update: &Update) -> StoreResult<u64>;

    async fn delete_one(&self, collection: &str, filter: &Filter) -> StoreResult<bool>;

    async fn delete_many(&self, collection: &str, filter: &Filter) -> StoreResult<u64>;

    /// Declares `field` unique within `collection`. Idempotent.
    async fn ensure_unique(&self, collection: &str, field: &str) -> StoreResult<()>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq(String, Value),
    Ne(String, Value),
    Gte(String, f64),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Eq(field.to_string(), value.into()));
        self
    }

    pub fn ne(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Ne(field.to_string(), value.into()));
        self
    }

    pub fn gte(mut self, field: &str, value: f64) -> Self {
        self.conditions.push(Condition::Gte(field.to_string(), value));
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn matches(&self, doc: &Value) -> bool {
        self.conditions.iter().all(|condition| match condition {
            Condition::Eq(field, value) => doc.get(field).unwrap_or(&Value::Null) == value,
            Condition::Ne(field, value) => doc.get(field).unwrap_or(&Value::Null) != value,
            Condition::Gte(field, min) => doc
                .get(field)
                .and_then(Value::as_f64)
                .map(|v| v >= *min)
                .unwrap_or(false),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOp {
    Set(String, Value),
    Inc(String, i64),
    Push(String, Value),
    AddToSet(String, Value),
    Pull(String, Value),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    ops: Vec<UpdateOp>,
}

impl Update {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.ops.push(UpdateOp::Set(field.to_string(), value.into()));
        self
    }

    pub fn inc(mut self, field: &str, by: i64) -> Self {
        self.ops.push(UpdateOp::Inc(field.to_string(), by));
        self
    }

    pub fn push(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.ops.push(UpdateOp::Push(field.to_string(), value.into()));
        self
    }

    pub fn add_to_set(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.ops.push(UpdateOp::AddToSet(field.to_string(), value.into()));
        self
    }

    pub fn pull(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.ops.push(UpdateOp::Pull(field.to_string(), value.into()));
        self
    }

    pub fn ops(&self) -> &[UpdateOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Fields written by this update, in order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.ops.iter().map(|op| match op {
            UpdateOp::Set(f, _)
            | UpdateOp::Inc(f, _)
            | UpdateOp::Push(f, _)
            | UpdateOp::AddToSet(f, _)
            | UpdateOp::Pull(f, _) => f.as_str(),
        })
    }

    pub fn apply(&self, doc: &mut Value) -> StoreResult<()> {
        let map = doc.as_object_mut().ok_or(StoreError::NotAnObject)?;

        for op in &self.ops {
            match op {
                UpdateOp::Set(field, value) => {
                    map.insert(field.clone(), value.clone());
                }
                UpdateOp::Inc(field, by) => {
                    let current = map.get(field).and_then(Value::as_i64).unwrap_or(0);
                    map.insert(field.clone(), Value::from(current + by));
                }
                UpdateOp::Push(field, value) => {
                    if let Some(items) = array_entry(map, field) {
                        items.push(value.clone());
                    }
                }
                UpdateOp::AddToSet(field, value) => {
                    if let Some(items) = array_entry(map, field) {
                        if !items.contains(value) {
                            items.push(value.clone());
                        }
                    }
                }
                UpdateOp::Pull(field, value) => {
                    if let Some(Value::Array(items)) = map.get_mut(field) {
                        items.retain(|item| item != value);
                    }
                }
            }
        }

        Ok(())
    }
}

fn array_entry<'a>(map: &'a mut serde_json::Map<String, Value>, field: &str) -> Option<&'a mut Vec<Value>> {
    let entry = map.entry(field.to_string()).or_insert_with(|| Value::Array(Vec::new()));
    if !entry.is_array() {
        *entry = Value::Array(Vec::new());
    }
    entry.as_array_mut()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn filter_matches_equality_and_threshold() {
        let doc = json!({"eventid": "e1", "quantity": 3});

        assert!(Filter::new().eq("eventid", "e1").gte("quantity", 3.0).matches(&doc));
        assert!(!Filter::new().eq("eventid", "e1").gte("quantity", 4.0).matches(&doc));
        assert!(!Filter::new().eq("eventid", "e2").matches(&doc));
        assert!(Filter::new().ne("eventid", "e2").matches(&doc));
    }

    #[test]
    fn missing_field_only_equals_null() {
        let doc = json!({"name": "x"});

        assert!(Filter::new().eq("city", Value::Null).matches(&doc));
        assert!(!Filter::new().gte("stock", 0.0).matches(&doc));
    }

    #[test]
    fn add_to_set_does_not_duplicate() {
        let mut doc = json!({"followers": ["a"]});

        Update::new()
            .add_to_set("followers", "a")
            .add_to_set("followers", "b")
            .apply(&mut doc)
            .unwrap();

        assert_eq!(doc["followers"], json!(["a", "b"]));
    }

    #[test]
    fn pull_and_inc() {
        let mut doc = json!({"follows": ["a", "b", "a"], "stock": 5});

        Update::new().pull("follows", "a").inc("stock", -2).apply(&mut doc).unwrap();

        assert_eq!(doc["follows"], json!(["b"]));
        assert_eq!(doc["stock"], json!(3));
    }

    #[test]
    fn push_creates_missing_array() {
        let mut doc = json!({"title": "Gig"});

        Update::new().push("reviews", json!({"rating": 5})).apply(&mut doc).unwrap();

        assert_eq!(doc["reviews"], json!([{"rating": 5}]));
    }
}
