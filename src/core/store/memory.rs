use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use super::{DocumentStore, Filter, StoreError, StoreResult, Update};

/// In-process store. Each collection sits behind its own map shard lock, so a
/// single operation on a collection never interleaves with another.
#[derive(Default)]
pub struct MemoryStore {
    collections: DashMap<String, Vec<Value>>,
    unique: DashMap<String, Vec<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn unique_fields(&self, collection: &str) -> Vec<String> {
        self.unique
            .get(collection)
            .map(|fields| fields.clone())
            .unwrap_or_default()
    }
}

/// Finds a unique field of `candidate` whose value is already held by a
/// document in `docs` other than the one at `skip`.
fn conflicting_field<'a>(
    docs: &[Value],
    candidate: &Value,
    unique: &'a [String],
    skip: Option<usize>,
) -> Option<&'a String> {
    unique.iter().find(|field| {
        let Some(value) = candidate.get(field.as_str()).filter(|v| !v.is_null()) else {
            return false;
        };
        docs.iter()
            .enumerate()
            .any(|(i, doc)| Some(i) != skip && doc.get(field.as_str()) == Some(value))
    })
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert_one(&self, collection: &str, doc: Value) -> StoreResult<()> {
        if !doc.is_object() {
            return Err(StoreError::NotAnObject);
        }

        let unique = self.unique_fields(collection);
        let mut docs = self.collections.entry(collection.to_string()).or_default();

        if let Some(field) = conflicting_field(&docs, &doc, &unique, None) {
            return Err(StoreError::Duplicate {
                collection: collection.to_string(),
                field: field.clone(),
            });
        }

        docs.push(doc);
        Ok(())
    }

    async fn find_one(&self, collection: &str, filter: &Filter) -> StoreResult<Option<Value>> {
        Ok(self
            .collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|doc| filter.matches(doc)).cloned()))
    }

    async fn find(&self, collection: &str, filter: &Filter) -> StoreResult<Vec<Value>> {
        Ok(self
            .collections
            .get(collection)
            .map(|docs| docs.iter().filter(|doc| filter.matches(doc)).cloned().collect())
            .unwrap_or_default())
    }

    async fn update_one(&self, collection: &str, filter: &Filter, update: &Update) -> StoreResult<bool> {
        let unique = self.unique_fields(collection);
        let Some(mut docs) = self.collections.get_mut(collection) else {
            return Ok(false);
        };

        let Some(index) = docs.iter().position(|doc| filter.matches(doc)) else {
            return Ok(false);
        };

        let mut updated = docs[index].clone();
        update.apply(&mut updated)?;

        if let Some(field) = conflicting_field(&docs, &updated, &unique, Some(index)) {
            return Err(StoreError::Duplicate {
                collection: collection.to_string(),
                field: field.clone(),
            });
        }

        docs[index] = updated;
        Ok(true)
    }

    async fn update_many(&self, collection: &str, filter: &Filter, update: &Update) -> StoreResult<u64> {
        let Some(mut docs) = self.collections.get_mut(collection) else {
            return Ok(0);
        };

        let mut count = 0;
        for doc in docs.iter_mut().filter(|doc| filter.matches(doc)) {
            update.apply(doc)?;
            count += 1;
        }

        Ok(count)
    }

    async fn delete_one(&self, collection: &str, filter: &Filter) -> StoreResult<bool> {
        let Some(mut docs) = self.collections.get_mut(collection) else {
            return Ok(false);
        };

        match docs.iter().position(|doc| filter.matches(doc)) {
            Some(index) => {
                docs.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_many(&self, collection: &str, filter: &Filter) -> StoreResult<u64> {
        let Some(mut docs) = self.collections.get_mut(collection) else {
            return Ok(0);
        };

        let before = docs.len();
        docs.retain(|doc| !filter.matches(doc));
        Ok((before - docs.len()) as u64)
    }

    async fn ensure_unique(&self, collection: &str, field: &str) -> StoreResult<()> {
        let mut fields = self.unique.entry(collection.to_string()).or_default();
        if !fields.iter().any(|f| f == field) {
            fields.push(field.to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[actix_web::test]
    async fn unique_field_rejects_second_insert() {
        let store = MemoryStore::new();
        store.ensure_unique("users", "username").await.unwrap();

        store.insert_one("users", json!({"userid": "u1", "username": "alice"})).await.unwrap();
        let err = store
            .insert_one("users", json!({"userid": "u2", "username": "alice"}))
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Duplicate { .. }));
        assert_eq!(store.find("users", &Filter::new()).await.unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn update_into_taken_value_is_rejected() {
        let store = MemoryStore::new();
        store.ensure_unique("users", "username").await.unwrap();
        store.insert_one("users", json!({"userid": "u1", "username": "alice"})).await.unwrap();
        store.insert_one("users", json!({"userid": "u2", "username": "bob"})).await.unwrap();

        let err = store
            .update_one(
                "users",
                &Filter::new().eq("userid", "u2"),
                &Update::new().set("username", "alice"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { .. }));

        // Rewriting a document with its own value is not a conflict.
        let matched = store
            .update_one(
                "users",
                &Filter::new().eq("userid", "u1"),
                &Update::new().set("username", "alice"),
            )
            .await
            .unwrap();
        assert!(matched);
    }

    #[actix_web::test]
    async fn conditional_decrement_never_goes_negative() {
        let store = MemoryStore::new();
        store.insert_one("ticks", json!({"ticketid": "t1", "quantity": 2})).await.unwrap();

        let filter = Filter::new().eq("ticketid", "t1").gte("quantity", 1.0);
        let update = Update::new().inc("quantity", -1);

        assert!(store.update_one("ticks", &filter, &update).await.unwrap());
        assert!(store.update_one("ticks", &filter, &update).await.unwrap());
        assert!(!store.update_one("ticks", &filter, &update).await.unwrap());

        let doc = store.find_one("ticks", &Filter::new().eq("ticketid", "t1")).await.unwrap();
        assert_eq!(doc.unwrap()["quantity"], json!(0));
    }

    #[actix_web::test]
    async fn delete_many_reports_count() {
        let store = MemoryStore::new();
        for id in ["a", "b", "c"] {
            let event = if id == "c" { "e2" } else { "e1" };
            store.insert_one("media", json!({"id": id, "eventid": event})).await.unwrap();
        }

        let removed = store.delete_many("media", &Filter::new().eq("eventid", "e1")).await.unwrap();

        assert_eq!(removed, 2);
        assert_eq!(store.find("media", &Filter::new()).await.unwrap().len(), 1);
    }
}
