use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::bson::{self, doc, Bson, Document};
use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use mongodb::options::{FindOneOptions, FindOptions, IndexOptions};
use mongodb::{Client, Collection, Database, IndexModel};
use serde_json::Value;

use super::{Condition, DocumentStore, Filter, StoreError, StoreResult, Update, UpdateOp};

const DUPLICATE_KEY: i32 = 11000;

pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    pub async fn connect(uri: &str, database: &str) -> StoreResult<Self> {
        let client = Client::with_uri_str(uri).await.map_err(backend)?;
        let db = client.database(database);

        db.run_command(doc! { "ping": 1 }, None).await.map_err(backend)?;
        log::info!("Connected to MongoDB database {}", database);

        Ok(Self { db })
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.db.collection::<Document>(name)
    }
}

fn backend(err: MongoError) -> StoreError {
    StoreError::Backend(err.to_string())
}

fn is_duplicate_key(err: &MongoError) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) => e.code == DUPLICATE_KEY,
        ErrorKind::Command(e) => e.code == DUPLICATE_KEY,
        _ => false,
    }
}

/// Maps a write error, recovering the field name from the index name
/// (`username_1`) when the server reports a duplicate key.
fn write_error(err: MongoError, collection: &str) -> StoreError {
    if !is_duplicate_key(&err) {
        return backend(err);
    }

    let message = err.to_string();
    let field = message
        .split("index: ")
        .nth(1)
        .and_then(|rest| rest.split_whitespace().next())
        .map(|index| index.trim_end_matches("_1").to_string())
        .unwrap_or_else(|| "key".to_string());

    StoreError::Duplicate {
        collection: collection.to_string(),
        field,
    }
}

fn to_bson(value: &Value) -> StoreResult<Bson> {
    bson::to_bson(value).map_err(|e| StoreError::Backend(e.to_string()))
}

fn to_document(value: Value) -> StoreResult<Document> {
    match to_bson(&value)? {
        Bson::Document(doc) => Ok(doc),
        _ => Err(StoreError::NotAnObject),
    }
}

fn from_document(doc: Document) -> Value {
    Bson::Document(doc).into_relaxed_extjson()
}

fn filter_document(filter: &Filter) -> StoreResult<Document> {
    let mut out = Document::new();

    for condition in filter.conditions() {
        match condition {
            Condition::Eq(field, value) => {
                out.insert(field.clone(), to_bson(value)?);
            }
            Condition::Ne(field, value) => {
                out.insert(field.clone(), doc! { "$ne": to_bson(value)? });
            }
            Condition::Gte(field, min) => {
                out.insert(field.clone(), doc! { "$gte": *min });
            }
        }
    }

    Ok(out)
}

fn update_document(update: &Update) -> StoreResult<Document> {
    let mut groups: Vec<(&str, Document)> = Vec::new();

    let mut group = |operator: &'static str, field: &str, value: Bson| {
        match groups.iter_mut().find(|(op, _)| *op == operator) {
            Some((_, doc)) => {
                doc.insert(field, value);
            }
            None => {
                let mut doc = Document::new();
                doc.insert(field, value);
                groups.push((operator, doc));
            }
        }
    };

    for op in update.ops() {
        match op {
            UpdateOp::Set(field, value) => group("$set", field, to_bson(value)?),
            UpdateOp::Inc(field, by) => group("$inc", field, Bson::Int64(*by)),
            UpdateOp::Push(field, value) => group("$push", field, to_bson(value)?),
            UpdateOp::AddToSet(field, value) => group("$addToSet", field, to_bson(value)?),
            UpdateOp::Pull(field, value) => group("$pull", field, to_bson(value)?),
        }
    }

    Ok(groups
        .into_iter()
        .map(|(operator, doc)| (operator.to_string(), Bson::Document(doc)))
        .collect())
}

fn without_id() -> Document {
    doc! { "_id": 0 }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn insert_one(&self, collection: &str, doc: Value) -> StoreResult<()> {
        self.collection(collection)
            .insert_one(to_document(doc)?, None)
            .await
            .map_err(|e| write_error(e, collection))?;
        Ok(())
    }

    async fn find_one(&self, collection: &str, filter: &Filter) -> StoreResult<Option<Value>> {
        let options = FindOneOptions::builder().projection(without_id()).build();
        let doc = self
            .collection(collection)
            .find_one(filter_document(filter)?, options)
            .await
            .map_err(backend)?;

        Ok(doc.map(from_document))
    }

    async fn find(&self, collection: &str, filter: &Filter) -> StoreResult<Vec<Value>> {
        let options = FindOptions::builder().projection(without_id()).build();
        let cursor = self
            .collection(collection)
            .find(filter_document(filter)?, options)
            .await
            .map_err(backend)?;

        let docs: Vec<Document> = cursor.try_collect().await.map_err(backend)?;
        Ok(docs.into_iter().map(from_document).collect())
    }

    async fn update_one(&self, collection: &str, filter: &Filter, update: &Update) -> StoreResult<bool> {
        if update.is_empty() {
            return Ok(self.find_one(collection, filter).await?.is_some());
        }

        let result = self
            .collection(collection)
            .update_one(filter_document(filter)?, update_document(update)?, None)
            .await
            .map_err(|e| write_error(e, collection))?;

        Ok(result.matched_count > 0)
    }

    async fn update_many(&self, collection: &str, filter: &Filter, update: &Update) -> StoreResult<u64> {
        if update.is_empty() {
            return Ok(0);
        }

        let result = self
            .collection(collection)
            .update_many(filter_document(filter)?, update_document(update)?, None)
            .await
            .map_err(|e| write_error(e, collection))?;

        Ok(result.matched_count)
    }

    async fn delete_one(&self, collection: &str, filter: &Filter) -> StoreResult<bool> {
        let result = self
            .collection(collection)
            .delete_one(filter_document(filter)?, None)
            .await
            .map_err(backend)?;

        Ok(result.deleted_count > 0)
    }

    async fn delete_many(&self, collection: &str, filter: &Filter) -> StoreResult<u64> {
        let result = self
            .collection(collection)
            .delete_many(filter_document(filter)?, None)
            .await
            .map_err(backend)?;

        Ok(result.deleted_count)
    }

    async fn ensure_unique(&self, collection: &str, field: &str) -> StoreResult<()> {
        let mut keys = Document::new();
        keys.insert(field, 1_i32);

        let index = IndexModel::builder()
            .keys(keys)
            .options(IndexOptions::builder().unique(true).build())
            .build();

        self.collection(collection)
            .create_index(index, None)
            .await
            .map_err(backend)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn update_groups_operators() {
        let update = Update::new()
            .set("title", "New")
            .set("location", "Hall")
            .inc("quantity", -2)
            .add_to_set("followers", "u1");

        let doc = update_document(&update).unwrap();

        assert_eq!(doc.get_document("$set").unwrap().len(), 2);
        assert_eq!(doc.get_document("$inc").unwrap().get_i64("quantity").unwrap(), -2);
        assert_eq!(doc.get_document("$addToSet").unwrap().get_str("followers").unwrap(), "u1");
    }

    #[test]
    fn filter_translates_threshold() {
        let filter = Filter::new().eq("ticketid", "t1").gte("quantity", 3.0);

        let doc = filter_document(&filter).unwrap();

        assert_eq!(doc.get_str("ticketid").unwrap(), "t1");
        assert_eq!(doc.get_document("quantity").unwrap().get_f64("$gte").unwrap(), 3.0);
    }

    #[test]
    fn documents_round_trip_as_plain_json() {
        let value = json!({"eventid": "e1", "quantity": 4, "price": 12.5, "tags": ["a"]});

        let back = from_document(to_document(value.clone()).unwrap());

        assert_eq!(back, value);
    }
}
