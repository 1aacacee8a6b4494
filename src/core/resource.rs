//! Typed access to the document store.
//!
//! Every entity is stored as a JSON document keyed by its own id field
//! (`eventid`, `placeid`, ...), never by the backend's native id.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::core::errors::{ApiError, ApiResult};
use crate::core::store::{DocumentStore, Filter, StoreError, Update};

pub trait Document: Serialize + DeserializeOwned + Send + Sync {
    const COLLECTION: &'static str;
    const ID_FIELD: &'static str;
    /// Used in error messages ("Event not found").
    const NAME: &'static str;

    fn by_id(id: &str) -> Filter {
        Filter::new().eq(Self::ID_FIELD, id)
    }
}

/// A document mutable only by the user it references.
pub trait Owned: Document {
    fn owner_id(&self) -> &str;
}

/// A document carrying a non-negative purchasable counter.
pub trait Stocked: Document {
    const STOCK_FIELD: &'static str;

    fn stock(&self) -> i64;
}

fn not_found<T: Document>() -> ApiError {
    ApiError::not_found(format!("{} not found", T::NAME))
}

fn decode<T: Document>(doc: serde_json::Value) -> ApiResult<T> {
    serde_json::from_value(doc).map_err(|e| StoreError::from(e).into())
}

pub async fn insert<T: Document>(store: &dyn DocumentStore, item: &T) -> ApiResult<()> {
    let doc = serde_json::to_value(item).map_err(StoreError::from)?;
    store.insert_one(T::COLLECTION, doc).await?;
    Ok(())
}

pub async fn find_one<T: Document>(store: &dyn DocumentStore, filter: &Filter) -> ApiResult<Option<T>> {
    store
        .find_one(T::COLLECTION, filter)
        .await?
        .map(decode::<T>)
        .transpose()
}

pub async fn find_all<T: Document>(store: &dyn DocumentStore, filter: &Filter) -> ApiResult<Vec<T>> {
    store
        .find(T::COLLECTION, filter)
        .await?
        .into_iter()
        .map(decode::<T>)
        .collect()
}

pub async fn load_where<T: Document>(store: &dyn DocumentStore, filter: &Filter) -> ApiResult<T> {
    find_one(store, filter).await?.ok_or_else(not_found::<T>)
}

pub async fn load<T: Document>(store: &dyn DocumentStore, id: &str) -> ApiResult<T> {
    load_where(store, &T::by_id(id)).await
}

/// Loads a document and checks that `caller` owns it. Absence is reported
/// before ownership.
pub async fn load_owned<T: Owned>(store: &dyn DocumentStore, id: &str, caller: &str) -> ApiResult<T> {
    let item: T = load(store, id).await?;
    if item.owner_id() != caller {
        log::warn!("User {} denied access to {} {}", caller, T::NAME, id);
        return Err(ApiError::Forbidden(format!("Not allowed to modify this {}", T::NAME.to_lowercase())));
    }
    Ok(item)
}

/// Applies `update` to the document matched by `filter` and returns the
/// merged result.
pub async fn patch_where<T: Document>(store: &dyn DocumentStore, filter: &Filter, update: &Update) -> ApiResult<T> {
    if !update.is_empty() && !store.update_one(T::COLLECTION, filter, update).await? {
        return Err(not_found::<T>());
    }
    load_where(store, filter).await
}

pub async fn patch<T: Document>(store: &dyn DocumentStore, id: &str, update: &Update) -> ApiResult<T> {
    patch_where(store, &T::by_id(id), update).await
}

pub async fn remove_where<T: Document>(store: &dyn DocumentStore, filter: &Filter) -> ApiResult<()> {
    if store.delete_one(T::COLLECTION, filter).await? {
        Ok(())
    } else {
        Err(not_found::<T>())
    }
}

/// Atomically takes `quantity` units from the document matched by `filter`.
///
/// The stock check and the decrement are one conditional update, so
/// concurrent buyers can never drive the counter below zero.
pub async fn purchase<T: Stocked>(store: &dyn DocumentStore, filter: &Filter, quantity: i64) -> ApiResult<T> {
    if quantity < 1 {
        return Err(ApiError::bad_request("Quantity must be at least 1"));
    }

    let guarded = filter.clone().gte(T::STOCK_FIELD, quantity as f64);
    let update = Update::new().inc(T::STOCK_FIELD, -quantity);

    if store.update_one(T::COLLECTION, &guarded, &update).await? {
        return load_where(store, filter).await;
    }

    // Either the item is gone or there is not enough left.
    load_where::<T>(store, filter).await?;
    Err(ApiError::bad_request(format!("Not enough {} in stock", T::NAME.to_lowercase())))
}
