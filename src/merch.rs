use actix_web::{web, HttpRequest, HttpResponse};

use crate::auth::AuthUser;
use crate::core::assets::AssetKind;
use crate::core::errors::{ApiError, ApiResult};
use crate::core::form::FormData;
use crate::core::helpers::{checked_id, generate_id, MERCH_ID_LENGTH};
use crate::core::resource::{self, Stocked};
use crate::core::store::{Filter, Update};
use crate::models::{Event, Merch};
use crate::tickets::{count, price, requested_quantity};
use crate::AppState;

fn scoped(event_id: &str, merch_id: &str) -> Filter {
    Filter::new().eq("eventid", event_id).eq("merchid", merch_id)
}

/// `stock`, or `quantity` as the web form names it.
fn stock(form: &FormData) -> ApiResult<Option<i64>> {
    match count(form, "stock")? {
        Some(n) => Ok(Some(n)),
        None => count(form, "quantity"),
    }
}

fn changes(form: &FormData) -> ApiResult<Update> {
    let mut update = Update::new();
    if form.has("name") {
        update = update.set("name", form.required("name")?);
    }
    if let Some(p) = price(form)? {
        update = update.set("price", p);
    }
    if let Some(s) = stock(form)? {
        update = update.set("stock", s);
    }
    Ok(update)
}

pub async fn create_merch(
    req: HttpRequest,
    path: web::Path<String>,
    payload: web::Payload,
    user: AuthUser,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let event_id = path.into_inner();
    checked_id(&event_id)?;

    let store = state.store.as_ref();
    resource::load_owned::<Event>(store, &event_id, &user.user_id).await?;

    let form = FormData::read(req.headers(), payload).await?;
    let mut merch = Merch {
        merch_id: generate_id(MERCH_ID_LENGTH),
        event_id,
        name: form.required("name")?,
        price: price(&form)?.ok_or_else(|| ApiError::bad_request("price is required"))?,
        stock: stock(&form)?.ok_or_else(|| ApiError::bad_request("stock is required"))?,
        merch_pic: String::new(),
    };

    if let Some(image) = form.file(&["image"]) {
        merch.merch_pic = state.assets.store(AssetKind::MerchPicture, &merch.merch_id, image).await?;
    }

    resource::insert(store, &merch).await?;
    log::info!("User {} added merch {} to event {}", user.user_id, merch.merch_id, merch.event_id);

    Ok(HttpResponse::Created().json(merch))
}

pub async fn list_merch(path: web::Path<String>, state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let event_id = path.into_inner();
    checked_id(&event_id)?;

    let items: Vec<Merch> =
        resource::find_all(state.store.as_ref(), &Filter::new().eq("eventid", event_id.as_str())).await?;
    Ok(HttpResponse::Ok().json(items))
}

pub async fn get_merch(path: web::Path<(String, String)>, state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let (event_id, merch_id) = path.into_inner();
    checked_id(&event_id)?;
    checked_id(&merch_id)?;

    let merch: Merch = resource::load_where(state.store.as_ref(), &scoped(&event_id, &merch_id)).await?;
    Ok(HttpResponse::Ok().json(merch))
}

pub async fn edit_merch(
    req: HttpRequest,
    path: web::Path<(String, String)>,
    payload: web::Payload,
    user: AuthUser,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let (event_id, merch_id) = path.into_inner();
    checked_id(&event_id)?;
    checked_id(&merch_id)?;

    let store = state.store.as_ref();
    resource::load_owned::<Event>(store, &event_id, &user.user_id).await?;
    resource::load_where::<Merch>(store, &scoped(&event_id, &merch_id)).await?;

    let form = FormData::read(req.headers(), payload).await?;
    let mut update = changes(&form)?;

    if let Some(image) = form.file(&["image"]) {
        let path = state.assets.store(AssetKind::MerchPicture, &merch_id, image).await?;
        update = update.set("merch_pic", path);
    }

    let merged: Merch = resource::patch_where(store, &scoped(&event_id, &merch_id), &update).await?;
    Ok(HttpResponse::Ok().json(merged))
}

pub async fn delete_merch(
    path: web::Path<(String, String)>,
    user: AuthUser,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let (event_id, merch_id) = path.into_inner();
    checked_id(&event_id)?;
    checked_id(&merch_id)?;

    let store = state.store.as_ref();
    resource::load_owned::<Event>(store, &event_id, &user.user_id).await?;

    let filter = scoped(&event_id, &merch_id);
    let merch: Merch = resource::load_where(store, &filter).await?;
    resource::remove_where::<Merch>(store, &filter).await?;
    if !merch.merch_pic.is_empty() {
        state.assets.remove(&merch.merch_pic).await?;
    }

    log::info!("User {} deleted merch {}", user.user_id, merch_id);
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Merch deleted successfully",
    })))
}

pub async fn buy_merch(
    req: HttpRequest,
    path: web::Path<(String, String)>,
    payload: web::Payload,
    user: AuthUser,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let (event_id, merch_id) = path.into_inner();
    checked_id(&event_id)?;
    checked_id(&merch_id)?;

    let form = FormData::read(req.headers(), payload).await?;
    let quantity = requested_quantity(&form)?;

    let merch: Merch = resource::purchase(state.store.as_ref(), &scoped(&event_id, &merch_id), quantity).await?;
    log::info!("User {} bought {} x merch {}", user.user_id, quantity, merch_id);

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Merch purchased successfully",
        "remaining": merch.stock(),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantity_is_accepted_as_stock() {
        let form = FormData::from_json(serde_json::json!({ "quantity": "12" })).unwrap();

        assert_eq!(stock(&form).unwrap(), Some(12));
    }
}
