use std::collections::BTreeMap;

use actix_web::{web, HttpRequest, HttpResponse};

use crate::auth::AuthUser;
use crate::config::{MAX_DESCRIPTION_LENGTH, MAX_TITLE_LENGTH};
use crate::core::assets::AssetKind;
use crate::core::errors::{ApiError, ApiResult};
use crate::core::form::FormData;
use crate::core::helpers::{checked_id, generate_id, now_iso, sanitize_text, PLACE_ID_LENGTH};
use crate::core::query_params::{equality_filter, parse_query_params};
use crate::core::resource::{self, Document};
use crate::core::store::{StoreError, Update};
use crate::models::{Category, Coordinates, Place, PlaceStatus};
use crate::AppState;

const REQUIRED_FIELDS: [&str; 3] = ["name", "address", "description"];
const TEXT_FIELDS: [&str; 5] = ["city", "country", "zipCode", "phone", "website"];
const LIST_FIELDS: [&str; 4] = ["tags", "amenities", "operatinghours", "keywords"];

fn to_value<T: serde::Serialize>(value: &T) -> ApiResult<serde_json::Value> {
    Ok(serde_json::to_value(value).map_err(StoreError::from)?)
}

/// `category` may be a JSON object or just the main category name.
fn category(form: &FormData) -> ApiResult<Option<Category>> {
    let Some(raw) = form.text("category") else {
        return Ok(None);
    };

    if raw.trim_start().starts_with('{') {
        let mut parsed: Category = form
            .json::<Category>("category")?
            .ok_or_else(|| ApiError::bad_request("Invalid category value"))?;
        parsed.main_category = sanitize_text(&parsed.main_category);
        parsed.sub_categories = parsed
            .sub_categories
            .iter()
            .map(|s| sanitize_text(s))
            .filter(|s| !s.is_empty())
            .collect();
        return Ok(Some(parsed));
    }

    Ok(Some(Category {
        main_category: sanitize_text(raw),
        sub_categories: form.list("subCategories").unwrap_or_default(),
    }))
}

fn coordinates(form: &FormData) -> ApiResult<Option<Coordinates>> {
    if let Some(coords) = form.json::<Coordinates>("coordinates")? {
        return Ok(Some(coords));
    }

    match (form.number("latitude")?, form.number("longitude")?) {
        (Some(latitude), Some(longitude)) => Ok(Some(Coordinates { latitude, longitude })),
        (None, None) => Ok(None),
        _ => Err(ApiError::bad_request("Both latitude and longitude are required")),
    }
}

/// Fields present in `form`, validated and sanitized.
fn changes(form: &FormData) -> ApiResult<Update> {
    let mut update = Update::new();

    for field in REQUIRED_FIELDS {
        if form.has(field) {
            update = update.set(field, form.required(field)?);
        }
    }

    for field in TEXT_FIELDS {
        if let Some(value) = form.clean(field) {
            update = update.set(field, value);
        }
    }

    for field in LIST_FIELDS {
        if let Some(items) = form.list(field) {
            update = update.set(field, items);
        }
    }

    if let Some(capacity) = form.integer("capacity")? {
        if capacity < 0 {
            return Err(ApiError::bad_request("Capacity cannot be negative"));
        }
        update = update.set("capacity", capacity);
    }

    if let Some(is_open) = form.boolean("isopen")? {
        update = update.set("isopen", is_open);
    }

    if let Some(status) = form.text("status") {
        let status: PlaceStatus = status.parse().map_err(ApiError::BadRequest)?;
        update = update.set("status", status.as_str());
    }

    if let Some(category) = category(form)? {
        update = update.set("category", to_value(&category)?);
    }

    if let Some(coords) = coordinates(form)? {
        update = update.set("coordinates", to_value(&coords)?);
    }

    if let Some(links) = form.json::<BTreeMap<String, String>>("socialLinks")? {
        update = update.set("socialLinks", to_value(&links)?);
    }

    Ok(update)
}

fn merge(base: &Place, update: &Update) -> ApiResult<Place> {
    let mut doc = to_value(base)?;
    update.apply(&mut doc)?;
    let place: Place = serde_json::from_value(doc).map_err(StoreError::from)?;

    if place.name.chars().count() > MAX_TITLE_LENGTH {
        return Err(ApiError::bad_request(format!("Name too long (max {} chars)", MAX_TITLE_LENGTH)));
    }
    if place.description.chars().count() > MAX_DESCRIPTION_LENGTH {
        return Err(ApiError::bad_request(format!(
            "Description too long (max {} chars)",
            MAX_DESCRIPTION_LENGTH
        )));
    }
    Ok(place)
}

pub async fn list_places(req: HttpRequest, state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let params = parse_query_params(req.query_string());
    let filter = equality_filter(&params, &[("city", "city"), ("createdBy", "createdBy")]);

    let places: Vec<Place> = resource::find_all(state.store.as_ref(), &filter).await?;
    Ok(HttpResponse::Ok().json(places))
}

pub async fn create_place(
    req: HttpRequest,
    payload: web::Payload,
    user: AuthUser,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let form = FormData::read(req.headers(), payload).await?;
    for field in REQUIRED_FIELDS {
        form.required(field)?;
    }

    let now = now_iso();
    let base = Place {
        place_id: generate_id(PLACE_ID_LENGTH),
        created_by: user.user_id.clone(),
        updated_by: user.user_id.clone(),
        created_at: now.clone(),
        updated_at: now,
        ..Default::default()
    };
    let mut place = merge(&base, &changes(&form)?)?;

    if let Some(banner) = form.file(&["banner"]) {
        place.banner = state.assets.store(AssetKind::PlaceBanner, &place.place_id, banner).await?;
    }

    resource::insert(state.store.as_ref(), &place).await?;
    log::info!("User {} created place {}", user.user_id, place.place_id);

    Ok(HttpResponse::Created().json(place))
}

pub async fn get_place(path: web::Path<String>, state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let place_id = path.into_inner();
    checked_id(&place_id)?;

    let place: Place = resource::load(state.store.as_ref(), &place_id).await?;
    Ok(HttpResponse::Ok().json(place))
}

pub async fn edit_place(
    req: HttpRequest,
    path: web::Path<String>,
    payload: web::Payload,
    user: AuthUser,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let place_id = path.into_inner();
    checked_id(&place_id)?;

    let store = state.store.as_ref();
    let current: Place = resource::load_owned(store, &place_id, &user.user_id).await?;

    let form = FormData::read(req.headers(), payload).await?;
    let mut update = changes(&form)?;
    merge(&current, &update)?;

    if let Some(banner) = form.file(&["banner"]) {
        let path = state.assets.store(AssetKind::PlaceBanner, &place_id, banner).await?;
        update = update.set("banner", path);
    }

    if !update.is_empty() {
        update = update
            .set("updatedBy", user.user_id.as_str())
            .set("updated", now_iso());
    }

    let merged: Place = resource::patch(store, &place_id, &update).await?;
    Ok(HttpResponse::Ok().json(merged))
}

pub async fn delete_place(
    path: web::Path<String>,
    user: AuthUser,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let place_id = path.into_inner();
    checked_id(&place_id)?;

    let store = state.store.as_ref();
    let place: Place = resource::load_owned(store, &place_id, &user.user_id).await?;
    resource::remove_where::<Place>(store, &Place::by_id(&place_id)).await?;

    if !place.banner.is_empty() {
        state.assets.remove(&place.banner).await?;
    }

    log::info!("User {} deleted place {}", user.user_id, place_id);
    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Place deleted successfully" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_category_becomes_main_category() {
        let form = FormData::from_json(serde_json::json!({
            "category": "Music venue",
            "subCategories": "jazz,blues"
        }))
        .unwrap();

        let parsed = category(&form).unwrap().unwrap();
        assert_eq!(parsed.main_category, "Music venue");
        assert_eq!(parsed.sub_categories, vec!["jazz", "blues"]);
    }

    #[test]
    fn structured_fields_are_validated() {
        let bad_status = FormData::from_json(serde_json::json!({ "status": "demolished" })).unwrap();
        let half_coords = FormData::from_json(serde_json::json!({ "latitude": 1.5 })).unwrap();
        let negative = FormData::from_json(serde_json::json!({ "capacity": -4 })).unwrap();

        assert!(changes(&bad_status).is_err());
        assert!(changes(&half_coords).is_err());
        assert!(changes(&negative).is_err());
    }

    #[test]
    fn coordinates_accept_an_object() {
        let form = FormData::from_json(serde_json::json!({
            "coordinates": { "latitude": 52.5, "longitude": 13.4 }
        }))
        .unwrap();

        let update = changes(&form).unwrap();
        let mut doc = serde_json::json!({});
        update.apply(&mut doc).unwrap();
        assert_eq!(doc["coordinates"]["latitude"], 52.5);
    }
}
