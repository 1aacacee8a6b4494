use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::auth::AuthUser;
use crate::config::{MAX_DESCRIPTION_LENGTH, MAX_TITLE_LENGTH};
use crate::core::assets::AssetKind;
use crate::core::errors::{ApiError, ApiResult};
use crate::core::form::FormData;
use crate::core::helpers::{checked_id, generate_id, now_iso, sanitize_text, EVENT_ID_LENGTH, REVIEW_ID_LENGTH};
use crate::core::query_params::{equality_filter, parse_query_params};
use crate::core::resource::{self, Document};
use crate::core::store::{DocumentStore, Filter, StoreError, Update};
use crate::models::{Event, Media, Merch, Review, Ticket};
use crate::AppState;

const BANNER_FIELDS: [&str; 2] = ["banner", "event-banner"];

const TEXT_FIELDS: [&str; 11] = [
    "description",
    "place",
    "date",
    "organizer_name",
    "organizer_contact",
    "start_date_time",
    "end_date_time",
    "category",
    "website_url",
    "status",
    "accessibility_info",
];

const LIST_FIELDS: [&str; 2] = ["tags", "social_media_links"];

/// Fields present in `form`, validated and sanitized.
fn changes(form: &FormData) -> ApiResult<Update> {
    let mut update = Update::new();

    for required in ["title", "location"] {
        if form.has(required) {
            update = update.set(required, form.required(required)?);
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

    if let Some(custom) = form.json::<Map<String, Value>>("custom_fields")? {
        update = update.set("custom_fields", Value::Object(custom));
    }

    Ok(update)
}

/// `base` with `update` applied, checked against the length limits.
fn merge(base: &Event, update: &Update) -> ApiResult<Event> {
    let mut doc = serde_json::to_value(base).map_err(StoreError::from)?;
    update.apply(&mut doc)?;
    let event: Event = serde_json::from_value(doc).map_err(StoreError::from)?;

    if event.title.chars().count() > MAX_TITLE_LENGTH {
        return Err(ApiError::bad_request(format!("Title too long (max {} chars)", MAX_TITLE_LENGTH)));
    }
    if event.description.chars().count() > MAX_DESCRIPTION_LENGTH {
        return Err(ApiError::bad_request(format!(
            "Description too long (max {} chars)",
            MAX_DESCRIPTION_LENGTH
        )));
    }
    Ok(event)
}

pub async fn list_events(req: HttpRequest, state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let params = parse_query_params(req.query_string());
    let filter = equality_filter(
        &params,
        &[("category", "category"), ("creator", "creatorid"), ("status", "status")],
    );

    let events: Vec<Event> = resource::find_all(state.store.as_ref(), &filter).await?;
    Ok(HttpResponse::Ok().json(events))
}

pub async fn create_event(
    req: HttpRequest,
    payload: web::Payload,
    user: AuthUser,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let mut form = FormData::read(req.headers(), payload).await?;
    form.merge_embedded("event")?;

    let title = form.required("title")?;
    let location = form.required("location")?;

    let now = now_iso();
    let base = Event {
        event_id: generate_id(EVENT_ID_LENGTH),
        title,
        location,
        creator_id: user.user_id.clone(),
        created_at: now.clone(),
        updated_at: now,
        ..Default::default()
    };

    let mut event = merge(&base, &changes(&form)?)?;

    if let Some(banner) = form.file(&BANNER_FIELDS) {
        event.banner_image = state.assets.store(AssetKind::EventBanner, &event.event_id, banner).await?;
    }

    resource::insert(state.store.as_ref(), &event).await?;
    log::info!("User {} created event {}", user.user_id, event.event_id);

    Ok(HttpResponse::Created().json(event))
}

/// The event with its tickets, media and merch merged in from their own
/// collections.
pub async fn get_event(path: web::Path<String>, state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let event_id = path.into_inner();
    checked_id(&event_id)?;

    let store = state.store.as_ref();
    let mut event: Event = resource::load(store, &event_id).await?;
    let children = Filter::new().eq("eventid", event_id.as_str());

    event.tickets.extend(resource::find_all::<Ticket>(store, &children).await?);
    event.media.extend(resource::find_all::<Media>(store, &children).await?);
    event.merch.extend(resource::find_all::<Merch>(store, &children).await?);

    Ok(HttpResponse::Ok().json(event))
}

pub async fn edit_event(
    req: HttpRequest,
    path: web::Path<String>,
    payload: web::Payload,
    user: AuthUser,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let event_id = path.into_inner();
    checked_id(&event_id)?;

    let store = state.store.as_ref();
    let current: Event = resource::load_owned(store, &event_id, &user.user_id).await?;

    let mut form = FormData::read(req.headers(), payload).await?;
    form.merge_embedded("event")?;
    let mut update = changes(&form)?;
    merge(&current, &update)?;

    if let Some(banner) = form.file(&BANNER_FIELDS) {
        let path = state.assets.store(AssetKind::EventBanner, &event_id, banner).await?;
        update = update.set("banner_image", path);
    }

    if !update.is_empty() {
        update = update.set("updated_at", now_iso());
    }

    let merged: Event = resource::patch(store, &event_id, &update).await?;

    Ok(HttpResponse::Ok().json(merged))
}

/// Deletes the event together with its tickets, merch and media.
pub async fn delete_event(
    path: web::Path<String>,
    user: AuthUser,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let event_id = path.into_inner();
    checked_id(&event_id)?;

    let store = state.store.as_ref();
    let event: Event = resource::load_owned(store, &event_id, &user.user_id).await?;
    let children = Filter::new().eq("eventid", event_id.as_str());

    let media: Vec<Media> = resource::find_all(store, &children).await?;
    let merch: Vec<Merch> = resource::find_all(store, &children).await?;

    resource::remove_where::<Event>(store, &Event::by_id(&event_id)).await?;
    store.delete_many(Ticket::COLLECTION, &children).await?;
    store.delete_many(Merch::COLLECTION, &children).await?;
    store.delete_many(Media::COLLECTION, &children).await?;

    let files = media
        .iter()
        .map(|m| m.url.as_str())
        .chain(merch.iter().map(|m| m.merch_pic.as_str()))
        .chain(std::iter::once(event.banner_image.as_str()))
        .filter(|path| !path.is_empty());
    for file in files {
        state.assets.remove(file).await?;
    }

    log::info!("User {} deleted event {}", user.user_id, event_id);
    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Event deleted successfully" })))
}

#[derive(Debug, Deserialize)]
pub struct ReviewInput {
    #[serde(default)]
    pub rating: i64,
    #[serde(default)]
    pub comment: String,
}

pub async fn add_review(
    path: web::Path<String>,
    user: AuthUser,
    state: web::Data<AppState>,
    body: web::Json<ReviewInput>,
) -> ApiResult<HttpResponse> {
    let event_id = path.into_inner();
    checked_id(&event_id)?;

    let input = body.into_inner();
    if !(1..=5).contains(&input.rating) {
        return Err(ApiError::bad_request("Rating must be between 1 and 5"));
    }
    let comment = sanitize_text(&input.comment);
    if comment.chars().count() > MAX_DESCRIPTION_LENGTH {
        return Err(ApiError::bad_request("Comment too long"));
    }

    let now = now_iso();
    let review = Review {
        review_id: generate_id(REVIEW_ID_LENGTH),
        event_id: event_id.clone(),
        user_id: user.user_id.clone(),
        rating: input.rating,
        comment,
        date: now.chars().take(10).collect(),
        created_at: now,
    };

    let entry = serde_json::to_value(&review).map_err(StoreError::from)?;
    let store: &dyn DocumentStore = state.store.as_ref();
    if !store
        .update_one(Event::COLLECTION, &Event::by_id(&event_id), &Update::new().push("reviews", entry))
        .await?
    {
        return Err(ApiError::not_found("Event not found"));
    }

    log::info!("User {} reviewed event {}", user.user_id, event_id);
    Ok(HttpResponse::Created().json(review))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_fields_produce_no_changes() {
        let form = FormData::from_json(serde_json::json!({ "title": "New" })).unwrap();
        let update = changes(&form).unwrap();

        assert_eq!(update.fields().collect::<Vec<_>>(), vec!["title"]);
    }

    #[test]
    fn required_fields_cannot_be_blanked() {
        let form = FormData::from_json(serde_json::json!({ "location": "  " })).unwrap();

        assert!(matches!(changes(&form), Err(ApiError::BadRequest(_))));
    }
}
