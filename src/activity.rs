use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;

use crate::auth::{client_address, AuthUser};
use crate::core::errors::{ApiError, ApiResult};
use crate::core::helpers::{generate_id, now_iso, sanitize_text, ACTIVITY_ID_LENGTH};
use crate::core::resource;
use crate::core::store::Filter;
use crate::models::Activity;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ActivityInput {
    pub place_id: String,
    pub action: String,
    pub performed_by: String,
    pub details: String,
    pub device_info: String,
}

/// Appends an entry to the caller's log. Owner and time are always set
/// server-side.
pub async fn log_activity(
    req: HttpRequest,
    user: AuthUser,
    state: web::Data<AppState>,
    body: web::Json<ActivityInput>,
) -> ApiResult<HttpResponse> {
    let input = body.into_inner();
    let action = sanitize_text(&input.action);
    if action.is_empty() {
        return Err(ApiError::bad_request("action is required"));
    }

    let entry = Activity {
        activity_id: generate_id(ACTIVITY_ID_LENGTH),
        username: user.username.clone(),
        place_id: sanitize_text(&input.place_id),
        action,
        performed_by: sanitize_text(&input.performed_by),
        timestamp: now_iso(),
        details: sanitize_text(&input.details),
        ip_address: client_address(&req),
        device_info: sanitize_text(&input.device_info),
    };

    resource::insert(state.store.as_ref(), &entry).await?;
    Ok(HttpResponse::Created().json(entry))
}

/// The caller's entries, newest first.
pub async fn get_activity_feed(user: AuthUser, state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let mut entries: Vec<Activity> =
        resource::find_all(state.store.as_ref(), &Filter::new().eq("username", user.username.as_str())).await?;

    // Stored in insertion order; reversing first keeps same-instant entries newest first.
    entries.reverse();
    entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    Ok(HttpResponse::Ok().json(entries))
}
