use actix_web::{web, HttpRequest, HttpResponse};

use crate::auth::AuthUser;
use crate::core::assets::AssetKind;
use crate::core::errors::{ApiError, ApiResult};
use crate::core::form::FormData;
use crate::core::helpers::{checked_id, generate_id, now_iso, MEDIA_ID_LENGTH};
use crate::core::resource;
use crate::core::store::Filter;
use crate::models::{Event, Media, MediaKind};
use crate::AppState;

fn scoped(event_id: &str, media_id: &str) -> Filter {
    Filter::new().eq("eventid", event_id).eq("id", media_id)
}

pub async fn add_media(
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
    let file = form
        .file(&["media"])
        .ok_or_else(|| ApiError::bad_request("media file is required"))?;
    let kind = MediaKind::parse(form.text("type").unwrap_or_default())
        .ok_or_else(|| ApiError::bad_request("type must be image, video or photo360"))?;

    let id = generate_id(MEDIA_ID_LENGTH);
    let url = state.assets.store(AssetKind::Media, &id, file).await?;

    let media = Media {
        id,
        event_id,
        kind,
        url,
        caption: form.clean("caption").unwrap_or_default(),
        description: form.clean("description").unwrap_or_default(),
        creator_id: user.user_id.clone(),
        created_at: now_iso(),
    };

    resource::insert(store, &media).await?;
    log::info!("User {} uploaded media {} to event {}", user.user_id, media.id, media.event_id);

    Ok(HttpResponse::Created().json(media))
}

pub async fn list_media(path: web::Path<String>, state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let event_id = path.into_inner();
    checked_id(&event_id)?;

    let items: Vec<Media> =
        resource::find_all(state.store.as_ref(), &Filter::new().eq("eventid", event_id.as_str())).await?;
    Ok(HttpResponse::Ok().json(items))
}

pub async fn get_media(path: web::Path<(String, String)>, state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let (event_id, media_id) = path.into_inner();
    checked_id(&event_id)?;
    checked_id(&media_id)?;

    let media: Media = resource::load_where(state.store.as_ref(), &scoped(&event_id, &media_id)).await?;
    Ok(HttpResponse::Ok().json(media))
}

pub async fn delete_media(
    path: web::Path<(String, String)>,
    user: AuthUser,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let (event_id, media_id) = path.into_inner();
    checked_id(&event_id)?;
    checked_id(&media_id)?;

    let store = state.store.as_ref();
    resource::load_owned::<Event>(store, &event_id, &user.user_id).await?;

    let filter = scoped(&event_id, &media_id);
    let media: Media = resource::load_where(store, &filter).await?;
    resource::remove_where::<Media>(store, &filter).await?;
    state.assets.remove(&media.url).await?;

    log::info!("User {} deleted media {}", user.user_id, media_id);
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Media deleted successfully",
    })))
}
