use std::collections::BTreeMap;

use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;

use crate::auth::{client_address, AuthUser};
use crate::config::*;
use crate::core::assets::AssetKind;
use crate::core::errors::{ApiError, ApiResult};
use crate::core::form::FormData;
use crate::core::helpers::{generate_user_id, hash_password, now_iso, sanitize_text};
use crate::core::resource::{self, Document};
use crate::core::store::{DocumentStore, Filter, Update};
use crate::models::{Preferences, Profile, PublicProfile, User};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct Registration {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
}

fn validate_username(username: &str) -> ApiResult<()> {
    let len = username.chars().count();
    if username.is_empty() {
        return Err(ApiError::bad_request("Username is required"));
    }
    if !(MIN_USERNAME_LENGTH..=MAX_USERNAME_LENGTH).contains(&len) {
        return Err(ApiError::bad_request(format!(
            "Username must be {}-{} characters",
            MIN_USERNAME_LENGTH, MAX_USERNAME_LENGTH
        )));
    }
    if username.contains(char::is_whitespace) || username.contains('/') {
        return Err(ApiError::bad_request("Username may not contain spaces or slashes"));
    }
    Ok(())
}

fn validate_password(password: &str) -> ApiResult<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::bad_request(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

async fn username_taken(store: &dyn DocumentStore, username: &str, except: Option<&str>) -> ApiResult<bool> {
    let mut filter = Filter::new().eq("username", username);
    if let Some(user_id) = except {
        filter = filter.ne(User::ID_FIELD, user_id);
    }
    Ok(store.find_one(User::COLLECTION, &filter).await?.is_some())
}

pub async fn register(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<Registration>,
) -> ApiResult<HttpResponse> {
    state.limiter.check(&client_address(&req))?;

    let input = body.into_inner();
    let username = sanitize_text(&input.username);
    validate_username(&username)?;
    validate_password(&input.password)?;

    let store = state.store.as_ref();
    if username_taken(store, &username, None).await? {
        return Err(ApiError::Conflict("Username already exists".to_string()));
    }

    let now = now_iso();
    let user = User {
        user_id: generate_user_id(),
        username,
        email: sanitize_text(&input.email),
        name: sanitize_text(&input.name),
        password: hash_password(&input.password)?,
        role: "user".to_string(),
        preferences: Preferences {
            theme: "light".to_string(),
            notification_email: true,
        },
        is_active: true,
        created_at: now.clone(),
        updated_at: now,
        ..Default::default()
    };

    // The unique index still catches a concurrent registration of the same name.
    resource::insert(store, &user).await?;
    log::info!("Registered user {} ({})", user.username, user.user_id);

    Ok(HttpResponse::Created().json(serde_json::json!({})))
}

pub async fn get_profile(user: AuthUser, state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let stored: User = resource::load(state.store.as_ref(), &user.user_id).await?;
    Ok(HttpResponse::Ok().json(Profile::from(stored)))
}

/// Partial profile update: only fields present in the form change.
pub async fn edit_profile(
    req: HttpRequest,
    payload: web::Payload,
    user: AuthUser,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let form = FormData::read(req.headers(), payload).await?;
    let store = state.store.as_ref();
    let mut update = Update::new();

    if let Some(username) = form.clean("username") {
        validate_username(&username)?;
        if username_taken(store, &username, Some(&user.user_id)).await? {
            return Err(ApiError::Conflict("Username already exists".to_string()));
        }
        update = update.set("username", username);
    }

    if let Some(bio) = form.clean("bio") {
        if bio.chars().count() > MAX_BIO_LENGTH {
            return Err(ApiError::bad_request(format!("Bio too long (max {} chars)", MAX_BIO_LENGTH)));
        }
        update = update.set("bio", bio);
    }

    for field in ["email", "name", "phone_number", "address"] {
        if let Some(value) = form.clean(field) {
            update = update.set(field, value);
        }
    }

    if let Some(links) = form.json::<BTreeMap<String, String>>("social_links")? {
        let links: BTreeMap<String, String> = links
            .into_iter()
            .map(|(k, v)| (sanitize_text(&k), sanitize_text(&v)))
            .filter(|(k, _)| !k.is_empty())
            .collect();
        update = update.set("social_links", serde_json::to_value(links).map_err(anyhow::Error::from)?);
    }

    if let Some(password) = form.text("password").filter(|p| !p.is_empty()) {
        validate_password(password)?;
        update = update.set("password", hash_password(password)?);
    }

    if let Some(picture) = form.file(&["profile_picture"]) {
        let path = state.assets.store(AssetKind::UserPicture, &user.user_id, picture).await?;
        update = update.set("profile_picture", path);
    }

    if !update.is_empty() {
        update = update.set("updated_at", now_iso());
    }

    let merged: User = resource::patch(store, &user.user_id, &update).await?;
    log::info!("User {} updated their profile", merged.user_id);

    Ok(HttpResponse::Ok().json(Profile::from(merged)))
}

/// Deletes the caller and removes them from every follow list.
pub async fn delete_profile(user: AuthUser, state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let store = state.store.as_ref();
    let stored: User = resource::load(store, &user.user_id).await?;

    resource::remove_where::<User>(store, &User::by_id(&stored.user_id)).await?;

    let detach = Update::new()
        .pull("follows", stored.user_id.as_str())
        .pull("followers", stored.user_id.as_str());
    store.update_many(User::COLLECTION, &Filter::new(), &detach).await?;

    if !stored.profile_picture.is_empty() {
        state.assets.remove(&stored.profile_picture).await?;
    }

    log::info!("Deleted user {} ({})", stored.username, stored.user_id);
    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Deletion successful" })))
}

/// Public profile by username. `is_following` reflects the viewer, if any.
pub async fn get_user_profile(
    path: web::Path<String>,
    viewer: Option<AuthUser>,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let store = state.store.as_ref();
    let username = path.into_inner();

    let target: User = resource::load_where(store, &Filter::new().eq("username", username.as_str())).await?;
    let viewer: Option<User> = match viewer {
        Some(v) => resource::find_one(store, &User::by_id(&v.user_id)).await?,
        None => None,
    };

    Ok(HttpResponse::Ok().json(PublicProfile::new(target, viewer.as_ref())))
}
