use actix_web::{web, HttpResponse};

use crate::auth::AuthUser;
use crate::core::errors::{ApiError, ApiResult};
use crate::core::helpers::checked_id;
use crate::core::resource::{self, Document};
use crate::core::store::{DocumentStore, Filter, Update};
use crate::models::{User, UserSummary};
use crate::AppState;

/// Flips the `follower -> target` edge and returns whether it now exists.
///
/// Each side is one atomic set operation on its own document; the two
/// writes are not atomic together. Set semantics make a retried toggle
/// converge instead of duplicating ids.
pub async fn toggle_follow(store: &dyn DocumentStore, follower_id: &str, target_id: &str) -> ApiResult<bool> {
    if follower_id == target_id {
        return Err(ApiError::bad_request("You cannot follow yourself"));
    }

    let follower: User = resource::load(store, follower_id).await?;
    if store.find_one(User::COLLECTION, &User::by_id(target_id)).await?.is_none() {
        return Err(ApiError::not_found("Target user not found"));
    }

    let now_following = !follower.is_following(target_id);
    let (ours, theirs) = if now_following {
        (
            Update::new().add_to_set("follows", target_id),
            Update::new().add_to_set("followers", follower_id),
        )
    } else {
        (
            Update::new().pull("follows", target_id),
            Update::new().pull("followers", follower_id),
        )
    };

    store.update_one(User::COLLECTION, &User::by_id(follower_id), &ours).await?;
    store.update_one(User::COLLECTION, &User::by_id(target_id), &theirs).await?;

    Ok(now_following)
}

pub async fn handle_toggle(
    path: web::Path<String>,
    user: AuthUser,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let target_id = path.into_inner();
    checked_id(&target_id)?;

    let is_following = toggle_follow(state.store.as_ref(), &user.user_id, &target_id).await?;
    log::info!(
        "User {} {} {}",
        user.user_id,
        if is_following { "followed" } else { "unfollowed" },
        target_id
    );

    Ok(HttpResponse::Ok().json(serde_json::json!({ "isFollowing": is_following })))
}

async fn summaries(store: &dyn DocumentStore, ids: &[String]) -> ApiResult<Vec<UserSummary>> {
    let mut users = Vec::with_capacity(ids.len());
    for id in ids {
        // Dangling ids are left behind by interrupted toggles; skip them.
        if let Some(user) = resource::find_one::<User>(store, &User::by_id(id)).await? {
            users.push(UserSummary::from(user));
        }
    }
    Ok(users)
}

pub async fn get_followers(user: AuthUser, state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let store = state.store.as_ref();
    let me: User = resource::load(store, &user.user_id).await?;
    Ok(HttpResponse::Ok().json(summaries(store, &me.followers).await?))
}

pub async fn get_following(user: AuthUser, state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let store = state.store.as_ref();
    let me: User = resource::load(store, &user.user_id).await?;
    Ok(HttpResponse::Ok().json(summaries(store, &me.follows).await?))
}

/// Every other user the caller does not follow yet.
pub async fn get_suggestions(user: AuthUser, state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let store = state.store.as_ref();
    let me: User = resource::load(store, &user.user_id).await?;

    let others: Vec<User> = resource::find_all(store, &Filter::new().ne(User::ID_FIELD, me.user_id.as_str())).await?;
    let suggestions: Vec<UserSummary> = others
        .into_iter()
        .filter(|other| !me.is_following(&other.user_id))
        .map(UserSummary::from)
        .collect();

    Ok(HttpResponse::Ok().json(suggestions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::MemoryStore;

    async fn user(store: &MemoryStore, id: &str) {
        let user = User {
            user_id: id.to_string(),
            username: id.to_string(),
            ..Default::default()
        };
        resource::insert(store, &user).await.unwrap();
    }

    #[actix_web::test]
    async fn toggle_twice_restores_both_sides() {
        let store = MemoryStore::new();
        user(&store, "ua").await;
        user(&store, "ub").await;

        assert!(toggle_follow(&store, "ua", "ub").await.unwrap());
        let a: User = resource::load(&store, "ua").await.unwrap();
        let b: User = resource::load(&store, "ub").await.unwrap();
        assert_eq!(a.follows, vec!["ub"]);
        assert_eq!(b.followers, vec!["ua"]);

        assert!(!toggle_follow(&store, "ua", "ub").await.unwrap());
        let a: User = resource::load(&store, "ua").await.unwrap();
        let b: User = resource::load(&store, "ub").await.unwrap();
        assert!(a.follows.is_empty());
        assert!(b.followers.is_empty());
    }

    #[actix_web::test]
    async fn self_and_unknown_targets_are_rejected() {
        let store = MemoryStore::new();
        user(&store, "ua").await;

        assert!(matches!(toggle_follow(&store, "ua", "ua").await, Err(ApiError::BadRequest(_))));
        assert!(matches!(toggle_follow(&store, "ua", "ghost").await, Err(ApiError::NotFound(_))));
    }
}
