use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::{web, FromRequest, HttpRequest, HttpResponse};
use futures_util::future::LocalBoxFuture;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::errors::{ApiError, ApiResult};
use crate::core::helpers::{now_iso, verify_password};
use crate::core::resource::{self, Document};
use crate::core::store::{DocumentStore, Filter, Update};
use crate::models::User;
use crate::AppState;

const BEARER_PREFIX: &str = "Bearer ";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub username: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

/// Issues and verifies HS256 identity tokens.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl_seconds: i64,
}

impl TokenService {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl_seconds: ttl_hours * 3600,
        }
    }

    pub fn issue(&self, username: &str, user_id: &str) -> ApiResult<String> {
        self.issue_at(username, user_id, chrono::Utc::now().timestamp())
    }

    fn issue_at(&self, username: &str, user_id: &str, issued_at: i64) -> ApiResult<String> {
        let claims = Claims {
            username: username.to_string(),
            user_id: user_id.to_string(),
            iat: issued_at,
            exp: issued_at + self.ttl_seconds,
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ApiError::internal("Failed to sign token", e))
    }

    pub fn verify(&self, token: &str) -> ApiResult<Claims> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                log::warn!("Rejected token: {}", e);
                ApiError::Unauthorized("Invalid or expired token".to_string())
            })
    }
}

/// The verified caller of a protected route.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub username: String,
}

fn bearer_token(req: &HttpRequest) -> ApiResult<String> {
    let value = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing authorization header".to_string()))?;

    match value.strip_prefix(BEARER_PREFIX) {
        Some(token) if value.len() >= 8 => Ok(token.trim().to_string()),
        _ => Err(ApiError::Unauthorized("Invalid authorization header".to_string())),
    }
}

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let state = req.app_data::<web::Data<AppState>>().cloned();
        let token = bearer_token(req);

        Box::pin(async move {
            let state = state.ok_or_else(|| ApiError::internal("Application state missing", "AppState not registered"))?;
            let claims = state.tokens.verify(&token?)?;

            // Tokens outlive deleted accounts and renames; the stored record wins.
            let stored = resource::find_one::<User>(state.store.as_ref(), &User::by_id(&claims.user_id)).await?;
            let Some(stored) = stored else {
                log::warn!("Token presented for deleted user {}", claims.user_id);
                return Err(ApiError::unauthorized());
            };

            Ok(AuthUser {
                user_id: stored.user_id,
                username: stored.username,
            })
        })
    }
}

/// Address of the connected socket. Forwarding headers are ignored since any
/// client can set them.
pub fn client_address(req: &HttpRequest) -> String {
    req.peer_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[derive(Debug, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

pub async fn login(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<Credentials>,
) -> ApiResult<HttpResponse> {
    state.limiter.check(&client_address(&req))?;

    let creds = body.into_inner();
    let store = state.store.as_ref();

    let user = resource::find_one::<User>(store, &Filter::new().eq("username", creds.username.trim())).await?;
    let user = match user {
        Some(u) if verify_password(&creds.password, &u.password) => u,
        _ => {
            log::info!("Failed login for {}", creds.username);
            return Err(ApiError::Unauthorized("Invalid username or password".to_string()));
        }
    };

    store
        .update_one(User::COLLECTION, &User::by_id(&user.user_id), &Update::new().set("last_login", now_iso()))
        .await?;

    let token = state.tokens.issue(&user.username, &user.user_id)?;
    log::info!("User {} logged in", user.username);

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "token": token,
        "userid": user.user_id,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_verifies_to_same_identity() {
        let tokens = TokenService::new("secret", 72);
        let token = tokens.issue("alice", "uAlice12345").unwrap();

        let claims = tokens.verify(&token).unwrap();
        assert_eq!(claims.user_id, "uAlice12345");
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.exp - claims.iat, 72 * 3600);
    }

    #[test]
    fn expired_token_is_rejected() {
        let tokens = TokenService::new("secret", 1);
        let long_ago = chrono::Utc::now().timestamp() - 2 * 3600;
        let token = tokens.issue_at("alice", "u1", long_ago).unwrap();

        assert!(matches!(tokens.verify(&token), Err(ApiError::Unauthorized(_))));
    }

    #[test]
    fn foreign_signature_and_garbage_are_rejected() {
        let ours = TokenService::new("secret", 72);
        let theirs = TokenService::new("other-secret", 72);
        let token = theirs.issue("alice", "u1").unwrap();

        assert!(ours.verify(&token).is_err());
        assert!(ours.verify("not.a.token").is_err());
        assert!(ours.verify("").is_err());
    }
}
