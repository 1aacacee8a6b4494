use std::sync::Arc;

use actix_web::{web, HttpResponse};

pub mod activity;
pub mod auth;
pub mod config;
pub mod core;
pub mod events;
pub mod follow;
pub mod logging;
pub mod media;
pub mod merch;
pub mod models;
pub mod places;
pub mod static_server;
pub mod templates;
pub mod tickets;
pub mod users;

use crate::auth::TokenService;
use crate::config::{Config, MAX_JSON_BYTES};
use crate::core::assets::{AssetKind, AssetStorage};
use crate::core::errors::ApiError;
use crate::core::ratelimit::RateLimiter;
use crate::core::store::DocumentStore;

/// Everything a handler needs, shared across workers.
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub tokens: TokenService,
    pub assets: AssetStorage,
    pub limiter: RateLimiter,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            tokens: TokenService::new(&config.jwt_secret, config.token_expiration_hours),
            assets: AssetStorage::new(config.upload_root.clone()),
            limiter: RateLimiter::new(config.rate_limit_per_minute),
            config,
        }
    }
}

const SHELL_PAGES: [&str; 11] = [
    "/",
    "/activity",
    "/about",
    "/profile",
    "/register",
    "/login",
    "/create",
    "/place",
    "/places",
    "/events",
    "/index.html",
];

/// Registers the JSON API, the HTML shell and the asset routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .limit(MAX_JSON_BYTES)
            .error_handler(|err, _req| ApiError::bad_request(format!("Invalid JSON body: {}", err)).into()),
    );

    cfg.service(
        web::scope("/api")
            .route("/register", web::post().to(users::register))
            .route("/login", web::post().to(auth::login))
            .service(
                web::resource("/profile")
                    .route(web::get().to(users::get_profile))
                    .route(web::put().to(users::edit_profile))
                    .route(web::delete().to(users::delete_profile)),
            )
            .route("/user/{username}", web::get().to(users::get_user_profile))
            .route("/follows/{userid}", web::post().to(follow::handle_toggle))
            .route("/followers", web::get().to(follow::get_followers))
            .route("/following", web::get().to(follow::get_following))
            .route("/follow/suggestions", web::get().to(follow::get_suggestions))
            .service(
                web::resource("/activity")
                    .route(web::get().to(activity::get_activity_feed))
                    .route(web::post().to(activity::log_activity)),
            )
            .route("/events", web::get().to(events::list_events))
            .route("/event", web::post().to(events::create_event))
            .service(
                web::resource("/event/{eventid}")
                    .route(web::get().to(events::get_event))
                    .route(web::put().to(events::edit_event))
                    .route(web::delete().to(events::delete_event)),
            )
            .route("/event/{eventid}/review", web::post().to(events::add_review))
            .service(
                web::resource("/event/{eventid}/media")
                    .route(web::get().to(media::list_media))
                    .route(web::post().to(media::add_media)),
            )
            .service(
                web::resource("/event/{eventid}/media/{id}")
                    .route(web::get().to(media::get_media))
                    .route(web::delete().to(media::delete_media)),
            )
            .service(
                web::resource("/event/{eventid}/merch")
                    .route(web::get().to(merch::list_merch))
                    .route(web::post().to(merch::create_merch)),
            )
            .service(
                web::resource("/event/{eventid}/merch/{merchid}")
                    .route(web::get().to(merch::get_merch))
                    .route(web::put().to(merch::edit_merch))
                    .route(web::delete().to(merch::delete_merch))
                    .route(web::post().to(merch::buy_merch)),
            )
            .service(
                web::resource("/event/{eventid}/ticket")
                    .route(web::get().to(tickets::list_tickets))
                    .route(web::post().to(tickets::create_ticket)),
            )
            .service(
                web::resource("/event/{eventid}/ticket/{ticketid}")
                    .route(web::get().to(tickets::get_ticket))
                    .route(web::put().to(tickets::edit_ticket))
                    .route(web::delete().to(tickets::delete_ticket))
                    .route(web::post().to(tickets::buy_ticket)),
            )
            .route("/places", web::get().to(places::list_places))
            .route("/place", web::post().to(places::create_place))
            .service(
                web::resource("/place/{placeid}")
                    .route(web::get().to(places::get_place))
                    .route(web::put().to(places::edit_place))
                    .route(web::delete().to(places::delete_place)),
            )
            .default_service(web::to(|| async { Err::<HttpResponse, _>(ApiError::not_found("No route found")) })),
    );

    for page in SHELL_PAGES {
        cfg.route(page, web::get().to(templates::render_page));
    }
    cfg.route("/user/{username}", web::get().to(templates::render_user_page))
        .route("/event/{eventid}", web::get().to(templates::render_event_page))
        .route("/place/{placeid}", web::get().to(templates::render_place_page))
        .route("/favicon.ico", web::get().to(static_server::serve_static))
        .route("/css/{file:.*}", web::get().to(static_server::serve_static))
        .route("/js/{file:.*}", web::get().to(static_server::serve_static));

    for kind in AssetKind::ALL {
        cfg.route(
            &format!("/{}/{{file}}", kind.directory()),
            web::get().to(static_server::serve_upload),
        );
    }
}
