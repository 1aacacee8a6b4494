use std::sync::Arc;

use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;

use marquee::config::{Config, StoreKind};
use marquee::core::db;
use marquee::core::store::{DocumentStore, MemoryStore, MongoStore};
use marquee::logging::init_logger;
use marquee::AppState;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    init_logger().context("failed to install logger")?;

    let config = Config::from_env().context("invalid configuration")?;
    if config.jwt_secret_is_default {
        log::warn!("MARQUEE_JWT_SECRET is not set; using the development secret");
    }

    let store: Arc<dyn DocumentStore> = match config.store {
        StoreKind::Memory => {
            log::info!("Using in-memory document store");
            Arc::new(MemoryStore::new())
        }
        StoreKind::Mongo => {
            log::info!("Connecting to MongoDB database {}", config.database);
            let mongo = MongoStore::connect(&config.mongo_uri, &config.database)
                .await
                .context("failed to connect to MongoDB")?;
            Arc::new(mongo)
        }
    };

    db::ensure_indexes(store.as_ref()).await?;
    if config.seed_demo {
        db::init_demo_data(store.as_ref()).await?;
    }

    let bind = config.bind.clone();
    let state = web::Data::new(AppState::new(config, store));
    log::info!(
        "Serving uploads from {} and listening on http://{}",
        state.assets.root().display(),
        bind
    );

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(marquee::configure)
    })
    .bind(&bind)
    .with_context(|| format!("failed to bind {}", bind))?
    .run()
    .await?;

    Ok(())
}
