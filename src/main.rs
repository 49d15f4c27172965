use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{http::header, middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use log::info;

use drive_book::config::{Config, Storage};
use drive_book::configure_app;
use drive_book::db::{MemoryStore, PgStore, Store};
use drive_book::seed::seed_data;

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env()?;

    let store: Arc<dyn Store> = match &config.storage {
        Storage::Postgres { database_url } => {
            info!("Connecting to database...");
            let store = PgStore::connect(database_url, config.max_connections).await?;
            info!("Running database migrations...");
            store.migrate().await?;
            Arc::new(store)
        }
        Storage::Memory => {
            info!("Using in-memory storage; data is lost on shutdown");
            Arc::new(MemoryStore::new())
        }
    };

    if config.seed_data || config.force_seed {
        seed_data(store.as_ref(), config.force_seed, config.auth.bcrypt_cost).await?;
    }

    let store = web::Data::from(store);
    let auth = web::Data::new(config.auth.clone());
    let cors_origin = config.cors_origin.clone();

    info!("Starting server on {}:{}", config.host, config.port);
    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&cors_origin)
            .allowed_methods(vec!["GET", "POST", "PATCH", "OPTIONS"])
            .allowed_headers(vec![header::CONTENT_TYPE, header::ACCEPT])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .configure(configure_app(store.clone(), auth.clone()))
    })
    .bind(config.bind_address())?
    .run()
    .await?;

    Ok(())
}
