pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod seed;

use actix_web::web;

use crate::config::AuthSettings;
use crate::db::Store;
use crate::error::ApiError;

const JSON_LIMIT: usize = 64 * 1024;

/// Shared state, extractor error handling and routes, for the server and tests alike.
pub fn configure_app(
    store: web::Data<dyn Store>,
    auth: web::Data<AuthSettings>,
) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        cfg.app_data(store)
            .app_data(auth)
            .app_data(
                web::JsonConfig::default()
                    .limit(JSON_LIMIT)
                    .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into()),
            )
            .app_data(
                web::QueryConfig::default()
                    .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into()),
            )
            .app_data(
                web::PathConfig::default()
                    .error_handler(|_err, _req| ApiError::NotFound("Not found").into()),
            )
            .configure(handlers::configure);
    }
}
