use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::db::Store;
use crate::error::ApiError;

pub async fn health(store: web::Data<dyn Store>) -> Result<HttpResponse, ApiError> {
    store.ping().await?;
    Ok(HttpResponse::Ok().json(json!({ "status": "ok" })))
}
