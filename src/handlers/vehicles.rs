use actix_web::{web, HttpResponse};
use chrono::Utc;
use log::info;

use super::common::{ensure_manages_school, owned_school};
use crate::auth::AuthUser;
use crate::db::Store;
use crate::error::ApiError;
use crate::models::{CreateVehicleRequest, Role, SetActiveRequest};

pub async fn create_vehicle(
    store: web::Data<dyn Store>,
    auth: AuthUser,
    payload: web::Json<CreateVehicleRequest>,
) -> Result<HttpResponse, ApiError> {
    auth.require_role(Role::School)?;
    let req = payload.into_inner();
    req.validate(Utc::now())?;

    let school = owned_school(store.get_ref(), &auth.user).await?;
    let vehicle = store.create_vehicle(req.into_new_vehicle(school.id)).await?;
    info!(
        "School {} added vehicle {} ({})",
        school.id, vehicle.plate_number, vehicle.id
    );
    Ok(HttpResponse::Created().json(vehicle))
}

pub async fn set_vehicle_active(
    store: web::Data<dyn Store>,
    auth: AuthUser,
    path: web::Path<i32>,
    payload: web::Json<SetActiveRequest>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let vehicle = store
        .get_vehicle(id)
        .await?
        .ok_or(ApiError::NotFound("Vehicle not found"))?;
    ensure_manages_school(store.get_ref(), &auth, vehicle.school_id).await?;

    let updated = store
        .set_vehicle_active(id, payload.is_active)
        .await?
        .ok_or(ApiError::NotFound("Vehicle not found"))?;
    info!("Vehicle {} active={}", updated.id, updated.is_active);
    Ok(HttpResponse::Ok().json(updated))
}
