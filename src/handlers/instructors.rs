use actix_web::{web, HttpResponse};
use chrono::Utc;
use log::info;

use super::common::{ensure_manages_school, owned_school};
use crate::auth::AuthUser;
use crate::db::Store;
use crate::error::ApiError;
use crate::models::{CreateInstructorRequest, Role, SetActiveRequest};

pub async fn create_instructor(
    store: web::Data<dyn Store>,
    auth: AuthUser,
    payload: web::Json<CreateInstructorRequest>,
) -> Result<HttpResponse, ApiError> {
    auth.require_role(Role::School)?;
    let req = payload.into_inner();
    req.validate(Utc::now())?;

    let school = owned_school(store.get_ref(), &auth.user).await?;
    let instructor = store.create_instructor(req.into_new_instructor(school.id)).await?;
    info!("School {} added instructor {}", school.id, instructor.id);
    Ok(HttpResponse::Created().json(instructor))
}

pub async fn set_instructor_active(
    store: web::Data<dyn Store>,
    auth: AuthUser,
    path: web::Path<i32>,
    payload: web::Json<SetActiveRequest>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let instructor = store
        .get_instructor(id)
        .await?
        .ok_or(ApiError::NotFound("Instructor not found"))?;
    ensure_manages_school(store.get_ref(), &auth, instructor.school_id).await?;

    let updated = store
        .set_instructor_active(id, payload.is_active)
        .await?
        .ok_or(ApiError::NotFound("Instructor not found"))?;
    info!("Instructor {} active={}", updated.id, updated.is_active);
    Ok(HttpResponse::Ok().json(updated))
}
