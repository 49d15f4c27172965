use actix_web::{web, HttpResponse};
use log::info;

use super::common::school_details;
use crate::auth::AuthUser;
use crate::db::Store;
use crate::error::ApiError;
use crate::models::{CreateSchoolRequest, Role, SchoolFilter, VerifySchoolRequest};

pub async fn list_schools(
    store: web::Data<dyn Store>,
    filter: web::Query<SchoolFilter>,
) -> Result<HttpResponse, ApiError> {
    let schools = store.list_schools(&filter).await?;
    let details = school_details(store.get_ref(), schools, false, false).await?;
    Ok(HttpResponse::Ok().json(details))
}

/// Public; the owning school and admins also see inactive instructors and vehicles.
pub async fn get_school(
    store: web::Data<dyn Store>,
    path: web::Path<i32>,
    viewer: Option<AuthUser>,
) -> Result<HttpResponse, ApiError> {
    let school = store
        .get_school(path.into_inner())
        .await?
        .ok_or(ApiError::NotFound("School not found"))?;

    let include_inactive = viewer
        .map(|v| v.role() == Role::Admin || v.user.id == school.user_id)
        .unwrap_or(false);

    let detail = school_details(store.get_ref(), vec![school], include_inactive, true)
        .await?
        .pop()
        .ok_or(ApiError::NotFound("School not found"))?;
    Ok(HttpResponse::Ok().json(detail))
}

pub async fn create_school(
    store: web::Data<dyn Store>,
    auth: AuthUser,
    payload: web::Json<CreateSchoolRequest>,
) -> Result<HttpResponse, ApiError> {
    auth.require_role(Role::School)?;
    let req = payload.into_inner();
    req.validate()?;

    if store.find_school_by_owner(auth.user.id).await?.is_some() {
        return Err(ApiError::Conflict("School profile already exists".into()));
    }

    let school = store.create_school(req.into_new_school(auth.user.id)).await?;
    info!("User {} created school {} ({})", auth.user.username, school.school_name, school.id);
    Ok(HttpResponse::Created().json(school))
}

pub async fn verify_school(
    store: web::Data<dyn Store>,
    auth: AuthUser,
    path: web::Path<i32>,
    payload: web::Json<VerifySchoolRequest>,
) -> Result<HttpResponse, ApiError> {
    auth.require_role(Role::Admin)?;

    let school = store
        .set_school_verified(path.into_inner(), payload.verified)
        .await?
        .ok_or(ApiError::NotFound("School not found"))?;
    info!("School {} verified={} by {}", school.id, school.verified, auth.user.username);
    Ok(HttpResponse::Ok().json(school))
}
