use std::collections::HashMap;

use actix_web::{web, HttpResponse};
use log::info;

use super::common::owned_school;
use crate::auth::AuthUser;
use crate::db::Store;
use crate::error::ApiError;
use crate::models::{CreateServiceRequest, Role, ServiceFilter, ServiceWithSchool};

/// Cheapest first, each service carrying its school.
pub async fn list_services(
    store: web::Data<dyn Store>,
    filter: web::Query<ServiceFilter>,
) -> Result<HttpResponse, ApiError> {
    let services = store.list_services(&filter).await?;

    let mut school_ids: Vec<i32> = services.iter().map(|s| s.school_id).collect();
    school_ids.sort_unstable();
    school_ids.dedup();
    let schools: HashMap<_, _> = store
        .get_schools(&school_ids)
        .await?
        .into_iter()
        .map(|s| (s.id, s))
        .collect();

    let listed: Vec<ServiceWithSchool> = services
        .into_iter()
        .filter_map(|service| {
            let school = schools.get(&service.school_id)?.clone();
            Some(ServiceWithSchool { service, school })
        })
        .collect();
    Ok(HttpResponse::Ok().json(listed))
}

pub async fn create_service(
    store: web::Data<dyn Store>,
    auth: AuthUser,
    payload: web::Json<CreateServiceRequest>,
) -> Result<HttpResponse, ApiError> {
    auth.require_role(Role::School)?;
    let req = payload.into_inner();
    req.validate()?;

    let school = owned_school(store.get_ref(), &auth.user).await?;
    let service = store.create_service(req.into_new_service(school.id)).await?;
    info!("School {} added service {} ({})", school.id, service.name, service.id);
    Ok(HttpResponse::Created().json(service))
}
