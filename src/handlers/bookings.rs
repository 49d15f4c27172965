use actix_web::{web, HttpResponse};
use chrono::Utc;
use log::{debug, info};

use super::common::{booking_detail, booking_details};
use crate::auth::AuthUser;
use crate::db::Store;
use crate::error::ApiError;
use crate::models::{
    BookingActor, BookingScope, CreateBookingRequest, NewBooking, Role, UpdateBookingRequest,
};

/// Students see their own bookings, schools the bookings made with them, admins everything.
pub async fn list_bookings(
    store: web::Data<dyn Store>,
    auth: AuthUser,
) -> Result<HttpResponse, ApiError> {
    let scope = match auth.role() {
        Role::Admin => BookingScope::All,
        Role::Student => BookingScope::Student(auth.user.id),
        Role::School => {
            let school = store
                .find_school_by_owner(auth.user.id)
                .await?
                .ok_or(ApiError::NotFound("School profile not found"))?;
            BookingScope::School(school.id)
        }
    };

    let bookings = store.list_bookings(scope).await?;
    let details = booking_details(store.get_ref(), bookings).await?;
    Ok(HttpResponse::Ok().json(details))
}

pub async fn create_booking(
    store: web::Data<dyn Store>,
    auth: AuthUser,
    payload: web::Json<CreateBookingRequest>,
) -> Result<HttpResponse, ApiError> {
    auth.require_role(Role::Student)?;
    let req = payload.into_inner();
    req.validate(Utc::now())?;

    let school = store
        .get_school(req.school_id)
        .await?
        .ok_or(ApiError::NotFound("School not found"))?;

    let service = store
        .get_service(req.service_id)
        .await?
        .ok_or(ApiError::NotFound("Service not found"))?;
    if service.school_id != school.id {
        return Err(ApiError::BadRequest(
            "Service is not offered by this school".into(),
        ));
    }

    if let Some(id) = req.instructor_id {
        let instructor = store
            .get_instructor(id)
            .await?
            .ok_or(ApiError::NotFound("Instructor not found"))?;
        if instructor.school_id != school.id {
            return Err(ApiError::BadRequest(
                "Instructor does not work for this school".into(),
            ));
        }
        if !instructor.is_active {
            return Err(ApiError::BadRequest("Instructor is not available".into()));
        }
    }

    if let Some(id) = req.vehicle_id {
        let vehicle = store
            .get_vehicle(id)
            .await?
            .ok_or(ApiError::NotFound("Vehicle not found"))?;
        if vehicle.school_id != school.id {
            return Err(ApiError::BadRequest(
                "Vehicle does not belong to this school".into(),
            ));
        }
        if !vehicle.is_active {
            return Err(ApiError::BadRequest("Vehicle is not available".into()));
        }
    }

    let booking = store
        .create_booking(NewBooking {
            student_id: auth.user.id,
            school_id: school.id,
            service_id: service.id,
            instructor_id: req.instructor_id,
            vehicle_id: req.vehicle_id,
            booking_date: req.booking_date,
            total_amount: service.price,
            notes: req.notes(),
        })
        .await?;
    info!(
        "Student {} booked service {} at school {} (booking {})",
        auth.user.id, service.id, school.id, booking.id
    );

    let detail = booking_detail(store.get_ref(), booking).await?;
    Ok(HttpResponse::Created().json(detail))
}

pub async fn update_booking(
    store: web::Data<dyn Store>,
    auth: AuthUser,
    path: web::Path<i32>,
    payload: web::Json<UpdateBookingRequest>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let mut booking = store
        .get_booking(id)
        .await?
        .ok_or(ApiError::NotFound("Booking not found"))?;

    let actor = match auth.role() {
        Role::Admin => BookingActor::Admin,
        Role::Student if booking.student_id == auth.user.id => BookingActor::Student,
        Role::School => {
            let owned = store.find_school_by_owner(auth.user.id).await?;
            if owned.map(|s| s.id) != Some(booking.school_id) {
                return Err(ApiError::forbidden("You cannot modify this booking"));
            }
            BookingActor::School
        }
        Role::Student => return Err(ApiError::forbidden("You cannot modify this booking")),
    };

    // `None` means another request changed the status first: re-check
    // against the fresh row. Statuses only move forward, so this settles
    // within two retries.
    let updated = loop {
        let update = payload.authorize(actor, &booking)?;
        if let Some(updated) = store.update_booking(id, update, Utc::now()).await? {
            break updated;
        }
        debug!("Booking {} changed during update, re-checking", id);
        booking = store
            .get_booking(id)
            .await?
            .ok_or(ApiError::NotFound("Booking not found"))?;
    };
    info!(
        "Booking {} updated by {}: status={} payment={}",
        updated.id,
        auth.user.username,
        updated.status.as_str(),
        updated.payment_status.as_str()
    );

    let detail = booking_detail(store.get_ref(), updated).await?;
    Ok(HttpResponse::Ok().json(detail))
}
