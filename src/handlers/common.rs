//! Lookups shared by several handlers: ownership checks and response assembly.

use std::collections::{BTreeSet, HashMap};

use futures::try_join;

use crate::auth::AuthUser;
use crate::db::Store;
use crate::error::ApiError;
use crate::models::{
    Booking, BookingDetail, Instructor, Role, School, SchoolDetail, Service, User, UserSummary,
    Vehicle,
};

/// The school profile owned by `user`.
pub async fn owned_school(store: &dyn Store, user: &User) -> Result<School, ApiError> {
    store
        .find_school_by_owner(user.id)
        .await?
        .ok_or(ApiError::NotFound("School profile not found"))
}

/// Admins manage every school; school users only their own.
pub async fn ensure_manages_school(
    store: &dyn Store,
    auth: &AuthUser,
    school_id: i32,
) -> Result<(), ApiError> {
    match auth.role() {
        Role::Admin => Ok(()),
        Role::School => {
            let owned = store.find_school_by_owner(auth.user.id).await?;
            if owned.map(|s| s.id) == Some(school_id) {
                Ok(())
            } else {
                Err(ApiError::forbidden("You can only manage your own school"))
            }
        }
        Role::Student => Err(ApiError::forbidden("This action requires the school role")),
    }
}

fn unique_ids(ids: impl IntoIterator<Item = i32>) -> Vec<i32> {
    ids.into_iter().collect::<BTreeSet<_>>().into_iter().collect()
}

fn group_by_school<T>(items: Vec<T>, school_id: impl Fn(&T) -> i32) -> HashMap<i32, Vec<T>> {
    let mut grouped: HashMap<i32, Vec<T>> = HashMap::new();
    for item in items {
        grouped.entry(school_id(&item)).or_default().push(item);
    }
    grouped
}

/// Attaches services, instructors and vehicles to each school, keeping order.
///
/// Inactive instructors and vehicles are only included when `include_inactive`
/// is set, which handlers do for the owning school and admins.
pub async fn school_details(
    store: &dyn Store,
    schools: Vec<School>,
    include_inactive: bool,
    with_owner: bool,
) -> Result<Vec<SchoolDetail>, ApiError> {
    if schools.is_empty() {
        return Ok(Vec::new());
    }

    let ids = unique_ids(schools.iter().map(|s| s.id));
    let owner_ids = if with_owner {
        unique_ids(schools.iter().map(|s| s.user_id))
    } else {
        Vec::new()
    };

    let (services, instructors, vehicles, owners) = try_join!(
        store.services_for_schools(&ids),
        store.instructors_for_schools(&ids),
        store.vehicles_for_schools(&ids),
        store.get_users(&owner_ids),
    )?;

    let mut services = group_by_school(services, |s: &Service| s.school_id);
    let mut instructors = group_by_school(
        instructors
            .into_iter()
            .filter(|i| include_inactive || i.is_active)
            .collect(),
        |i: &Instructor| i.school_id,
    );
    let mut vehicles = group_by_school(
        vehicles
            .into_iter()
            .filter(|v| include_inactive || v.is_active)
            .collect(),
        |v: &Vehicle| v.school_id,
    );
    let owners: HashMap<i32, UserSummary> = owners
        .iter()
        .map(|u| (u.id, UserSummary::from(u)))
        .collect();

    Ok(schools
        .into_iter()
        .map(|school| SchoolDetail {
            services: services.remove(&school.id).unwrap_or_default(),
            instructors: instructors.remove(&school.id).unwrap_or_default(),
            vehicles: vehicles.remove(&school.id).unwrap_or_default(),
            owner: owners.get(&school.user_id).cloned(),
            school,
        })
        .collect())
}

/// Resolves the student, school, service, instructor and vehicle of each
/// booking with one batch lookup per table.
pub async fn booking_details(
    store: &dyn Store,
    bookings: Vec<Booking>,
) -> Result<Vec<BookingDetail>, ApiError> {
    if bookings.is_empty() {
        return Ok(Vec::new());
    }

    let student_ids = unique_ids(bookings.iter().map(|b| b.student_id));
    let school_ids = unique_ids(bookings.iter().map(|b| b.school_id));
    let service_ids = unique_ids(bookings.iter().map(|b| b.service_id));
    let instructor_ids = unique_ids(bookings.iter().filter_map(|b| b.instructor_id));
    let vehicle_ids = unique_ids(bookings.iter().filter_map(|b| b.vehicle_id));

    let (students, schools, services, instructors, vehicles) = try_join!(
        store.get_users(&student_ids),
        store.get_schools(&school_ids),
        store.get_services(&service_ids),
        store.get_instructors(&instructor_ids),
        store.get_vehicles(&vehicle_ids),
    )?;

    let students: HashMap<i32, User> = students.into_iter().map(|u| (u.id, u)).collect();
    let schools: HashMap<i32, School> = schools.into_iter().map(|s| (s.id, s)).collect();
    let services: HashMap<i32, Service> = services.into_iter().map(|s| (s.id, s)).collect();
    let instructors: HashMap<i32, Instructor> =
        instructors.into_iter().map(|i| (i.id, i)).collect();
    let vehicles: HashMap<i32, Vehicle> = vehicles.into_iter().map(|v| (v.id, v)).collect();

    bookings
        .into_iter()
        .map(|booking| -> Result<BookingDetail, ApiError> {
            let id = booking.id;
            let missing = move |what: &str| {
                ApiError::Internal(format!("booking {id} references a missing {what}"))
            };
            Ok(BookingDetail {
                student: students
                    .get(&booking.student_id)
                    .map(UserSummary::from)
                    .ok_or_else(|| missing("student"))?,
                school: schools
                    .get(&booking.school_id)
                    .cloned()
                    .ok_or_else(|| missing("school"))?,
                service: services
                    .get(&booking.service_id)
                    .cloned()
                    .ok_or_else(|| missing("service"))?,
                instructor: booking
                    .instructor_id
                    .and_then(|id| instructors.get(&id).cloned()),
                vehicle: booking.vehicle_id.and_then(|id| vehicles.get(&id).cloned()),
                booking,
            })
        })
        .collect()
}

/// Single-booking variant of [`booking_details`].
pub async fn booking_detail(store: &dyn Store, booking: Booking) -> Result<BookingDetail, ApiError> {
    booking_details(store, vec![booking])
        .await?
        .pop()
        .ok_or_else(|| ApiError::Internal("booking detail lookup returned nothing".into()))
}
