//! In-process store with the same observable behaviour as [`PgStore`].
//!
//! Backs the integration tests and `STORAGE=memory` local runs. Nothing is
//! persisted across restarts.
//!
//! [`PgStore`]: super::PgStore

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{Store, StoreError, StoreResult};
use crate::models::service::round_cents;
use crate::models::{
    Booking, BookingScope, BookingStats, BookingStatus, BookingUpdate, Instructor, NewBooking,
    NewInstructor, NewSchool, NewService, NewUser, NewVehicle, PaymentStatus, School,
    SchoolFilter, Service, ServiceFilter, User, Vehicle,
};

#[derive(Default)]
struct Tables {
    users: BTreeMap<i32, User>,
    sessions: HashMap<String, (i32, DateTime<Utc>)>,
    schools: BTreeMap<i32, School>,
    services: BTreeMap<i32, Service>,
    instructors: BTreeMap<i32, Instructor>,
    vehicles: BTreeMap<i32, Vehicle>,
    bookings: BTreeMap<i32, Booking>,
    last_id: i32,
}

impl Tables {
    /// One sequence for every table; ids only need to be unique per table.
    fn next_id(&mut self) -> i32 {
        self.last_id += 1;
        self.last_id
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        // Every mutation is a single insert or assignment, so a poisoned
        // lock still guards consistent tables.
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn by_ids<T: Clone>(table: &BTreeMap<i32, T>, ids: &[i32]) -> Vec<T> {
    ids.iter().filter_map(|id| table.get(id).cloned()).collect()
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut tables = self.tables();
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(StoreError::Conflict("Username already exists".into()));
        }
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict("Email already exists".into()));
        }

        let id = tables.next_id();
        let user = User {
            id,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            full_name: user.full_name,
            phone_number: user.phone_number,
            address: user.address,
            role: user.role,
            created_at: Utc::now(),
        };
        tables.users.insert(id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: i32) -> StoreResult<Option<User>> {
        Ok(self.tables().users.get(&id).cloned())
    }

    async fn get_users(&self, ids: &[i32]) -> StoreResult<Vec<User>> {
        Ok(by_ids(&self.tables().users, ids))
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(self
            .tables()
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .tables()
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn count_users(&self) -> StoreResult<i64> {
        Ok(self.tables().users.len() as i64)
    }

    async fn create_session(
        &self,
        token: &str,
        user_id: i32,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut tables = self.tables();
        if tables.sessions.contains_key(token) {
            return Err(StoreError::Conflict("Session already exists".into()));
        }
        tables
            .sessions
            .insert(token.to_string(), (user_id, expires_at));
        Ok(())
    }

    async fn find_session_user(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<User>> {
        let tables = self.tables();
        Ok(tables
            .sessions
            .get(token)
            .filter(|(_, expires_at)| *expires_at > now)
            .and_then(|(user_id, _)| tables.users.get(user_id).cloned()))
    }

    async fn delete_session(&self, token: &str) -> StoreResult<()> {
        self.tables().sessions.remove(token);
        Ok(())
    }

    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let mut tables = self.tables();
        let before = tables.sessions.len();
        tables.sessions.retain(|_, (_, expires_at)| *expires_at > now);
        Ok((before - tables.sessions.len()) as u64)
    }

    async fn create_school(&self, school: NewSchool) -> StoreResult<School> {
        let mut tables = self.tables();
        if tables.schools.values().any(|s| s.user_id == school.user_id) {
            return Err(StoreError::Conflict("School profile already exists".into()));
        }

        let id = tables.next_id();
        let school = School {
            id,
            user_id: school.user_id,
            school_name: school.school_name,
            description: school.description,
            location: school.location,
            contact_email: school.contact_email,
            contact_phone: school.contact_phone,
            photo_url: school.photo_url,
            verified: false,
            rating: school.rating,
            created_at: Utc::now(),
        };
        tables.schools.insert(id, school.clone());
        Ok(school)
    }

    async fn get_school(&self, id: i32) -> StoreResult<Option<School>> {
        Ok(self.tables().schools.get(&id).cloned())
    }

    async fn get_schools(&self, ids: &[i32]) -> StoreResult<Vec<School>> {
        Ok(by_ids(&self.tables().schools, ids))
    }

    async fn find_school_by_owner(&self, user_id: i32) -> StoreResult<Option<School>> {
        Ok(self
            .tables()
            .schools
            .values()
            .find(|s| s.user_id == user_id)
            .cloned())
    }

    async fn list_schools(&self, filter: &SchoolFilter) -> StoreResult<Vec<School>> {
        let mut schools: Vec<School> = self
            .tables()
            .schools
            .values()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect();
        schools.sort_by(|a, b| {
            b.rating
                .total_cmp(&a.rating)
                .then_with(|| a.school_name.cmp(&b.school_name))
        });
        Ok(schools)
    }

    async fn count_schools(&self) -> StoreResult<i64> {
        Ok(self.tables().schools.len() as i64)
    }

    async fn set_school_verified(&self, id: i32, verified: bool) -> StoreResult<Option<School>> {
        Ok(self.tables().schools.get_mut(&id).map(|school| {
            school.verified = verified;
            school.clone()
        }))
    }

    async fn create_service(&self, service: NewService) -> StoreResult<Service> {
        let mut tables = self.tables();
        let id = tables.next_id();
        let service = Service {
            id,
            school_id: service.school_id,
            name: service.name,
            description: service.description,
            category: service.category,
            price: service.price,
            duration: service.duration,
            created_at: Utc::now(),
        };
        tables.services.insert(id, service.clone());
        Ok(service)
    }

    async fn get_service(&self, id: i32) -> StoreResult<Option<Service>> {
        Ok(self.tables().services.get(&id).cloned())
    }

    async fn get_services(&self, ids: &[i32]) -> StoreResult<Vec<Service>> {
        Ok(by_ids(&self.tables().services, ids))
    }

    async fn list_services(&self, filter: &ServiceFilter) -> StoreResult<Vec<Service>> {
        let category = filter.category();
        let mut services: Vec<Service> = self
            .tables()
            .services
            .values()
            .filter(|s| filter.school_id.map_or(true, |id| s.school_id == id))
            .filter(|s| category.map_or(true, |c| s.category.eq_ignore_ascii_case(c)))
            .cloned()
            .collect();
        services.sort_by(|a, b| a.price.total_cmp(&b.price).then(a.id.cmp(&b.id)));
        Ok(services)
    }

    async fn services_for_schools(&self, school_ids: &[i32]) -> StoreResult<Vec<Service>> {
        let mut services: Vec<Service> = self
            .tables()
            .services
            .values()
            .filter(|s| school_ids.contains(&s.school_id))
            .cloned()
            .collect();
        services.sort_by(|a, b| a.price.total_cmp(&b.price).then(a.id.cmp(&b.id)));
        Ok(services)
    }

    async fn create_instructor(&self, instructor: NewInstructor) -> StoreResult<Instructor> {
        let mut tables = self.tables();
        let id = tables.next_id();
        let instructor = Instructor {
            id,
            school_id: instructor.school_id,
            name: instructor.name,
            license_number: instructor.license_number,
            license_expiry: instructor.license_expiry,
            id_number: instructor.id_number,
            photo_url: instructor.photo_url,
            is_active: true,
            created_at: Utc::now(),
        };
        tables.instructors.insert(id, instructor.clone());
        Ok(instructor)
    }

    async fn get_instructor(&self, id: i32) -> StoreResult<Option<Instructor>> {
        Ok(self.tables().instructors.get(&id).cloned())
    }

    async fn get_instructors(&self, ids: &[i32]) -> StoreResult<Vec<Instructor>> {
        Ok(by_ids(&self.tables().instructors, ids))
    }

    async fn instructors_for_schools(&self, school_ids: &[i32]) -> StoreResult<Vec<Instructor>> {
        let mut instructors: Vec<Instructor> = self
            .tables()
            .instructors
            .values()
            .filter(|i| school_ids.contains(&i.school_id))
            .cloned()
            .collect();
        instructors.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(instructors)
    }

    async fn set_instructor_active(
        &self,
        id: i32,
        active: bool,
    ) -> StoreResult<Option<Instructor>> {
        Ok(self.tables().instructors.get_mut(&id).map(|instructor| {
            instructor.is_active = active;
            instructor.clone()
        }))
    }

    async fn create_vehicle(&self, vehicle: NewVehicle) -> StoreResult<Vehicle> {
        let mut tables = self.tables();
        let id = tables.next_id();
        let vehicle = Vehicle {
            id,
            school_id: vehicle.school_id,
            brand: vehicle.brand,
            model: vehicle.model,
            year: vehicle.year,
            plate_number: vehicle.plate_number,
            transmission: vehicle.transmission,
            photo_url: vehicle.photo_url,
            is_active: true,
            created_at: Utc::now(),
        };
        tables.vehicles.insert(id, vehicle.clone());
        Ok(vehicle)
    }

    async fn get_vehicle(&self, id: i32) -> StoreResult<Option<Vehicle>> {
        Ok(self.tables().vehicles.get(&id).cloned())
    }

    async fn get_vehicles(&self, ids: &[i32]) -> StoreResult<Vec<Vehicle>> {
        Ok(by_ids(&self.tables().vehicles, ids))
    }

    async fn vehicles_for_schools(&self, school_ids: &[i32]) -> StoreResult<Vec<Vehicle>> {
        let mut vehicles: Vec<Vehicle> = self
            .tables()
            .vehicles
            .values()
            .filter(|v| school_ids.contains(&v.school_id))
            .cloned()
            .collect();
        vehicles.sort_by(|a, b| a.brand.cmp(&b.brand).then_with(|| a.model.cmp(&b.model)));
        Ok(vehicles)
    }

    async fn set_vehicle_active(&self, id: i32, active: bool) -> StoreResult<Option<Vehicle>> {
        Ok(self.tables().vehicles.get_mut(&id).map(|vehicle| {
            vehicle.is_active = active;
            vehicle.clone()
        }))
    }

    async fn create_booking(&self, booking: NewBooking) -> StoreResult<Booking> {
        let mut tables = self.tables();
        let id = tables.next_id();
        let now = Utc::now();
        let booking = Booking {
            id,
            student_id: booking.student_id,
            school_id: booking.school_id,
            service_id: booking.service_id,
            instructor_id: booking.instructor_id,
            vehicle_id: booking.vehicle_id,
            booking_date: booking.booking_date,
            status: BookingStatus::Pending,
            total_amount: booking.total_amount,
            payment_status: PaymentStatus::Pending,
            notes: booking.notes,
            created_at: now,
            updated_at: now,
        };
        tables.bookings.insert(id, booking.clone());
        Ok(booking)
    }

    async fn get_booking(&self, id: i32) -> StoreResult<Option<Booking>> {
        Ok(self.tables().bookings.get(&id).cloned())
    }

    async fn list_bookings(&self, scope: BookingScope) -> StoreResult<Vec<Booking>> {
        let mut bookings: Vec<Booking> = self
            .tables()
            .bookings
            .values()
            .filter(|b| scope.includes(b))
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(bookings)
    }

    async fn update_booking(
        &self,
        id: i32,
        update: BookingUpdate,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Booking>> {
        let mut tables = self.tables();
        let booking = match tables.bookings.get_mut(&id) {
            Some(booking) if booking.status == update.expected_status => booking,
            _ => return Ok(None),
        };
        if let Some(status) = update.status {
            booking.status = status;
        }
        if let Some(payment_status) = update.payment_status {
            booking.payment_status = payment_status;
        }
        booking.updated_at = now;
        Ok(Some(booking.clone()))
    }

    async fn booking_stats(
        &self,
        scope: BookingScope,
        now: DateTime<Utc>,
    ) -> StoreResult<BookingStats> {
        let tables = self.tables();
        let stats = tables
            .bookings
            .values()
            .filter(|b| scope.includes(b))
            .fold(BookingStats::default(), |mut stats, b| {
                stats.total += 1;
                match b.status {
                    BookingStatus::Pending => stats.pending += 1,
                    BookingStatus::Confirmed if b.booking_date > now => stats.upcoming += 1,
                    BookingStatus::Completed => stats.completed += 1,
                    _ => {}
                }
                if b.payment_status == PaymentStatus::Paid {
                    stats.revenue += b.total_amount;
                }
                stats
            });
        Ok(BookingStats {
            revenue: round_cents(stats.revenue),
            ..stats
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use chrono::Duration;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.into(),
            email: email.into(),
            password_hash: "hash".into(),
            full_name: "Test User".into(),
            phone_number: None,
            address: None,
            role: Role::Student,
        }
    }

    #[actix_web::test]
    async fn unique_username_and_email() {
        let store = MemoryStore::new();
        store
            .create_user(new_user("naledi", "naledi@example.co.za"))
            .await
            .unwrap();

        let err = store
            .create_user(new_user("naledi", "other@example.co.za"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(ref m) if m == "Username already exists"));

        let err = store
            .create_user(new_user("other", "naledi@example.co.za"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(ref m) if m == "Email already exists"));
    }

    #[actix_web::test]
    async fn expired_sessions_do_not_resolve() {
        let store = MemoryStore::new();
        let user = store
            .create_user(new_user("bongani", "bongani@example.co.za"))
            .await
            .unwrap();
        let now = Utc::now();

        store
            .create_session("live", user.id, now + Duration::hours(1))
            .await
            .unwrap();
        store
            .create_session("stale", user.id, now - Duration::seconds(1))
            .await
            .unwrap();

        assert!(store.find_session_user("live", now).await.unwrap().is_some());
        assert!(store.find_session_user("stale", now).await.unwrap().is_none());
        assert!(store.find_session_user("missing", now).await.unwrap().is_none());

        assert_eq!(store.purge_expired_sessions(now).await.unwrap(), 1);
        assert!(store.find_session_user("live", now).await.unwrap().is_some());
    }

    #[actix_web::test]
    async fn schools_sort_by_rating_then_name() {
        let store = MemoryStore::new();
        for (owner, name, rating) in [(1, "Bravo", 4.0), (2, "Alpha", 4.0), (3, "Zulu", 4.8)] {
            store
                .create_school(NewSchool {
                    user_id: owner,
                    school_name: name.into(),
                    description: None,
                    location: "Pretoria".into(),
                    contact_email: "x@y.co.za".into(),
                    contact_phone: "0125550000".into(),
                    photo_url: None,
                    rating,
                })
                .await
                .unwrap();
        }

        let names: Vec<String> = store
            .list_schools(&SchoolFilter::default())
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.school_name)
            .collect();
        assert_eq!(names, ["Zulu", "Alpha", "Bravo"]);
    }

    #[actix_web::test]
    async fn stats_count_only_paid_revenue() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let mut ids = Vec::new();
        for amount in [300.0, 450.0, 500.0] {
            let booking = store
                .create_booking(NewBooking {
                    student_id: 1,
                    school_id: 2,
                    service_id: 3,
                    instructor_id: None,
                    vehicle_id: None,
                    booking_date: now + Duration::days(2),
                    total_amount: amount,
                    notes: None,
                })
                .await
                .unwrap();
            ids.push(booking.id);
        }

        store
            .update_booking(
                ids[0],
                BookingUpdate {
                    expected_status: BookingStatus::Pending,
                    status: Some(BookingStatus::Confirmed),
                    payment_status: Some(PaymentStatus::Paid),
                },
                now,
            )
            .await
            .unwrap();
        store
            .update_booking(
                ids[1],
                BookingUpdate {
                    expected_status: BookingStatus::Pending,
                    status: Some(BookingStatus::Cancelled),
                    payment_status: Some(PaymentStatus::Failed),
                },
                now,
            )
            .await
            .unwrap();

        let stats = store
            .booking_stats(BookingScope::School(2), now)
            .await
            .unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.upcoming, 1);
        assert_eq!(stats.completed, 0);
        assert_eq!(stats.revenue, 300.0);

        let other = store
            .booking_stats(BookingScope::School(99), now)
            .await
            .unwrap();
        assert_eq!(other, BookingStats::default());
    }

    async fn book(store: &MemoryStore, amount: f64, now: DateTime<Utc>) -> Booking {
        store
            .create_booking(NewBooking {
                student_id: 1,
                school_id: 2,
                service_id: 3,
                instructor_id: None,
                vehicle_id: None,
                booking_date: now + Duration::days(2),
                total_amount: amount,
                notes: None,
            })
            .await
            .unwrap()
    }

    #[actix_web::test]
    async fn update_checked_against_a_stale_status_is_not_applied() {
        use crate::models::{BookingActor, UpdateBookingRequest};

        let store = MemoryStore::new();
        let now = Utc::now();
        let pending = book(&store, 350.0, now).await;
        let confirmed = store
            .update_booking(
                pending.id,
                BookingUpdate {
                    expected_status: BookingStatus::Pending,
                    status: Some(BookingStatus::Confirmed),
                    payment_status: None,
                },
                now,
            )
            .await
            .unwrap()
            .unwrap();

        // Both requests are authorized against the same confirmed row.
        let cancel = UpdateBookingRequest {
            status: Some(BookingStatus::Cancelled),
            payment_status: None,
        }
        .authorize(BookingActor::Student, &confirmed)
        .unwrap();
        let complete = UpdateBookingRequest {
            status: Some(BookingStatus::Completed),
            payment_status: Some(PaymentStatus::Paid),
        }
        .authorize(BookingActor::School, &confirmed)
        .unwrap();

        let completed = store
            .update_booking(confirmed.id, complete, now)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(completed.status, BookingStatus::Completed);

        assert!(store
            .update_booking(confirmed.id, cancel, now)
            .await
            .unwrap()
            .is_none());
        let stored = store.get_booking(confirmed.id).await.unwrap().unwrap();
        assert_eq!(stored.status, BookingStatus::Completed);
        assert_eq!(stored.payment_status, PaymentStatus::Paid);
    }

    #[actix_web::test]
    async fn revenue_is_summed_to_the_cent() {
        let store = MemoryStore::new();
        let now = Utc::now();
        for amount in [100.10, 200.20] {
            let booking = book(&store, amount, now).await;
            store
                .update_booking(
                    booking.id,
                    BookingUpdate {
                        expected_status: BookingStatus::Pending,
                        status: None,
                        payment_status: Some(PaymentStatus::Paid),
                    },
                    now,
                )
                .await
                .unwrap();
        }

        let stats = store
            .booking_stats(BookingScope::School(2), now)
            .await
            .unwrap();
        assert_eq!(stats.revenue, 300.3);
    }
}
