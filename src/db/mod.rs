//! Storage layer.
//!
//! Handlers talk to a [`Store`] trait object so the Postgres backend can be
//! swapped for the in-memory one in tests and local development.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{
    Booking, BookingScope, BookingStats, BookingUpdate, Instructor, NewBooking, NewInstructor,
    NewSchool, NewService, NewUser, NewVehicle, School, SchoolFilter, Service, ServiceFilter,
    User, Vehicle,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A uniqueness constraint was violated; the message names the field.
    #[error("{0}")]
    Conflict(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync {
    async fn ping(&self) -> StoreResult<()>;

    // Users
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;
    async fn get_user(&self, id: i32) -> StoreResult<Option<User>>;
    async fn get_users(&self, ids: &[i32]) -> StoreResult<Vec<User>>;
    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn count_users(&self) -> StoreResult<i64>;

    // Sessions
    async fn create_session(
        &self,
        token: &str,
        user_id: i32,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()>;
    /// Resolves a session token to its user, ignoring expired sessions.
    async fn find_session_user(&self, token: &str, now: DateTime<Utc>)
        -> StoreResult<Option<User>>;
    async fn delete_session(&self, token: &str) -> StoreResult<()>;
    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> StoreResult<u64>;

    // Schools
    async fn create_school(&self, school: NewSchool) -> StoreResult<School>;
    async fn get_school(&self, id: i32) -> StoreResult<Option<School>>;
    async fn get_schools(&self, ids: &[i32]) -> StoreResult<Vec<School>>;
    async fn find_school_by_owner(&self, user_id: i32) -> StoreResult<Option<School>>;
    /// Ordered by rating (highest first), then school name.
    async fn list_schools(&self, filter: &SchoolFilter) -> StoreResult<Vec<School>>;
    async fn count_schools(&self) -> StoreResult<i64>;
    async fn set_school_verified(&self, id: i32, verified: bool) -> StoreResult<Option<School>>;

    // Services
    async fn create_service(&self, service: NewService) -> StoreResult<Service>;
    async fn get_service(&self, id: i32) -> StoreResult<Option<Service>>;
    async fn get_services(&self, ids: &[i32]) -> StoreResult<Vec<Service>>;
    /// Ordered by price, cheapest first.
    async fn list_services(&self, filter: &ServiceFilter) -> StoreResult<Vec<Service>>;
    async fn services_for_schools(&self, school_ids: &[i32]) -> StoreResult<Vec<Service>>;

    // Instructors
    async fn create_instructor(&self, instructor: NewInstructor) -> StoreResult<Instructor>;
    async fn get_instructor(&self, id: i32) -> StoreResult<Option<Instructor>>;
    async fn get_instructors(&self, ids: &[i32]) -> StoreResult<Vec<Instructor>>;
    async fn instructors_for_schools(&self, school_ids: &[i32]) -> StoreResult<Vec<Instructor>>;
    async fn set_instructor_active(&self, id: i32, active: bool)
        -> StoreResult<Option<Instructor>>;

    // Vehicles
    async fn create_vehicle(&self, vehicle: NewVehicle) -> StoreResult<Vehicle>;
    async fn get_vehicle(&self, id: i32) -> StoreResult<Option<Vehicle>>;
    async fn get_vehicles(&self, ids: &[i32]) -> StoreResult<Vec<Vehicle>>;
    async fn vehicles_for_schools(&self, school_ids: &[i32]) -> StoreResult<Vec<Vehicle>>;
    async fn set_vehicle_active(&self, id: i32, active: bool) -> StoreResult<Option<Vehicle>>;

    // Bookings
    async fn create_booking(&self, booking: NewBooking) -> StoreResult<Booking>;
    async fn get_booking(&self, id: i32) -> StoreResult<Option<Booking>>;
    /// Newest first.
    async fn list_bookings(&self, scope: BookingScope) -> StoreResult<Vec<Booking>>;
    /// Applies `update` only if the booking is still in
    /// `update.expected_status`; `None` when missing or changed meanwhile.
    async fn update_booking(
        &self,
        id: i32,
        update: BookingUpdate,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Booking>>;
    async fn booking_stats(&self, scope: BookingScope, now: DateTime<Utc>)
        -> StoreResult<BookingStats>;
}
