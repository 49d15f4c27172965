pub mod auth;
pub mod booking;
pub mod instructor;
pub mod school;
pub mod service;
pub mod stats;
pub mod user;
pub mod validation;
pub mod vehicle;

use serde::Deserialize;

// Re-export all the models that are used in other modules
pub use auth::{LoginRequest, RegisterRequest};
pub use booking::{
    Booking, BookingActor, BookingDetail, BookingScope, BookingStatus, BookingUpdate,
    BookingUpdateError, CreateBookingRequest, NewBooking, PaymentStatus, UpdateBookingRequest,
};
pub use instructor::{CreateInstructorRequest, Instructor, NewInstructor};
pub use school::{CreateSchoolRequest, NewSchool, School, SchoolDetail, SchoolFilter, VerifySchoolRequest};
pub use service::{CreateServiceRequest, NewService, Service, ServiceFilter, ServiceWithSchool};
pub use stats::{BookingStats, DashboardStats};
pub use user::{NewUser, Role, User, UserResponse, UserSummary};
pub use validation::ValidationError;
pub use vehicle::{CreateVehicleRequest, NewVehicle, Transmission, Vehicle};

/// Body of the instructor and vehicle `PATCH` routes.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetActiveRequest {
    pub is_active: bool,
}
