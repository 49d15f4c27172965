pub mod auth;
pub mod bookings;
pub mod common;
pub mod dashboard;
pub mod health;
pub mod instructors;
pub mod schools;
pub mod services;
pub mod vehicles;

use actix_web::web;

/// Registers every `/api` route.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(health::health))
            .route("/register", web::post().to(auth::register))
            .route("/login", web::post().to(auth::login))
            .route("/logout", web::post().to(auth::logout))
            .route("/user", web::get().to(auth::current_user))
            .route("/schools", web::get().to(schools::list_schools))
            .route("/schools", web::post().to(schools::create_school))
            .route("/schools/{id}", web::get().to(schools::get_school))
            .route("/schools/{id}/verify", web::patch().to(schools::verify_school))
            .route("/services", web::get().to(services::list_services))
            .route("/services", web::post().to(services::create_service))
            .route("/instructors", web::post().to(instructors::create_instructor))
            .route(
                "/instructors/{id}",
                web::patch().to(instructors::set_instructor_active),
            )
            .route("/vehicles", web::post().to(vehicles::create_vehicle))
            .route("/vehicles/{id}", web::patch().to(vehicles::set_vehicle_active))
            .route("/bookings", web::get().to(bookings::list_bookings))
            .route("/bookings", web::post().to(bookings::create_booking))
            .route("/bookings/{id}", web::patch().to(bookings::update_booking))
            .route("/dashboard/stats", web::get().to(dashboard::stats)),
    );
}
