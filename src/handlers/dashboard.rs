use actix_web::{web, HttpResponse};
use chrono::Utc;
use futures::try_join;

use crate::auth::AuthUser;
use crate::db::Store;
use crate::error::ApiError;
use crate::models::{BookingScope, BookingStats, DashboardStats, Role};

/// Counters shaped by the caller's role. A school user without a profile gets zeros.
pub async fn stats(store: web::Data<dyn Store>, auth: AuthUser) -> Result<HttpResponse, ApiError> {
    let now = Utc::now();

    let stats = match auth.role() {
        Role::Admin => {
            let (total_users, total_schools, bookings) = try_join!(
                store.count_users(),
                store.count_schools(),
                store.booking_stats(BookingScope::All, now),
            )?;
            DashboardStats::Admin {
                total_users,
                total_schools,
                total_bookings: bookings.total,
                pending_bookings: bookings.pending,
            }
        }
        Role::School => match store.find_school_by_owner(auth.user.id).await? {
            Some(school) => DashboardStats::for_school(
                store
                    .booking_stats(BookingScope::School(school.id), now)
                    .await?,
            ),
            None => DashboardStats::for_school(BookingStats::default()),
        },
        Role::Student => DashboardStats::for_student(
            store
                .booking_stats(BookingScope::Student(auth.user.id), now)
                .await?,
        ),
    };

    Ok(HttpResponse::Ok().json(stats))
}
