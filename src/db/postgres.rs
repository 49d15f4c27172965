use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{info, warn};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{FromRow, PgPool, Row};

use super::{Store, StoreError, StoreResult};
use crate::models::{
    Booking, BookingScope, BookingStats, BookingUpdate, Instructor, NewBooking, NewInstructor,
    NewSchool, NewService, NewUser, NewVehicle, School, SchoolFilter, Service, ServiceFilter,
    User, Vehicle,
};

const USER_COLUMNS: &str =
    "id, username, email, password_hash, full_name, phone_number, address, role, created_at";

const SCHOOL_COLUMNS: &str = "id, user_id, school_name, description, location, contact_email, \
     contact_phone, photo_url, verified, rating, created_at";

const SERVICE_COLUMNS: &str =
    "id, school_id, name, description, category, price::float8 AS price, duration, created_at";

const INSTRUCTOR_COLUMNS: &str = "id, school_id, name, license_number, license_expiry, id_number, \
     photo_url, is_active, created_at";

const VEHICLE_COLUMNS: &str = "id, school_id, brand, model, year, plate_number, transmission, \
     photo_url, is_active, created_at";

const BOOKING_COLUMNS: &str = "id, student_id, school_id, service_id, instructor_id, vehicle_id, \
     booking_date, status, total_amount::float8 AS total_amount, payment_status, notes, \
     created_at, updated_at";

/// Postgres-backed store. Cloning shares the underlying pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Applies the embedded migrations under `./migrations`.
    pub async fn migrate(&self) -> StoreResult<()> {
        info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn decode_error(err: crate::models::ValidationError) -> sqlx::Error {
    sqlx::Error::Decode(Box::new(err))
}

impl FromRow<'_, PgRow> for User {
    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        let role: String = row.try_get("role")?;
        Ok(User {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            full_name: row.try_get("full_name")?,
            phone_number: row.try_get("phone_number")?,
            address: row.try_get("address")?,
            role: role.parse().map_err(decode_error)?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl FromRow<'_, PgRow> for School {
    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(School {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            school_name: row.try_get("school_name")?,
            description: row.try_get("description")?,
            location: row.try_get("location")?,
            contact_email: row.try_get("contact_email")?,
            contact_phone: row.try_get("contact_phone")?,
            photo_url: row.try_get("photo_url")?,
            verified: row.try_get("verified")?,
            rating: row.try_get("rating")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl FromRow<'_, PgRow> for Service {
    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(Service {
            id: row.try_get("id")?,
            school_id: row.try_get("school_id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            category: row.try_get("category")?,
            price: row.try_get("price")?,
            duration: row.try_get("duration")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl FromRow<'_, PgRow> for Instructor {
    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(Instructor {
            id: row.try_get("id")?,
            school_id: row.try_get("school_id")?,
            name: row.try_get("name")?,
            license_number: row.try_get("license_number")?,
            license_expiry: row.try_get("license_expiry")?,
            id_number: row.try_get("id_number")?,
            photo_url: row.try_get("photo_url")?,
            is_active: row.try_get("is_active")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl FromRow<'_, PgRow> for Vehicle {
    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        let transmission: String = row.try_get("transmission")?;
        Ok(Vehicle {
            id: row.try_get("id")?,
            school_id: row.try_get("school_id")?,
            brand: row.try_get("brand")?,
            model: row.try_get("model")?,
            year: row.try_get("year")?,
            plate_number: row.try_get("plate_number")?,
            transmission: transmission.parse().map_err(decode_error)?,
            photo_url: row.try_get("photo_url")?,
            is_active: row.try_get("is_active")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl FromRow<'_, PgRow> for Booking {
    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        let status: String = row.try_get("status")?;
        let payment_status: String = row.try_get("payment_status")?;
        Ok(Booking {
            id: row.try_get("id")?,
            student_id: row.try_get("student_id")?,
            school_id: row.try_get("school_id")?,
            service_id: row.try_get("service_id")?,
            instructor_id: row.try_get("instructor_id")?,
            vehicle_id: row.try_get("vehicle_id")?,
            booking_date: row.try_get("booking_date")?,
            status: status.parse().map_err(decode_error)?,
            total_amount: row.try_get("total_amount")?,
            payment_status: payment_status.parse().map_err(decode_error)?,
            notes: row.try_get("notes")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Maps unique violations to a conflict naming the duplicated field.
fn map_unique_violation(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            let message = match db_err.constraint() {
                Some("users_username_key") => "Username already exists",
                Some("users_email_key") => "Email already exists",
                Some("driving_schools_user_id_key") => "School profile already exists",
                other => {
                    warn!("Unique violation on unexpected constraint {:?}", other);
                    "Record already exists"
                }
            };
            return StoreError::Conflict(message.to_string());
        }
    }
    StoreError::Database(err)
}

/// Builds an `ILIKE` substring pattern with wildcards in `term` escaped.
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// `(student_id, school_id)` filters for a scope; `None` disables a filter.
fn scope_params(scope: BookingScope) -> (Option<i32>, Option<i32>) {
    match scope {
        BookingScope::All => (None, None),
        BookingScope::Student(id) => (Some(id), None),
        BookingScope::School(id) => (None, Some(id)),
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let query = format!(
            "INSERT INTO users (username, email, password_hash, full_name, phone_number, address, role)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.full_name)
            .bind(&user.phone_number)
            .bind(&user.address)
            .bind(user.role.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(map_unique_violation)
    }

    async fn get_user(&self, id: i32) -> StoreResult<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        Ok(sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_users(&self, ids: &[i32]) -> StoreResult<Vec<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1)");
        Ok(sqlx::query_as::<_, User>(&query)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        Ok(sqlx::query_as::<_, User>(&query)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        Ok(sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn count_users(&self) -> StoreResult<i64> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?)
    }

    async fn create_session(
        &self,
        token: &str,
        user_id: i32,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        sqlx::query("INSERT INTO sessions (token, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(token)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_session_user(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<User>> {
        Ok(sqlx::query_as::<_, User>(
            "SELECT u.id, u.username, u.email, u.password_hash, u.full_name, u.phone_number,
                    u.address, u.role, u.created_at
             FROM sessions s
             JOIN users u ON u.id = s.user_id
             WHERE s.token = $1 AND s.expires_at > $2",
        )
        .bind(token)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete_session(&self, token: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn create_school(&self, school: NewSchool) -> StoreResult<School> {
        let query = format!(
            "INSERT INTO driving_schools
                (user_id, school_name, description, location, contact_email, contact_phone, photo_url, rating)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {SCHOOL_COLUMNS}"
        );
        sqlx::query_as::<_, School>(&query)
            .bind(school.user_id)
            .bind(&school.school_name)
            .bind(&school.description)
            .bind(&school.location)
            .bind(&school.contact_email)
            .bind(&school.contact_phone)
            .bind(&school.photo_url)
            .bind(school.rating)
            .fetch_one(&self.pool)
            .await
            .map_err(map_unique_violation)
    }

    async fn get_school(&self, id: i32) -> StoreResult<Option<School>> {
        let query = format!("SELECT {SCHOOL_COLUMNS} FROM driving_schools WHERE id = $1");
        Ok(sqlx::query_as::<_, School>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_schools(&self, ids: &[i32]) -> StoreResult<Vec<School>> {
        let query = format!("SELECT {SCHOOL_COLUMNS} FROM driving_schools WHERE id = ANY($1)");
        Ok(sqlx::query_as::<_, School>(&query)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn find_school_by_owner(&self, user_id: i32) -> StoreResult<Option<School>> {
        let query = format!("SELECT {SCHOOL_COLUMNS} FROM driving_schools WHERE user_id = $1");
        Ok(sqlx::query_as::<_, School>(&query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_schools(&self, filter: &SchoolFilter) -> StoreResult<Vec<School>> {
        let query = format!(
            "SELECT {SCHOOL_COLUMNS} FROM driving_schools
             WHERE ($1::text IS NULL OR location ILIKE $1)
               AND ($2::text IS NULL OR school_name ILIKE $2 OR description ILIKE $2)
               AND ($3::bool IS NULL OR verified = $3)
             ORDER BY rating DESC, school_name ASC"
        );
        Ok(sqlx::query_as::<_, School>(&query)
            .bind(non_empty(&filter.location).map(like_pattern))
            .bind(non_empty(&filter.search).map(like_pattern))
            .bind(filter.verified)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn count_schools(&self) -> StoreResult<i64> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM driving_schools")
            .fetch_one(&self.pool)
            .await?)
    }

    async fn set_school_verified(&self, id: i32, verified: bool) -> StoreResult<Option<School>> {
        let query = format!(
            "UPDATE driving_schools SET verified = $2 WHERE id = $1 RETURNING {SCHOOL_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, School>(&query)
            .bind(id)
            .bind(verified)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_service(&self, service: NewService) -> StoreResult<Service> {
        let query = format!(
            "INSERT INTO services (school_id, name, description, category, price, duration)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {SERVICE_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Service>(&query)
            .bind(service.school_id)
            .bind(&service.name)
            .bind(&service.description)
            .bind(&service.category)
            .bind(service.price)
            .bind(service.duration)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn get_service(&self, id: i32) -> StoreResult<Option<Service>> {
        let query = format!("SELECT {SERVICE_COLUMNS} FROM services WHERE id = $1");
        Ok(sqlx::query_as::<_, Service>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_services(&self, ids: &[i32]) -> StoreResult<Vec<Service>> {
        let query = format!("SELECT {SERVICE_COLUMNS} FROM services WHERE id = ANY($1)");
        Ok(sqlx::query_as::<_, Service>(&query)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn list_services(&self, filter: &ServiceFilter) -> StoreResult<Vec<Service>> {
        let query = format!(
            "SELECT {SERVICE_COLUMNS} FROM services
             WHERE ($1::int IS NULL OR school_id = $1)
               AND ($2::text IS NULL OR LOWER(category) = LOWER($2))
             ORDER BY price ASC, id ASC"
        );
        Ok(sqlx::query_as::<_, Service>(&query)
            .bind(filter.school_id)
            .bind(filter.category())
            .fetch_all(&self.pool)
            .await?)
    }

    async fn services_for_schools(&self, school_ids: &[i32]) -> StoreResult<Vec<Service>> {
        let query = format!(
            "SELECT {SERVICE_COLUMNS} FROM services
             WHERE school_id = ANY($1)
             ORDER BY price ASC, id ASC"
        );
        Ok(sqlx::query_as::<_, Service>(&query)
            .bind(school_ids)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn create_instructor(&self, instructor: NewInstructor) -> StoreResult<Instructor> {
        let query = format!(
            "INSERT INTO instructors (school_id, name, license_number, license_expiry, id_number, photo_url)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {INSTRUCTOR_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Instructor>(&query)
            .bind(instructor.school_id)
            .bind(&instructor.name)
            .bind(&instructor.license_number)
            .bind(instructor.license_expiry)
            .bind(&instructor.id_number)
            .bind(&instructor.photo_url)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn get_instructor(&self, id: i32) -> StoreResult<Option<Instructor>> {
        let query = format!("SELECT {INSTRUCTOR_COLUMNS} FROM instructors WHERE id = $1");
        Ok(sqlx::query_as::<_, Instructor>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_instructors(&self, ids: &[i32]) -> StoreResult<Vec<Instructor>> {
        let query = format!("SELECT {INSTRUCTOR_COLUMNS} FROM instructors WHERE id = ANY($1)");
        Ok(sqlx::query_as::<_, Instructor>(&query)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn instructors_for_schools(&self, school_ids: &[i32]) -> StoreResult<Vec<Instructor>> {
        let query = format!(
            "SELECT {INSTRUCTOR_COLUMNS} FROM instructors WHERE school_id = ANY($1) ORDER BY name ASC"
        );
        Ok(sqlx::query_as::<_, Instructor>(&query)
            .bind(school_ids)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn set_instructor_active(
        &self,
        id: i32,
        active: bool,
    ) -> StoreResult<Option<Instructor>> {
        let query = format!(
            "UPDATE instructors SET is_active = $2 WHERE id = $1 RETURNING {INSTRUCTOR_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Instructor>(&query)
            .bind(id)
            .bind(active)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_vehicle(&self, vehicle: NewVehicle) -> StoreResult<Vehicle> {
        let query = format!(
            "INSERT INTO vehicles (school_id, brand, model, year, plate_number, transmission, photo_url)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {VEHICLE_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Vehicle>(&query)
            .bind(vehicle.school_id)
            .bind(&vehicle.brand)
            .bind(&vehicle.model)
            .bind(vehicle.year)
            .bind(&vehicle.plate_number)
            .bind(vehicle.transmission.as_str())
            .bind(&vehicle.photo_url)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn get_vehicle(&self, id: i32) -> StoreResult<Option<Vehicle>> {
        let query = format!("SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE id = $1");
        Ok(sqlx::query_as::<_, Vehicle>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_vehicles(&self, ids: &[i32]) -> StoreResult<Vec<Vehicle>> {
        let query = format!("SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE id = ANY($1)");
        Ok(sqlx::query_as::<_, Vehicle>(&query)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn vehicles_for_schools(&self, school_ids: &[i32]) -> StoreResult<Vec<Vehicle>> {
        let query = format!(
            "SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE school_id = ANY($1) ORDER BY brand, model"
        );
        Ok(sqlx::query_as::<_, Vehicle>(&query)
            .bind(school_ids)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn set_vehicle_active(&self, id: i32, active: bool) -> StoreResult<Option<Vehicle>> {
        let query = format!(
            "UPDATE vehicles SET is_active = $2 WHERE id = $1 RETURNING {VEHICLE_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Vehicle>(&query)
            .bind(id)
            .bind(active)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_booking(&self, booking: NewBooking) -> StoreResult<Booking> {
        let query = format!(
            "INSERT INTO bookings
                (student_id, school_id, service_id, instructor_id, vehicle_id, booking_date, total_amount, notes)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {BOOKING_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Booking>(&query)
            .bind(booking.student_id)
            .bind(booking.school_id)
            .bind(booking.service_id)
            .bind(booking.instructor_id)
            .bind(booking.vehicle_id)
            .bind(booking.booking_date)
            .bind(booking.total_amount)
            .bind(&booking.notes)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn get_booking(&self, id: i32) -> StoreResult<Option<Booking>> {
        let query = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1");
        Ok(sqlx::query_as::<_, Booking>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_bookings(&self, scope: BookingScope) -> StoreResult<Vec<Booking>> {
        let (student_id, school_id) = scope_params(scope);
        let query = format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings
             WHERE ($1::int IS NULL OR student_id = $1)
               AND ($2::int IS NULL OR school_id = $2)
             ORDER BY created_at DESC, id DESC"
        );
        Ok(sqlx::query_as::<_, Booking>(&query)
            .bind(student_id)
            .bind(school_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn update_booking(
        &self,
        id: i32,
        update: BookingUpdate,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Booking>> {
        let query = format!(
            "UPDATE bookings
             SET status = COALESCE($2, status),
                 payment_status = COALESCE($3, payment_status),
                 updated_at = $4
             WHERE id = $1 AND status = $5
             RETURNING {BOOKING_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Booking>(&query)
            .bind(id)
            .bind(update.status.map(|s| s.as_str()))
            .bind(update.payment_status.map(|s| s.as_str()))
            .bind(now)
            .bind(update.expected_status.as_str())
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn booking_stats(
        &self,
        scope: BookingScope,
        now: DateTime<Utc>,
    ) -> StoreResult<BookingStats> {
        let (student_id, school_id) = scope_params(scope);
        let row = sqlx::query(
            "SELECT COUNT(*) AS total,
                    COUNT(*) FILTER (WHERE status = 'pending') AS pending,
                    COUNT(*) FILTER (WHERE status = 'confirmed' AND booking_date > $3) AS upcoming,
                    COUNT(*) FILTER (WHERE status = 'completed') AS completed,
                    COALESCE(SUM(total_amount) FILTER (WHERE payment_status = 'paid'), 0)::float8 AS revenue
             FROM bookings
             WHERE ($1::int IS NULL OR student_id = $1)
               AND ($2::int IS NULL OR school_id = $2)",
        )
        .bind(student_id)
        .bind(school_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(BookingStats {
            total: row.try_get("total")?,
            pending: row.try_get("pending")?,
            upcoming: row.try_get("upcoming")?,
            completed: row.try_get("completed")?,
            revenue: row.try_get("revenue")?,
        })
    }
}
