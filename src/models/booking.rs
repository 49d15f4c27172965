use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::instructor::Instructor;
use super::school::School;
use super::service::Service;
use super::user::UserSummary;
use super::validation::{self, ValidationError};
use super::vehicle::Vehicle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    #[default]
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }

    /// Staying in the same status counts as allowed.
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        *self == next
            || matches!(
                (self, next),
                (Pending, Confirmed) | (Pending, Cancelled) | (Confirmed, Completed) | (Confirmed, Cancelled)
            )
    }
}

impl FromStr for BookingStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "completed" => Ok(BookingStatus::Completed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            other => Err(ValidationError::InvalidVariant {
                field: "status",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "paid" => Ok(PaymentStatus::Paid),
            "failed" => Ok(PaymentStatus::Failed),
            other => Err(ValidationError::InvalidVariant {
                field: "paymentStatus",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: i32,
    pub student_id: i32,
    pub school_id: i32,
    pub service_id: i32,
    pub instructor_id: Option<i32>,
    pub vehicle_id: Option<i32>,
    pub booking_date: DateTime<Utc>,
    pub status: BookingStatus,
    pub total_amount: f64,
    pub payment_status: PaymentStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewBooking {
    pub student_id: i32,
    pub school_id: i32,
    pub service_id: i32,
    pub instructor_id: Option<i32>,
    pub vehicle_id: Option<i32>,
    pub booking_date: DateTime<Utc>,
    pub total_amount: f64,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub school_id: i32,
    pub service_id: i32,
    pub booking_date: DateTime<Utc>,
    #[serde(default)]
    pub instructor_id: Option<i32>,
    #[serde(default)]
    pub vehicle_id: Option<i32>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CreateBookingRequest {
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), ValidationError> {
        if self.booking_date <= now {
            return Err(ValidationError::OutOfRange {
                field: "bookingDate",
                reason: "must be in the future",
            });
        }
        Ok(())
    }

    pub fn notes(&self) -> Option<String> {
        validation::normalize_optional(self.notes.clone())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookingRequest {
    #[serde(default)]
    pub status: Option<BookingStatus>,
    #[serde(default)]
    pub payment_status: Option<PaymentStatus>,
}

/// Who is asking to change a booking, relative to that booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingActor {
    /// The student who made the booking.
    Student,
    /// The owner of the school the booking was made with.
    School,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BookingUpdateError {
    #[error("{0}")]
    Forbidden(&'static str),

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Fields to write; `None` leaves the column untouched.
///
/// Stores apply the update only while the booking is still in
/// `expected_status`, the status it was authorized against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BookingUpdate {
    pub expected_status: BookingStatus,
    pub status: Option<BookingStatus>,
    pub payment_status: Option<PaymentStatus>,
}

impl UpdateBookingRequest {
    pub fn authorize(
        &self,
        actor: BookingActor,
        booking: &Booking,
    ) -> Result<BookingUpdate, BookingUpdateError> {
        if self.status.is_none() && self.payment_status.is_none() {
            return Err(ValidationError::Empty {
                field: "status or paymentStatus",
            }
            .into());
        }

        if actor == BookingActor::Student {
            if self.payment_status.is_some() {
                return Err(BookingUpdateError::Forbidden(
                    "Students cannot change payment status",
                ));
            }
            if self.status != Some(BookingStatus::Cancelled) {
                return Err(BookingUpdateError::Forbidden(
                    "Students may only cancel a booking",
                ));
            }
        }

        if let Some(next) = self.status {
            if !booking.status.can_transition_to(next) {
                return Err(ValidationError::InvalidVariant {
                    field: "status transition",
                    value: format!("{} -> {}", booking.status.as_str(), next.as_str()),
                }
                .into());
            }
        }

        Ok(BookingUpdate {
            expected_status: booking.status,
            status: self.status,
            payment_status: self.payment_status,
        })
    }
}

/// Which bookings a listing or stats query covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingScope {
    All,
    Student(i32),
    School(i32),
}

impl BookingScope {
    pub fn includes(&self, booking: &Booking) -> bool {
        match self {
            BookingScope::All => true,
            BookingScope::Student(id) => booking.student_id == *id,
            BookingScope::School(id) => booking.school_id == *id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingDetail {
    #[serde(flatten)]
    pub booking: Booking,
    pub student: UserSummary,
    pub school: School,
    pub service: Service,
    pub instructor: Option<Instructor>,
    pub vehicle: Option<Vehicle>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn booking(status: BookingStatus) -> Booking {
        let now = Utc::now();
        Booking {
            id: 1,
            student_id: 10,
            school_id: 20,
            service_id: 30,
            instructor_id: None,
            vehicle_id: None,
            booking_date: now,
            status,
            total_amount: 450.0,
            payment_status: PaymentStatus::Pending,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn lifecycle_transitions() {
        use BookingStatus::*;
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Confirmed.can_transition_to(Completed));
        assert!(Confirmed.can_transition_to(Cancelled));
        assert!(Completed.can_transition_to(Completed));
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Pending));
        assert!(Cancelled.is_terminal());
        assert!(!Confirmed.is_terminal());
    }

    #[test]
    fn student_may_only_cancel() {
        let current = booking(BookingStatus::Pending);

        let cancel = UpdateBookingRequest {
            status: Some(BookingStatus::Cancelled),
            payment_status: None,
        };
        assert_eq!(
            cancel.authorize(BookingActor::Student, &current).unwrap().status,
            Some(BookingStatus::Cancelled)
        );

        let confirm = UpdateBookingRequest {
            status: Some(BookingStatus::Confirmed),
            payment_status: None,
        };
        assert!(matches!(
            confirm.authorize(BookingActor::Student, &current),
            Err(BookingUpdateError::Forbidden(_))
        ));

        let pay = UpdateBookingRequest {
            status: None,
            payment_status: Some(PaymentStatus::Paid),
        };
        assert!(matches!(
            pay.authorize(BookingActor::Student, &current),
            Err(BookingUpdateError::Forbidden(_))
        ));
    }

    #[test]
    fn terminal_bookings_cannot_move() {
        let current = booking(BookingStatus::Completed);
        let reopen = UpdateBookingRequest {
            status: Some(BookingStatus::Pending),
            payment_status: None,
        };
        assert!(matches!(
            reopen.authorize(BookingActor::Admin, &current),
            Err(BookingUpdateError::Invalid(_))
        ));

        let paid = UpdateBookingRequest {
            status: None,
            payment_status: Some(PaymentStatus::Paid),
        };
        assert!(paid.authorize(BookingActor::School, &current).is_ok());
    }

    #[test]
    fn update_remembers_the_status_it_was_checked_against() {
        let current = booking(BookingStatus::Confirmed);
        let update = UpdateBookingRequest {
            status: Some(BookingStatus::Completed),
            payment_status: None,
        }
        .authorize(BookingActor::School, &current)
        .unwrap();
        assert_eq!(update.expected_status, BookingStatus::Confirmed);
    }

    #[test]
    fn empty_update_is_invalid() {
        let current = booking(BookingStatus::Pending);
        assert!(matches!(
            UpdateBookingRequest::default().authorize(BookingActor::School, &current),
            Err(BookingUpdateError::Invalid(ValidationError::Empty { .. }))
        ));
    }

    #[test]
    fn scope_filters_by_owner() {
        let b = booking(BookingStatus::Pending);
        assert!(BookingScope::All.includes(&b));
        assert!(BookingScope::Student(10).includes(&b));
        assert!(!BookingScope::Student(11).includes(&b));
        assert!(BookingScope::School(20).includes(&b));
    }
}
