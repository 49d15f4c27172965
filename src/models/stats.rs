use serde::Serialize;

/// Booking counters for one scope, computed by the store in a single pass.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BookingStats {
    pub total: i64,
    pub pending: i64,
    /// Confirmed with a booking date still ahead.
    pub upcoming: i64,
    pub completed: i64,
    /// Sum of `total_amount` over paid bookings.
    pub revenue: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum DashboardStats {
    #[serde(rename_all = "camelCase")]
    Admin {
        total_users: i64,
        total_schools: i64,
        total_bookings: i64,
        pending_bookings: i64,
    },
    #[serde(rename_all = "camelCase")]
    School {
        total_bookings: i64,
        pending_bookings: i64,
        completed_bookings: i64,
        total_revenue: f64,
    },
    #[serde(rename_all = "camelCase")]
    Student {
        total_bookings: i64,
        upcoming_bookings: i64,
        completed_bookings: i64,
    },
}

impl DashboardStats {
    pub fn for_school(stats: BookingStats) -> Self {
        DashboardStats::School {
            total_bookings: stats.total,
            pending_bookings: stats.pending,
            completed_bookings: stats.completed,
            total_revenue: stats.revenue,
        }
    }

    pub fn for_student(stats: BookingStats) -> Self {
        DashboardStats::Student {
            total_bookings: stats.total,
            upcoming_bookings: stats.upcoming,
            completed_bookings: stats.completed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn school_stats_serialize_flat_camel_case() {
        let json = serde_json::to_value(DashboardStats::for_school(BookingStats {
            total: 4,
            pending: 1,
            upcoming: 2,
            completed: 1,
            revenue: 900.0,
        }))
        .unwrap();

        assert_eq!(json["totalBookings"], 4);
        assert_eq!(json["completedBookings"], 1);
        assert_eq!(json["totalRevenue"], 900.0);
        assert!(json.get("upcomingBookings").is_none());
    }
}
