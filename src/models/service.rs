use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::school::School;
use super::validation::{self, ValidationError};

pub const DEFAULT_CATEGORY: &str = "lessons";
pub const MIN_DURATION_MINUTES: i32 = 30;
/// Largest price a `NUMERIC(10, 2)` column holds.
pub const MAX_PRICE: f64 = 99_999_999.99;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: i32,
    pub school_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    /// Rand, rounded to cents.
    pub price: f64,
    /// Minutes.
    pub duration: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewService {
    pub school_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub price: f64,
    pub duration: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateServiceRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    pub price: f64,
    pub duration: i32,
}

impl CreateServiceRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::min_len("name", &self.name, 3)?;
        if !self.price.is_finite() || round_cents(self.price) <= 0.0 {
            return Err(ValidationError::OutOfRange {
                field: "price",
                reason: "must be greater than 0",
            });
        }
        if round_cents(self.price) > MAX_PRICE {
            return Err(ValidationError::OutOfRange {
                field: "price",
                reason: "must not exceed 99999999.99",
            });
        }
        if self.duration < MIN_DURATION_MINUTES {
            return Err(ValidationError::OutOfRange {
                field: "duration",
                reason: "must be at least 30 minutes",
            });
        }
        Ok(())
    }

    pub fn into_new_service(self, school_id: i32) -> NewService {
        NewService {
            school_id,
            name: self.name.trim().to_string(),
            description: validation::normalize_optional(self.description),
            category: validation::normalize_optional(self.category)
                .map(|c| c.to_lowercase())
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            price: round_cents(self.price),
            duration: self.duration,
        }
    }
}

pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Query string for `GET /api/services`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceFilter {
    pub school_id: Option<i32>,
    pub category: Option<String>,
}

impl ServiceFilter {
    /// `all` and blank both mean "any category".
    pub fn category(&self) -> Option<&str> {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case("all"))
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceWithSchool {
    #[serde(flatten)]
    pub service: Service,
    pub school: School,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(price: f64, duration: i32) -> CreateServiceRequest {
        CreateServiceRequest {
            name: "Code 8 package".into(),
            description: None,
            category: None,
            price,
            duration,
        }
    }

    #[test]
    fn rejects_free_and_short_services() {
        assert!(request(0.0, 60).validate().is_err());
        assert!(request(0.004, 60).validate().is_err());
        assert!(request(f64::NAN, 60).validate().is_err());
        assert!(request(350.0, 29).validate().is_err());
        assert!(request(350.0, 30).validate().is_ok());
    }

    #[test]
    fn rejects_prices_beyond_the_column_range() {
        assert!(request(MAX_PRICE, 60).validate().is_ok());
        assert_eq!(
            request(1e12, 60).validate(),
            Err(ValidationError::OutOfRange {
                field: "price",
                reason: "must not exceed 99999999.99",
            })
        );
        assert!(request(f64::INFINITY, 60).validate().is_err());
    }

    #[test]
    fn defaults_category_and_rounds_price() {
        let service = request(349.999, 60).into_new_service(4);
        assert_eq!(service.category, DEFAULT_CATEGORY);
        assert_eq!(service.price, 350.0);
        assert_eq!(service.school_id, 4);
    }

    #[test]
    fn all_category_means_no_filter() {
        let filter = ServiceFilter {
            school_id: None,
            category: Some("All".into()),
        };
        assert_eq!(filter.category(), None);

        let filter = ServiceFilter {
            school_id: None,
            category: Some("test-prep".into()),
        };
        assert_eq!(filter.category(), Some("test-prep"));
    }
}
