use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::validation::{self, ValidationError};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instructor {
    pub id: i32,
    pub school_id: i32,
    pub name: String,
    pub license_number: String,
    pub license_expiry: DateTime<Utc>,
    pub id_number: String,
    pub photo_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewInstructor {
    pub school_id: i32,
    pub name: String,
    pub license_number: String,
    pub license_expiry: DateTime<Utc>,
    pub id_number: String,
    pub photo_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInstructorRequest {
    pub name: String,
    pub license_number: String,
    pub license_expiry: DateTime<Utc>,
    pub id_number: String,
    #[serde(default)]
    pub photo_url: Option<String>,
}

impl CreateInstructorRequest {
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), ValidationError> {
        validation::require("name", &self.name)?;
        validation::require("licenseNumber", &self.license_number)?;
        validation::require("idNumber", &self.id_number)?;
        if self.license_expiry <= now {
            return Err(ValidationError::OutOfRange {
                field: "licenseExpiry",
                reason: "must be in the future",
            });
        }
        Ok(())
    }

    pub fn into_new_instructor(self, school_id: i32) -> NewInstructor {
        NewInstructor {
            school_id,
            name: self.name.trim().to_string(),
            license_number: self.license_number.trim().to_string(),
            license_expiry: self.license_expiry,
            id_number: self.id_number.trim().to_string(),
            photo_url: validation::normalize_optional(self.photo_url),
        }
    }
}
