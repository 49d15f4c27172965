use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::instructor::Instructor;
use super::service::Service;
use super::user::UserSummary;
use super::validation::{self, ValidationError};
use super::vehicle::Vehicle;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct School {
    pub id: i32,
    pub user_id: i32,
    pub school_name: String,
    pub description: Option<String>,
    pub location: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub photo_url: Option<String>,
    pub verified: bool,
    pub rating: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSchool {
    pub user_id: i32,
    pub school_name: String,
    pub description: Option<String>,
    pub location: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub photo_url: Option<String>,
    pub rating: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSchoolRequest {
    pub school_name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub location: String,
    pub contact_email: String,
    pub contact_phone: String,
    #[serde(default)]
    pub photo_url: Option<String>,
}

impl CreateSchoolRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::min_len("schoolName", &self.school_name, 3)?;
        validation::min_len("location", &self.location, 3)?;
        validation::email("contactEmail", &self.contact_email)?;
        validation::min_len("contactPhone", &self.contact_phone, 10)?;
        Ok(())
    }

    pub fn into_new_school(self, user_id: i32) -> NewSchool {
        NewSchool {
            user_id,
            school_name: self.school_name.trim().to_string(),
            description: validation::normalize_optional(self.description),
            location: self.location.trim().to_string(),
            contact_email: self.contact_email.trim().to_string(),
            contact_phone: self.contact_phone.trim().to_string(),
            photo_url: validation::normalize_optional(self.photo_url),
            rating: 0.0,
        }
    }
}

/// Query string for `GET /api/schools`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchoolFilter {
    pub location: Option<String>,
    pub search: Option<String>,
    pub verified: Option<bool>,
}

impl SchoolFilter {
    /// Case-insensitive substring match, mirroring the SQL `ILIKE` filters.
    pub fn matches(&self, school: &School) -> bool {
        if let Some(location) = non_blank(&self.location) {
            if !contains_ignore_case(&school.location, location) {
                return false;
            }
        }
        if let Some(term) = non_blank(&self.search) {
            let in_name = contains_ignore_case(&school.school_name, term);
            let in_description = school
                .description
                .as_deref()
                .map(|d| contains_ignore_case(d, term))
                .unwrap_or(false);
            if !in_name && !in_description {
                return false;
            }
        }
        if let Some(verified) = self.verified {
            if school.verified != verified {
                return false;
            }
        }
        true
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[derive(Debug, Deserialize)]
pub struct VerifySchoolRequest {
    pub verified: bool,
}

/// School with the catalogue students browse before booking.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolDetail {
    #[serde(flatten)]
    pub school: School,
    pub services: Vec<Service>,
    pub instructors: Vec<Instructor>,
    pub vehicles: Vec<Vehicle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<UserSummary>,
}
