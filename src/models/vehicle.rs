use std::str::FromStr;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use super::validation::{self, ValidationError};

pub const OLDEST_MODEL_YEAR: i32 = 1950;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transmission {
    Automatic,
    Manual,
}

impl Transmission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transmission::Automatic => "automatic",
            Transmission::Manual => "manual",
        }
    }
}

impl FromStr for Transmission {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "automatic" => Ok(Transmission::Automatic),
            "manual" => Ok(Transmission::Manual),
            other => Err(ValidationError::InvalidVariant {
                field: "transmission",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: i32,
    pub school_id: i32,
    pub brand: String,
    pub model: String,
    pub year: Option<i32>,
    pub plate_number: String,
    pub transmission: Transmission,
    pub photo_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewVehicle {
    pub school_id: i32,
    pub brand: String,
    pub model: String,
    pub year: Option<i32>,
    pub plate_number: String,
    pub transmission: Transmission,
    pub photo_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVehicleRequest {
    pub brand: String,
    pub model: String,
    #[serde(default)]
    pub year: Option<i32>,
    pub plate_number: String,
    pub transmission: Transmission,
    #[serde(default)]
    pub photo_url: Option<String>,
}

impl CreateVehicleRequest {
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), ValidationError> {
        validation::require("brand", &self.brand)?;
        validation::require("model", &self.model)?;
        validation::require("plateNumber", &self.plate_number)?;
        if let Some(year) = self.year {
            if year < OLDEST_MODEL_YEAR || year > now.year() + 1 {
                return Err(ValidationError::OutOfRange {
                    field: "year",
                    reason: "is not a plausible model year",
                });
            }
        }
        Ok(())
    }

    pub fn into_new_vehicle(self, school_id: i32) -> NewVehicle {
        NewVehicle {
            school_id,
            brand: self.brand.trim().to_string(),
            model: self.model.trim().to_string(),
            year: self.year,
            plate_number: self.plate_number.trim().to_uppercase(),
            transmission: self.transmission,
            photo_url: validation::normalize_optional(self.photo_url),
        }
    }
}
