use serde::{Deserialize, Serialize};

use super::user::Role;
use super::validation::{self, ValidationError};

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub role: Role,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::min_len("username", &self.username, 3)?;
        validation::email("email", &self.email)?;
        validation::min_len("fullName", &self.full_name, 2)?;
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ValidationError::TooShort {
                field: "password",
                min: MIN_PASSWORD_LEN,
            });
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> RegisterRequest {
        RegisterRequest {
            username: "lerato".into(),
            email: "lerato@example.co.za".into(),
            password: "hunter22".into(),
            full_name: "Lerato Mokoena".into(),
            phone_number: None,
            address: None,
            role: Role::Student,
        }
    }

    #[test]
    fn valid_registration_passes() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn short_password_is_rejected() {
        let mut req = request();
        req.password = "abc".into();
        assert_eq!(
            req.validate(),
            Err(ValidationError::TooShort {
                field: "password",
                min: MIN_PASSWORD_LEN
            })
        );
    }

    #[test]
    fn role_defaults_to_student() {
        let req: RegisterRequest = serde_json::from_str(
            r#"{"username":"abc","email":"a@b.co","password":"secret1","fullName":"Ab"}"#,
        )
        .unwrap();
        assert_eq!(req.role, Role::Student);
    }
}
