use super::models::{Role, SignupRequest};
use crate::common::{is_valid_email, ValidationResult, Validator};

pub const MIN_PASSWORD_LENGTH: usize = 6;
const NAME_MIN: usize = 2;
const NAME_MAX: usize = 100;

fn validate_name(result: &mut ValidationResult, field: &str, value: &Option<String>) {
    match value.as_deref().map(str::trim) {
        None | Some("") => result.add_error(field, "is required"),
        Some(name) => {
            let len = name.chars().count();
            if !(NAME_MIN..=NAME_MAX).contains(&len) {
                result.add_error(field, "must be between 2 and 100 characters");
            }
        }
    }
}

impl Validator<SignupRequest> for SignupRequest {
    fn validate(&self, data: &SignupRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        match data.email.as_deref().map(str::trim) {
            None | Some("") => result.add_error("email", "is required"),
            Some(email) if !is_valid_email(email) => {
                result.add_error("email", "must be a valid email address")
            }
            Some(_) => {}
        }

        match data.password.as_deref() {
            None | Some("") => result.add_error("password", "is required"),
            Some(password) if password.chars().count() < MIN_PASSWORD_LENGTH => {
                result.add_error("password", "must be at least 6 characters")
            }
            Some(_) => {}
        }

        validate_name(&mut result, "first_name", &data.first_name);
        validate_name(&mut result, "last_name", &data.last_name);

        if data.phone.as_deref().map_or(true, |p| p.trim().is_empty()) {
            result.add_error("phone", "is required");
        }

        match data.user_type.as_deref() {
            None | Some("") => result.add_error("user_type", "is required"),
            Some(role) if role.parse::<Role>().is_err() => {
                result.add_error("user_type", "must be ADMIN or USER")
            }
            Some(_) => {}
        }

        result
    }
}
