use std::collections::BTreeMap;
use std::fmt;

use reqwest::Method;
use tracing::info;

use parley_types::api::{LoginRequest, RegisterRequest, TokenResponse};

use crate::client::{ApiClient, dispatch};
use crate::error::ApiError;

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 20;
const PASSWORD_MIN: usize = 8;

/// Log in and install the returned token into the client's session.
pub async fn login(api: &ApiClient, username: &str, password: &str) -> Result<(), ApiError> {
    let req = LoginRequest {
        username: username.trim().to_string(),
        password: password.trim().to_string(),
    };

    let body = dispatch(api.anonymous(Method::POST, "/users/login").json(&req)).await?;
    let resp: TokenResponse = serde_json::from_slice(&body)?;
    api.session().login(resp.token);

    info!("Logged in as {}", req.username);
    Ok(())
}

/// Create an account. Does not log in; the caller follows up with [`login`].
pub async fn register(api: &ApiClient, req: &RegisterRequest) -> Result<(), ApiError> {
    dispatch(api.anonymous(Method::POST, "/users").json(req)).await?;
    info!("Registered {}", req.username);
    Ok(())
}

// -- Local validation --

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Field {
    Name,
    Username,
    Password,
}

/// Per-field problems found before anything is sent to the collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    pub fields: BTreeMap<Field, Vec<String>>,
}

impl ValidationErrors {
    fn push(&mut self, field: Field, message: &str) {
        self.fields.entry(field).or_default().push(message.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn for_field(&self, field: Field) -> &[String] {
        self.fields.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let all: Vec<&str> = self.fields.values().flatten().map(String::as_str).collect();
        f.write_str(&all.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Check a registration form. Values are trimmed first; an empty display
/// name is treated as absent.
pub fn validate_registration(
    name: &str,
    username: &str,
    password: &str,
) -> Result<RegisterRequest, ValidationErrors> {
    let mut errors = ValidationErrors::default();
    let username = username.trim();
    let password = password.trim();

    if !is_valid_username(username) {
        errors.push(
            Field::Username,
            "Username must start with a letter, be 3-20 characters long, and only contain letters, numbers, or underscores.",
        );
    }
    if password.chars().count() < PASSWORD_MIN {
        errors.push(Field::Password, "Password must be at least 8 characters long");
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    let name = name.trim();
    Ok(RegisterRequest {
        name: (!name.is_empty()).then(|| name.to_string()),
        username: username.to_string(),
        password: password.to_string(),
    })
}

/// Login only needs both fields present.
pub fn validate_login(username: &str, password: &str) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    if username.trim().is_empty() {
        errors.push(Field::Username, "Username is required");
    }
    if password.trim().is_empty() {
        errors.push(Field::Password, "Password is required");
    }
    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

fn is_valid_username(username: &str) -> bool {
    let len = username.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        return false;
    }

    let mut chars = username.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_rules() {
        assert!(is_valid_username("ada"));
        assert!(is_valid_username("neo_1999"));
        assert!(!is_valid_username("ab"));
        assert!(!is_valid_username("1neo"));
        assert!(!is_valid_username("neo-1999"));
        assert!(!is_valid_username("a_very_long_username_x"));
    }

    #[test]
    fn registration_collects_every_field_error() {
        let errors = validate_registration("", "9x", "short").unwrap_err();
        assert_eq!(errors.for_field(Field::Username).len(), 1);
        assert_eq!(errors.for_field(Field::Password).len(), 1);
        assert!(errors.for_field(Field::Name).is_empty());
    }

    #[test]
    fn registration_trims_and_drops_empty_name() {
        let req = validate_registration("   ", "  trinity ", " password123 ").unwrap();
        assert_eq!(req.name, None);
        assert_eq!(req.username, "trinity");
        assert_eq!(req.password, "password123");
    }

    #[test]
    fn login_requires_both_fields() {
        assert!(validate_login("neo", "pw").is_ok());
        let errors = validate_login(" ", "").unwrap_err();
        assert_eq!(errors.fields.len(), 2);
    }
}
