// Credentials are passed explicitly into every call that needs them.
// The client cannot verify a token's signature; it only pre-checks that a
// token is present and, for JWTs, not already expired.

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult, FieldErrors};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub is_dealer: bool,
    #[serde(default)]
    pub is_rental_company: bool,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub points: i64,
}

#[derive(Debug, Clone)]
pub struct Credentials {
    token: String,
    pub user: Option<User>,
}

// Only the expiry matters here
#[derive(Debug, Deserialize)]
struct ExpiryClaim {
    exp: Option<i64>,
}

impl Credentials {
    pub fn new(token: impl Into<String>, user: Option<User>) -> Self {
        Credentials { token: token.into(), user }
    }

    // Returns the bearer token, or Unauthenticated if there is nothing usable
    pub fn bearer(&self, now: DateTime<Utc>) -> ClientResult<&str> {
        let token = self.token.trim();
        if token.is_empty() {
            tracing::warn!("Empty auth token supplied");
            return Err(ClientError::Unauthenticated);
        }
        if let Some(exp) = token_expiry(token) {
            if exp <= now.timestamp() {
                tracing::warn!(exp, "Auth token has expired");
                return Err(ClientError::Unauthenticated);
            }
        }
        Ok(token)
    }

    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(|u| u.is_admin)
    }
}

// Reads `exp` from a JWT without verifying it. Opaque tokens yield None.
fn token_expiry(token: &str) -> Option<i64> {
    if token.split('.').count() != 3 {
        return None;
    }
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    match decode::<ExpiryClaim>(token, &DecodingKey::from_secret(&[]), &validation) {
        Ok(data) => data.claims.exp,
        Err(e) => {
            tracing::debug!(error = %e, "Token looks like a JWT but could not be decoded");
            None
        }
    }
}

// Uniform precondition for authenticated calls
pub fn require(creds: Option<&Credentials>) -> ClientResult<&str> {
    match creds {
        Some(c) => c.bearer(Utc::now()),
        None => Err(ClientError::Unauthenticated),
    }
}

// Registration form as posted to /auth/api/register
#[derive(Debug, Clone, Default, Serialize)]
pub struct RegistrationForm {
    pub username: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub password: String,
    pub password2: String,
}

impl RegistrationForm {
    // Inline checks before anything is sent; the backend may add more
    pub fn validate(&self) -> ClientResult<()> {
        let mut errors = FieldErrors::new();
        if self.username.trim().is_empty() {
            errors.insert("username".into(), "Username is required.".into());
        }
        if self.email.trim().is_empty() {
            errors.insert("email".into(), "Email is required.".into());
        } else if !self.email.contains('@') {
            errors.insert("email".into(), "Please enter a valid email address.".into());
        }
        if self.password.is_empty() {
            errors.insert("password".into(), "Password is required.".into());
        }
        if self.password != self.password2 {
            errors.insert("password2".into(), "Passwords do not match.".into());
        }

        if errors.is_empty() { Ok(()) } else { Err(ClientError::Validation(errors)) }
    }
}
