use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::domain::user::Role;

/// Tokens outlive their signing request by a week; clients are expected to
/// re-login rather than refresh.
const TOKEN_TTL_DAYS: i64 = 7;

/// Signed bearer-token payload. `doctor_id` is stamped at login for doctor
/// accounts and can go stale afterwards; handlers that need the current link
/// look it up fresh instead of trusting the claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub id: Uuid,
    pub role: Role,
    pub email: String,
    #[serde(rename = "doctorId", skip_serializing_if = "Option::is_none", default)]
    pub doctor_id: Option<Uuid>,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("token error: {0}")]
    Token(String),
}

#[derive(Clone)]
pub struct JwtManager {
    secret: String,
}

impl Default for JwtManager {
    fn default() -> Self {
        let secret =
            std::env::var("JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".to_string());
        Self::new(secret)
    }
}

impl JwtManager {
    pub fn new(secret: String) -> Self {
        Self { secret }
    }

    pub fn issue(
        &self,
        id: Uuid,
        role: Role,
        email: &str,
        doctor_id: Option<Uuid>,
    ) -> Result<String, JwtError> {
        let now = OffsetDateTime::now_utc();
        let claims = Claims {
            id,
            role,
            email: email.to_string(),
            doctor_id,
            exp: (now + Duration::days(TOKEN_TTL_DAYS)).unix_timestamp(),
            iat: now.unix_timestamp(),
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| JwtError::Token(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, JwtError> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|e| JwtError::Token(e.to_string()))?;
        Ok(data.claims)
    }
}
