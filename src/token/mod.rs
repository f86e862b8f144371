//! Signed bearer tokens.
//!
//! A token is a 7-day HS256 assertion of `{user id, username, role}` signed
//! with the process-wide secret. Verification is purely cryptographic — the
//! credential store is never consulted, so the role travels as a snapshot
//! for the token's whole lifetime (no revocation list).

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::policy::{Identity, Role};

pub const TOKEN_LIFETIME_DAYS: i64 = 7;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    /// Malformed, tampered, wrongly signed, or expired.
    #[error("Invalid token")]
    Invalid,
    #[error("Failed to sign token")]
    Signing,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// User id
    uid: String,
    /// Username
    sub: String,
    role: Role,
    /// Expiry, seconds since the epoch
    exp: i64,
}

/// Issue a token for the given user.
pub fn issue(secret: &str, user_id: &str, username: &str, role: Role) -> Result<String, TokenError> {
    let exp = (Utc::now() + Duration::days(TOKEN_LIFETIME_DAYS)).timestamp();
    let claims = Claims {
        uid: user_id.to_string(),
        sub: username.to_string(),
        role,
        exp,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| TokenError::Signing)
}

/// Verify a token and return the identity it asserts.
pub fn verify(secret: &str, token: &str) -> Result<Identity, TokenError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| TokenError::Invalid)?;

    Ok(Identity {
        user_id: data.claims.uid,
        username: data.claims.sub,
        role: data.claims.role,
    })
}
