//! Access-token claims decoding
//!
//! The client derives [`UserInfo`] from the access token the backend issued.
//! The signature is NOT verified here: the backend signs and validates its
//! own tokens, the client only reads the claims it was handed for display
//! and role checks.

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Role, UserInfo};

/// Claims-related errors
#[derive(Error, Debug)]
pub enum ClaimsError {
    #[error("Token decoding failed: {0}")]
    DecodingFailed(String),

    #[error("Token subject is not a valid user id: {0}")]
    InvalidSubject(String),

    #[error("Token carries no recognized role")]
    MissingRoles,
}

/// Claims carried by a portal access token
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AccessClaims {
    /// Subject (user ID)
    pub sub: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    /// Role names as the backend spells them
    pub roles: Vec<String>,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

/// Decode the claims of an access token without verifying its signature.
pub fn decode_claims(token: &str) -> Result<AccessClaims, ClaimsError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.required_spec_claims.clear();

    let data = decode::<AccessClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map_err(|e| ClaimsError::DecodingFailed(e.to_string()))?;

    Ok(data.claims)
}

/// Build a [`UserInfo`] from an access token.
///
/// Unknown role names are skipped; an authenticated session must carry at
/// least one recognized role, so an empty result is an error.
pub fn decode_user_info(token: &str) -> Result<UserInfo, ClaimsError> {
    let claims = decode_claims(token)?;

    let id = Uuid::parse_str(&claims.sub)
        .map_err(|_| ClaimsError::InvalidSubject(claims.sub.clone()))?;

    let roles: Vec<Role> = claims.roles.iter().filter_map(|r| Role::parse(r)).collect();
    if roles.is_empty() {
        return Err(ClaimsError::MissingRoles);
    }

    Ok(UserInfo {
        id,
        email: claims.email,
        first_name: claims.first_name,
        last_name: claims.last_name,
        roles,
    })
}
