//! Authentication DTOs for the portal backend
//!
//! Wire format is camelCase JSON, matching the backend contract.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

// ============================================================================
// Request DTOs
// ============================================================================

/// POST /auth/login
#[derive(Debug, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// POST /auth/register
#[derive(Debug, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, message = "le mot de passe doit contenir au moins 8 caracteres"))]
    pub password: String,
    #[validate(length(min = 1))]
    pub first_name: String,
    #[validate(length(min = 1))]
    pub last_name: String,
    /// Thesis registration number, when the doctoral school has issued one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_number: Option<String>,
}

/// POST /auth/refresh
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

/// POST /users/change-password
#[derive(Debug, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1))]
    pub current_password: String,
    #[validate(length(min = 8, message = "le mot de passe doit contenir au moins 8 caracteres"))]
    pub new_password: String,
}

/// POST /users/forgot-password
#[derive(Debug, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordRequest {
    #[validate(email)]
    pub email: String,
}

/// POST /users/reset-password
#[derive(Debug, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1))]
    pub token: String,
    #[validate(length(min = 8, message = "le mot de passe doit contenir au moins 8 caracteres"))]
    pub new_password: String,
}

/// PUT /users/profile
#[derive(Debug, Serialize, Validate, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1))]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1))]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub laboratory: Option<String>,
}

// ============================================================================
// Response DTOs
// ============================================================================

/// Token pair issued by login, register and refresh
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TokenPairResponse {
    pub access_token: String,
    pub refresh_token: String,
}

/// GET /users/profile
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub roles: Vec<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub laboratory: Option<String>,
    #[serde(default)]
    pub registration_number: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn test_register_request_validation() {
        let req = RegisterRequest {
            email: "not-an-email".to_string(),
            password: "short".to_string(),
            first_name: "Awa".to_string(),
            last_name: "Ndiaye".to_string(),
            registration_number: None,
        };
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("email"));
        assert!(errors.field_errors().contains_key("password"));
    }

    #[test]
    fn test_token_pair_wire_format() {
        let body = r#"{"accessToken":"aaa.bbb.ccc","refreshToken":"rrr"}"#;
        let pair: TokenPairResponse = serde_json::from_str(body).unwrap();
        assert_eq!(pair.access_token, "aaa.bbb.ccc");
        assert_eq!(pair.refresh_token, "rrr");
    }

    #[test]
    fn test_login_request_is_camel_case() {
        let req = LoginRequest {
            email: "d@univ.example".to_string(),
            password: "secret123".to_string(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("email").is_some());
        assert!(json.get("password").is_some());
    }
}
