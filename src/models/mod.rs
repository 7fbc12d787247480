//! Data models for the DocPortal client

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod auth;

pub use auth::{
    ChangePasswordRequest, ForgotPasswordRequest, LoginRequest, ProfileResponse,
    ProfileUpdateRequest, RegisterRequest, ResetPasswordRequest, TokenPairResponse,
};

/// Portal role attached to an authenticated user
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Doctorant,
    Directeur,
    Responsable,
    Admin,
}

impl Role {
    /// Get the role name as the backend spells it
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Doctorant => "DOCTORANT",
            Role::Directeur => "DIRECTEUR",
            Role::Responsable => "RESPONSABLE",
            Role::Admin => "ADMIN",
        }
    }

    /// Parse a role name; unknown names yield `None`
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "DOCTORANT" => Some(Role::Doctorant),
            "DIRECTEUR" => Some(Role::Directeur),
            "RESPONSABLE" => Some(Role::Responsable),
            "ADMIN" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// Authenticated user, derived from the access token claims
///
/// Read-only from the caller's perspective; rebuilt on every login or
/// token rotation.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UserInfo {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub roles: Vec<Role>,
}

impl UserInfo {
    /// Set-membership test against a route's required roles
    pub fn has_any_role(&self, required: &[Role]) -> bool {
        required.iter().any(|r| self.roles.contains(r))
    }

    /// Display name for notifications and headers
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
