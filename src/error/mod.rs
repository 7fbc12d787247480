//! Centralized error handling for the DocPortal client
//!
//! This module provides a unified error type for everything the client can
//! surface to a caller: transport failures, classified HTTP error statuses,
//! and session expiry. Classification is structural (status codes plus the
//! backend's error envelope), never message string matching.

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Route the user is sent to when the session can no longer be recovered.
pub const SESSION_EXPIRED_REDIRECT: &str = "/login?expired=true";

/// Client error type, classified by failure kind
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network unreachable: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Session expired")]
    SessionExpired {
        /// Route the caller should navigate to
        redirect: String,
    },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Token store error: {0}")]
    Store(#[from] crate::session::StoreError),

    #[error("Unexpected status {status}: {message}")]
    Unexpected { status: u16, message: String },
}

/// Error envelope returned by the portal backend
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

/// Error details in the response body
#[derive(Debug, Deserialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub details: Option<String>,
}

impl ApiError {
    /// Classify a non-2xx response into an error kind.
    ///
    /// The backend error envelope `{"error": {"code", "message"}}` is used
    /// for the message when present; otherwise the raw body is carried as-is.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorResponse>(body)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| {
                if body.trim().is_empty() {
                    status
                        .canonical_reason()
                        .unwrap_or("unknown error")
                        .to_string()
                } else {
                    body.trim().to_string()
                }
            });

        match status {
            StatusCode::UNAUTHORIZED => ApiError::Unauthorized(message),
            StatusCode::FORBIDDEN => ApiError::Forbidden(message),
            StatusCode::NOT_FOUND => ApiError::NotFound(message),
            StatusCode::CONFLICT => ApiError::Conflict(message),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                ApiError::Validation(message)
            }
            s if s.is_server_error() => ApiError::Server {
                status: s.as_u16(),
                message,
            },
            s => ApiError::Unexpected {
                status: s.as_u16(),
                message,
            },
        }
    }

    /// Classify a transport-level failure (no HTTP status available).
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else if err.is_connect() || err.is_request() {
            ApiError::Network(err.to_string())
        } else if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }

    /// User-facing notification message for this error kind.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Network(_) => {
                "Impossible de joindre le serveur. Vérifiez votre connexion.".to_string()
            }
            ApiError::Timeout => "Le serveur met trop de temps à répondre.".to_string(),
            ApiError::Unauthorized(_) => "Identifiants invalides.".to_string(),
            ApiError::Forbidden(_) => {
                "Vous n'avez pas les droits nécessaires pour cette action.".to_string()
            }
            ApiError::NotFound(_) => "La ressource demandée est introuvable.".to_string(),
            ApiError::Conflict(_) => "Cette ressource existe déjà.".to_string(),
            ApiError::Validation(msg) => msg.clone(),
            ApiError::Server { .. } => {
                "Une erreur est survenue côté serveur. Réessayez plus tard.".to_string()
            }
            ApiError::SessionExpired { .. } => {
                "Votre session a expiré. Veuillez vous reconnecter.".to_string()
            }
            ApiError::Decode(_) | ApiError::Store(_) | ApiError::Unexpected { .. } => {
                "Une erreur inattendue est survenue.".to_string()
            }
        }
    }

    /// Construct the terminal session-expiry error.
    pub fn session_expired() -> Self {
        ApiError::SessionExpired {
            redirect: SESSION_EXPIRED_REDIRECT.to_string(),
        }
    }

    /// True for errors that mean the session is gone and the user must log
    /// in again.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, ApiError::SessionExpired { .. })
    }
}
