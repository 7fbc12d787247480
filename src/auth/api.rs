//! Raw auth endpoint calls
//!
//! `AuthApi` covers the endpoints that are reachable without a session:
//! login, register, refresh and password recovery. It is storage-free by
//! design; the token store has a single writer, `PortalClient`.

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use validator::Validate;

use crate::config::Config;
use crate::error::ApiError;
use crate::models::auth::{
    ForgotPasswordRequest, LoginRequest, RefreshTokenRequest, RegisterRequest,
    ResetPasswordRequest, TokenPairResponse,
};

/// Client for the unauthenticated auth endpoints
#[derive(Clone)]
pub struct AuthApi {
    http: reqwest::Client,
    config: Config,
}

impl AuthApi {
    pub fn new(http: reqwest::Client, config: Config) -> Self {
        Self { http, config }
    }

    /// POST /auth/login - Exchange credentials for a token pair
    pub async fn login(&self, email: &str, password: &str) -> Result<TokenPairResponse, ApiError> {
        let req = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.post_json("/auth/login", &req).await
    }

    /// POST /auth/register - Create an account and get an initial token pair
    ///
    /// The request is validated client-side first, so obviously malformed
    /// input never reaches the wire.
    pub async fn register(&self, req: &RegisterRequest) -> Result<TokenPairResponse, ApiError> {
        req.validate()
            .map_err(|e| ApiError::Validation(e.to_string()))?;
        self.post_json("/auth/register", req).await
    }

    /// POST /auth/refresh - Exchange a refresh token for a new pair
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPairResponse, ApiError> {
        let req = RefreshTokenRequest {
            refresh_token: refresh_token.to_string(),
        };
        self.post_json("/auth/refresh", &req).await
    }

    /// POST /users/forgot-password - Request a reset email
    pub async fn forgot_password(&self, email: &str) -> Result<(), ApiError> {
        let req = ForgotPasswordRequest {
            email: email.to_string(),
        };
        self.post_no_content("/users/forgot-password", &req).await
    }

    /// POST /users/reset-password - Set a new password from a reset token
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), ApiError> {
        let req = ResetPasswordRequest {
            token: token.to_string(),
            new_password: new_password.to_string(),
        };
        req.validate()
            .map_err(|e| ApiError::Validation(e.to_string()))?;
        self.post_no_content("/users/reset-password", &req).await
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, ApiError>
    where
        B: Serialize,
        R: DeserializeOwned,
    {
        let response = self
            .http
            .post(self.config.endpoint(path))
            .json(body)
            .send()
            .await
            .map_err(ApiError::from_transport)?;

        let status = response.status();
        let text = response.text().await.map_err(ApiError::from_transport)?;

        if !status.is_success() {
            tracing::debug!(%status, path, "auth endpoint returned error");
            return Err(ApiError::from_response(status, &text));
        }

        serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn post_no_content<B: Serialize>(&self, path: &str, body: &B) -> Result<(), ApiError> {
        let response = self
            .http
            .post(self.config.endpoint(path))
            .json(body)
            .send()
            .await
            .map_err(ApiError::from_transport)?;

        let status = response.status();
        if !status.is_success() && status != StatusCode::NO_CONTENT {
            let text = response.text().await.map_err(ApiError::from_transport)?;
            return Err(ApiError::from_response(status, &text));
        }
        Ok(())
    }
}
