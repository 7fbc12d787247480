//! Request pipeline for the portal backend
//!
//! `PortalClient` is the single entry point for authenticated traffic. Every
//! request flows through the same pipeline: attach the stored bearer token
//! (unless the path is auth-exempt), send, and on a 401 run the refresh flow
//! once before retrying the original request once.
//!
//! The pipeline is also the only authority for session invalidation and the
//! only writer of the token store. Concurrent 401s coalesce onto a single
//! refresh round trip through the refresh gate.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use validator::Validate;

use crate::auth::{decode_user_info, AuthApi};
use crate::config::Config;
use crate::error::ApiError;
use crate::models::auth::{
    ChangePasswordRequest, ProfileResponse, ProfileUpdateRequest, RegisterRequest,
};
use crate::models::UserInfo;
use crate::session::{FileTokenStore, MemoryTokenStore, TokenStore};

/// Paths reachable without a session; no bearer token is attached to these.
const AUTH_EXEMPT_PATHS: &[&str] = &[
    "/auth/login",
    "/auth/register",
    "/auth/refresh",
    "/users/forgot-password",
    "/users/reset-password",
];

/// Whether a request path is exempt from bearer attachment.
pub fn is_auth_exempt(path: &str) -> bool {
    let path = path.split('?').next().unwrap_or(path);
    AUTH_EXEMPT_PATHS
        .iter()
        .any(|exempt| path == *exempt || path.ends_with(exempt))
}

/// Authenticated HTTP client for the portal backend
pub struct PortalClient {
    http: reqwest::Client,
    config: Config,
    store: Arc<dyn TokenStore>,
    auth: AuthApi,
    // Coalesces concurrent refresh attempts into one round trip.
    refresh_gate: tokio::sync::Mutex<()>,
}

impl PortalClient {
    /// Build a client over a token store.
    pub fn new(config: Config, store: Arc<dyn TokenStore>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(ApiError::from_transport)?;

        let auth = AuthApi::new(http.clone(), config.clone());

        Ok(Self {
            http,
            config,
            store,
            auth,
            refresh_gate: tokio::sync::Mutex::new(()),
        })
    }

    /// Build a client whose store follows the configuration: file-backed
    /// when a token file is configured, in-memory otherwise.
    pub fn from_config(config: Config) -> Result<Self, ApiError> {
        let store: Arc<dyn TokenStore> = match &config.token_file {
            Some(path) => Arc::new(FileTokenStore::new(
                path.clone(),
                config.access_token_key.clone(),
                config.refresh_token_key.clone(),
            )),
            None => Arc::new(MemoryTokenStore::new()),
        };
        Self::new(config, store)
    }

    /// The raw auth endpoints (password recovery is reachable pre-session).
    pub fn auth(&self) -> &AuthApi {
        &self.auth
    }

    /// The token store backing this client.
    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    // ========================================================================
    // Session lifecycle
    // ========================================================================

    /// Log in and persist the issued token pair.
    ///
    /// The claims are decoded before anything is stored, so a token the
    /// client cannot interpret never becomes a session.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserInfo, ApiError> {
        let pair = self.auth.login(email, password).await?;
        let user =
            decode_user_info(&pair.access_token).map_err(|e| ApiError::Decode(e.to_string()))?;
        self.store.set(&pair.access_token, &pair.refresh_token)?;
        tracing::info!(user = %user.email, "login successful");
        Ok(user)
    }

    /// Register an account and persist the issued token pair.
    pub async fn register(&self, req: &RegisterRequest) -> Result<UserInfo, ApiError> {
        let pair = self.auth.register(req).await?;
        let user =
            decode_user_info(&pair.access_token).map_err(|e| ApiError::Decode(e.to_string()))?;
        self.store.set(&pair.access_token, &pair.refresh_token)?;
        tracing::info!(user = %user.email, "registration successful");
        Ok(user)
    }

    /// Log out locally: destroy the stored pair. No backend call is made.
    pub fn logout(&self) -> Result<(), ApiError> {
        self.store.clear()?;
        tracing::info!("session cleared on logout");
        Ok(())
    }

    /// Current user derived from the stored access token, if a session exists.
    pub fn current_user(&self) -> Result<Option<UserInfo>, ApiError> {
        match self.store.access_token()? {
            Some(token) => decode_user_info(&token)
                .map(Some)
                .map_err(|e| ApiError::Decode(e.to_string())),
            None => Ok(None),
        }
    }

    // ========================================================================
    // Authenticated user endpoints
    // ========================================================================

    /// GET /users/profile
    pub async fn profile(&self) -> Result<ProfileResponse, ApiError> {
        self.get_json("/users/profile").await
    }

    /// PUT /users/profile
    pub async fn update_profile(
        &self,
        req: &ProfileUpdateRequest,
    ) -> Result<ProfileResponse, ApiError> {
        req.validate()
            .map_err(|e| ApiError::Validation(e.to_string()))?;
        self.put_json("/users/profile", req).await
    }

    /// POST /users/change-password
    pub async fn change_password(
        &self,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), ApiError> {
        let req = ChangePasswordRequest {
            current_password: current_password.to_string(),
            new_password: new_password.to_string(),
        };
        req.validate()
            .map_err(|e| ApiError::Validation(e.to_string()))?;
        self.execute(Method::POST, "/users/change-password", Some(&req))
            .await?;
        Ok(())
    }

    // ========================================================================
    // Typed request helpers
    // ========================================================================

    pub async fn get_json<R: DeserializeOwned>(&self, path: &str) -> Result<R, ApiError> {
        let text = self.execute(Method::GET, path, None::<&()>).await?;
        serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
    }

    pub async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, ApiError>
    where
        B: Serialize,
        R: DeserializeOwned,
    {
        let text = self.execute(Method::POST, path, Some(body)).await?;
        serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
    }

    pub async fn put_json<B, R>(&self, path: &str, body: &B) -> Result<R, ApiError>
    where
        B: Serialize,
        R: DeserializeOwned,
    {
        let text = self.execute(Method::PUT, path, Some(body)).await?;
        serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
    }

    // ========================================================================
    // Pipeline
    // ========================================================================

    /// Send a request through the bearer/refresh pipeline and return the
    /// successful response body.
    async fn execute<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<String, ApiError> {
        let exempt = is_auth_exempt(path);
        let bearer = if exempt {
            None
        } else {
            self.store.access_token()?
        };

        let (status, text) = self.dispatch(&method, path, body, bearer.as_deref()).await?;

        if status != StatusCode::UNAUTHORIZED {
            return if status.is_success() {
                Ok(text)
            } else {
                Err(ApiError::from_response(status, &text))
            };
        }

        // 401 on an exempt path means the credentials themselves were
        // rejected; surface it directly, never refresh.
        if exempt {
            return Err(ApiError::from_response(status, &text));
        }

        self.refresh_session(bearer.as_deref()).await?;

        let token = self
            .store
            .access_token()?
            .ok_or_else(ApiError::session_expired)?;
        let (status, text) = self.dispatch(&method, path, body, Some(&token)).await?;

        if status == StatusCode::UNAUTHORIZED {
            // Retried once already with a freshly rotated token; the session
            // is not recoverable.
            self.store.clear()?;
            tracing::warn!(path, "request rejected after refresh, session cleared");
            return Err(ApiError::session_expired());
        }

        if status.is_success() {
            Ok(text)
        } else {
            Err(ApiError::from_response(status, &text))
        }
    }

    /// One refresh round trip, shared across concurrent callers.
    ///
    /// `stale_access` is the token the failing request carried. A caller that
    /// acquires the gate after another caller already rotated the pair sees a
    /// different stored token and skips its own refresh.
    async fn refresh_session(&self, stale_access: Option<&str>) -> Result<(), ApiError> {
        let _gate = self.refresh_gate.lock().await;

        if let (Some(current), Some(stale)) = (self.store.access_token()?, stale_access) {
            if current != stale {
                tracing::debug!("token already rotated by a concurrent refresh");
                return Ok(());
            }
        }

        let refresh_token = match self.store.refresh_token()? {
            Some(t) => t,
            None => {
                self.store.clear()?;
                return Err(ApiError::session_expired());
            }
        };

        match self.auth.refresh(&refresh_token).await {
            Ok(pair) => {
                // Atomic pair replacement: both tokens rotate together.
                self.store.set(&pair.access_token, &pair.refresh_token)?;
                tracing::info!("access token refreshed");
                Ok(())
            }
            Err(err) => {
                // Any refresh failure is terminal: clear the session and
                // stop, no further refresh is ever attempted.
                self.store.clear()?;
                tracing::warn!(error = %err, "token refresh failed, session cleared");
                Err(ApiError::session_expired())
            }
        }
    }

    async fn dispatch<B: Serialize>(
        &self,
        method: &Method,
        path: &str,
        body: Option<&B>,
        bearer: Option<&str>,
    ) -> Result<(StatusCode, String), ApiError> {
        let mut request = self
            .http
            .request(method.clone(), self.config.endpoint(path));

        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(ApiError::from_transport)?;
        let status = response.status();
        let text = response.text().await.map_err(ApiError::from_transport)?;
        Ok((status, text))
    }
}
