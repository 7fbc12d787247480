//! DocPortal Client Library
//!
//! Typed client for the doctoral-portal REST backend. This crate owns the
//! authentication and session lifecycle: token storage, the auth endpoints,
//! the bearer-token request pipeline with its single-retry refresh flow, and
//! the navigation guards that gate routes on session state.

pub mod auth;
pub mod config;
pub mod error;
pub mod guards;
pub mod http;
pub mod models;
pub mod session;

pub use auth::AuthApi;
pub use config::Config;
pub use error::ApiError;
pub use http::PortalClient;
pub use session::{FileTokenStore, MemoryTokenStore, Session, TokenStore};
