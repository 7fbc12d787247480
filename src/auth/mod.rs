//! Authentication module for the DocPortal client
//!
//! Provides the raw auth endpoints (login, register, refresh, password
//! recovery) and access-token claims decoding. Calls here are single round
//! trips with no retry baked in; the retry policy lives in the request
//! pipeline, not here.

mod api;
pub mod claims;

pub use api::AuthApi;
pub use claims::{decode_user_info, AccessClaims, ClaimsError};
