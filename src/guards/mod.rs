//! Navigation guards
//!
//! Pure predicates evaluated before entering a route. `auth_guard` gates on
//! session presence, `role_guard` on role membership. Routes that declare no
//! required role still require authentication; they are not public.

use crate::models::{Role, UserInfo};
use crate::session::TokenStore;

/// Login route, target of unauthenticated redirects
pub const LOGIN_ROUTE: &str = "/login";

/// Route shown when the user lacks the required role
pub const UNAUTHORIZED_ROUTE: &str = "/unauthorized";

/// Outcome of a guard evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect(String),
}

impl GuardDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GuardDecision::Allow)
    }
}

/// Redirect to the login route, preserving the attempted URL.
fn login_redirect(attempted_url: &str) -> GuardDecision {
    let encoded: String =
        url::form_urlencoded::byte_serialize(attempted_url.as_bytes()).collect();
    GuardDecision::Redirect(format!("{}?returnUrl={}", LOGIN_ROUTE, encoded))
}

/// Allow navigation iff a session is stored.
pub fn auth_guard(store: &dyn TokenStore, attempted_url: &str) -> GuardDecision {
    if store.has_session() {
        GuardDecision::Allow
    } else {
        tracing::debug!(attempted_url, "auth guard rejected navigation");
        login_redirect(attempted_url)
    }
}

/// Allow navigation iff the user holds one of the route's required roles.
///
/// An empty requirement means any authenticated user may enter. An
/// unauthenticated user is always sent to login, whatever the requirement.
pub fn role_guard(
    required: &[Role],
    user: Option<&UserInfo>,
    attempted_url: &str,
) -> GuardDecision {
    let Some(user) = user else {
        tracing::debug!(attempted_url, "role guard rejected unauthenticated navigation");
        return login_redirect(attempted_url);
    };

    if required.is_empty() || user.has_any_role(required) {
        GuardDecision::Allow
    } else {
        tracing::debug!(
            attempted_url,
            required = ?required,
            held = ?user.roles,
            "role guard rejected navigation"
        );
        GuardDecision::Redirect(UNAUTHORIZED_ROUTE.to_string())
    }
}
