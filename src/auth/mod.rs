//! Bearer-token authentication with role-based access control.
//!
//! Access tokens are short-lived and stateless; they travel in the
//! `Authorization: Bearer` header and are verified per request. Refresh tokens
//! live in an HTTP-only cookie and are exchanged at the refresh endpoint.

mod cookie;
mod errors;
mod ip;
mod middleware;
mod types;

pub use cookie::{REFRESH_COOKIE_NAME, clear_refresh_cookie, get_cookie, refresh_cookie};
pub use errors::AuthError;
pub use ip::{HasHeadersAndExtensions, extract_client_ip};
pub use middleware::{auth_and_role, authenticate, authorize, require_auth, require_role};
pub use types::{ADMIN_ONLY, AllowedRoles, AuthGuard, Identity, STAFF};
