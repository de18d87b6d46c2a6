//! Display-only session role derivation.
//!
//! Nothing in this crate is an authorization boundary. Tokens are decoded,
//! never verified; the backend checks the bearer token on every request.

mod cache;
mod cookies;
mod jwt;
mod role;

pub use cache::{SessionCache, SessionSnapshot, default_session_dir_from};
pub use cookies::CookieJar;
pub use jwt::{decode_payload, role_claim};
pub use role::{SessionUser, derive_role, normalize_role};
