use core_types::SessionRole;
use serde::{Deserialize, Serialize};

use crate::jwt::role_claim;

/// User object as returned by the backend, or as cached after login.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct SessionUser {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// Maps `owner|admin|member` (any case) to the canonical role; any other
/// non-blank string is kept as-is.
pub fn normalize_role(raw: &str) -> Option<SessionRole> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(match trimmed.to_ascii_lowercase().as_str() {
        "owner" => SessionRole::Owner,
        "admin" => SessionRole::Admin,
        "member" => SessionRole::Member,
        _ => SessionRole::Other(trimmed.to_string()),
    })
}

/// Display role for UI gating. Explicit user beats cached user beats token.
///
/// Advisory only: this never grants anything, the backend authorizes every
/// mutating call from the bearer token itself.
pub fn derive_role(
    user: Option<&SessionUser>,
    cached_user: Option<&SessionUser>,
    token: Option<&str>,
) -> Option<SessionRole> {
    role_of(user)
        .or_else(|| role_of(cached_user))
        .map(str::to_owned)
        .or_else(|| token.and_then(role_claim))
        .and_then(|raw| normalize_role(&raw))
}

fn role_of(user: Option<&SessionUser>) -> Option<&str> {
    user.and_then(|u| u.role.as_deref())
        .filter(|role| !role.trim().is_empty())
}
