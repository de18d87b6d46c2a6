use std::fs;
use std::path::{Path, PathBuf};

use core_types::SessionRole;
use tracing::debug;

use crate::cookies::CookieJar;
use crate::role::{SessionUser, derive_role};

/// Read-only view of the session state left on disk by the login flow:
/// `user.json` (cached user object) and `cookies` (a cookie header line).
#[derive(Debug, Clone)]
pub struct SessionCache {
    root: PathBuf,
}

impl SessionCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Cached user blob. Missing or malformed files yield `None`.
    pub fn cached_user(&self) -> Option<SessionUser> {
        let path = self.user_path();
        let raw = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(err) => {
                debug!(path = %path.display(), "ignoring malformed cached user: {err}");
                None
            }
        }
    }

    pub fn cookies(&self) -> CookieJar {
        fs::read_to_string(self.cookies_path())
            .map(|raw| CookieJar::parse(raw.trim()))
            .unwrap_or_default()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            cached_user: self.cached_user(),
            cookies: self.cookies(),
        }
    }

    fn user_path(&self) -> PathBuf {
        self.root.join("user.json")
    }

    fn cookies_path(&self) -> PathBuf {
        self.root.join("cookies")
    }
}

#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    pub cached_user: Option<SessionUser>,
    pub cookies: CookieJar,
}

impl SessionSnapshot {
    pub fn bearer_token(&self, cookie_name: &str) -> Option<&str> {
        self.cookies.bearer_token(cookie_name)
    }

    /// Display role, preferring `user` when the caller already has one.
    pub fn role(&self, user: Option<&SessionUser>, cookie_name: &str) -> Option<SessionRole> {
        derive_role(
            user,
            self.cached_user.as_ref(),
            self.bearer_token(cookie_name),
        )
    }
}

pub fn default_session_dir_from(base_dir: &Path) -> PathBuf {
    base_dir.join("session")
}
