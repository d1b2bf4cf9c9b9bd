use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::warn;

use crate::models::Session;

/// Runtime configuration read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_url: String,
    pub api_key: String,
    /// Base URL of the hosted checkout page. Payments are disabled when unset.
    pub checkout_url: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let api_url = env::var("KERBSIDE_API_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:54321".to_string());
        let api_key = env::var("KERBSIDE_API_KEY").unwrap_or_default();
        let checkout_url = env::var("KERBSIDE_CHECKOUT_URL")
            .ok()
            .filter(|raw| !raw.trim().is_empty());
        Self {
            api_url,
            api_key,
            checkout_url,
        }
    }
}

/// Directory for client-side state (cached session token).
pub fn state_dir() -> PathBuf {
    if let Some(home) = dirs::home_dir() {
        home.join(".kerbside")
    } else {
        PathBuf::from(".kerbside")
    }
}

pub fn session_path() -> PathBuf {
    state_dir().join("session.json")
}

/// Restore the cached session, if any. A corrupt cache file is treated as
/// signed-out rather than an error.
pub fn load_session(path: &Path) -> Option<Session> {
    let raw = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&raw) {
        Ok(session) => Some(session),
        Err(err) => {
            warn!("ignoring unreadable session cache: {err}");
            None
        }
    }
}

/// Persist the session, or remove the cache when signing out.
pub fn store_session(path: &Path, session: Option<&Session>) -> Result<()> {
    match session {
        Some(session) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create state directory {}", parent.display())
                })?;
            }
            let raw = serde_json::to_string_pretty(session)?;
            std::fs::write(path, raw)
                .with_context(|| format!("failed to write session cache {}", path.display()))
        }
        None => {
            if path.exists() {
                std::fs::remove_file(path).with_context(|| {
                    format!("failed to remove session cache {}", path.display())
                })?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AuthUser;

    fn sample_session() -> Session {
        Session {
            access_token: "token-123".into(),
            refresh_token: Some("refresh-456".into()),
            user: AuthUser {
                id: "user-1".into(),
                email: "seller@example.com".into(),
            },
        }
    }

    #[test]
    fn session_cache_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("session.json");

        store_session(&path, Some(&sample_session())).expect("store");
        let restored = load_session(&path).expect("session restored");
        assert_eq!(restored.access_token, "token-123");
        assert_eq!(restored.user.email, "seller@example.com");

        store_session(&path, None).expect("clear");
        assert!(!path.exists());
        assert!(load_session(&path).is_none());
    }

    #[test]
    fn corrupt_cache_reads_as_signed_out() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("session.json");
        std::fs::write(&path, "not json").expect("write");
        assert!(load_session(&path).is_none());
    }
}
