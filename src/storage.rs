//! Session credential storage.
//!
//! The bearer token and user profile live in the local store under the same
//! keys the web dashboard used for browser storage. The login flow is the only
//! writer; logout and any 401 clear all three keys together.

use tracing::{info, warn};

use crate::db::DbState;
use crate::models::{Session, User};

// Credential keys
pub const KEY_AUTH_TOKEN: &str = "auth_token";
pub const KEY_USER_DATA: &str = "user_data";
pub const KEY_USER_ROLE: &str = "user_role";

/// All session keys managed by this module.
pub const SESSION_KEYS: &[&str] = &[KEY_AUTH_TOKEN, KEY_USER_DATA, KEY_USER_ROLE];

const DEFAULT_ROLE: &str = "owner";

// ---------------------------------------------------------------------------
// Low-level helpers
// ---------------------------------------------------------------------------

/// Retrieve a single credential. Returns `None` when the key does not exist
/// or the store cannot be read.
pub fn get_credential(db: &DbState, key: &str) -> Option<String> {
    match db.read(key) {
        Ok(v) => v,
        Err(e) => {
            warn!(key, error = %e, "credential store: failed to read");
            None
        }
    }
}

pub fn set_credential(db: &DbState, key: &str, value: &str) -> Result<(), String> {
    db.write(key, value)
}

pub fn delete_credential(db: &DbState, key: &str) -> Result<(), String> {
    db.remove(key)
}

// ---------------------------------------------------------------------------
// High-level API
// ---------------------------------------------------------------------------

/// Non-empty bearer token, if any.
pub fn token(db: &DbState) -> Option<String> {
    get_credential(db, KEY_AUTH_TOKEN)
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

pub fn has_session(db: &DbState) -> bool {
    token(db).is_some()
}

/// Stored user profile. A corrupt `user_data` value reads as `None`.
pub fn user(db: &DbState) -> Option<User> {
    let raw = get_credential(db, KEY_USER_DATA)?;
    match serde_json::from_str::<User>(&raw) {
        Ok(u) => Some(u),
        Err(e) => {
            warn!(error = %e, "credential store: user_data is not valid JSON");
            None
        }
    }
}

pub fn role(db: &DbState) -> Option<String> {
    get_credential(db, KEY_USER_ROLE)
}

/// Persist a freshly issued session. The role defaults to `owner`.
pub fn save_session(db: &DbState, session: &Session) -> Result<(), String> {
    if session.token.trim().is_empty() {
        return Err("Refusing to store an empty token".to_string());
    }
    set_credential(db, KEY_AUTH_TOKEN, session.token.trim())?;

    let user_json = match &session.user {
        Some(u) => serde_json::to_string(u).map_err(|e| format!("serialize user: {e}"))?,
        None => "null".to_string(),
    };
    set_credential(db, KEY_USER_DATA, &user_json)?;

    let role = session
        .user
        .as_ref()
        .and_then(|u| u.role.as_deref())
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or(DEFAULT_ROLE);
    set_credential(db, KEY_USER_ROLE, role)?;

    info!(role, "session stored");
    Ok(())
}

/// Delete every session key. Silently succeeds for keys that are absent.
pub fn clear_session(db: &DbState) -> Result<(), String> {
    for key in SESSION_KEYS {
        delete_credential(db, key)?;
    }
    info!("session cleared");
    Ok(())
}
