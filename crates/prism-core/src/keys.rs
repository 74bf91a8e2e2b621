//! Storage key conventions.
//!
//! Pure string functions with no storage dependency. These define the canonical
//! layout of session snapshots in whatever key/value backend is configured.

use uuid::Uuid;

pub const SESSIONS_PREFIX: &str = "sessions/";

pub fn sessions_prefix(user_key: &str) -> String {
    format!("{SESSIONS_PREFIX}{}/", sanitize_user_key(user_key))
}

pub fn session(user_key: &str, id: Uuid) -> String {
    format!("{}{id}.json", sessions_prefix(user_key))
}

/// Parse the session id back out of a key produced by [`session`].
pub fn session_id_from_key(key: &str) -> Option<Uuid> {
    let file = key.rsplit('/').next()?;
    let stem = file.strip_suffix(".json")?;
    Uuid::parse_str(stem).ok()
}

/// Restrict a user key to `[A-Za-z0-9_-]` so it is safe as a single path
/// segment in every backend. Anything else becomes `_`.
pub fn sanitize_user_key(user_key: &str) -> String {
    let sanitized: String = user_key
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.is_empty() {
        "_".to_string()
    } else {
        sanitized
    }
}
