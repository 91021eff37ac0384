//! Small shared value types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who performed an action. Defaults to the OS user when the caller does not
/// supply one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor(pub String);

impl Actor {
    pub fn current_user() -> Self {
        Self(whoami::username())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Actor {
    fn default() -> Self {
        Self::current_user()
    }
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Actor {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Derive the 12-character slug used in archive paths from a UUID.
///
/// Stable for the lifetime of the record: first 12 hex characters of the
/// simple (dashless) form.
pub fn short_id(id: Uuid) -> String {
    let mut buf = [0u8; 32];
    let s = id.simple().encode_lower(&mut buf);
    s[..12].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_id_is_twelve_hex_chars() {
        let id = Uuid::new_v4();
        let s = short_id(id);
        assert_eq!(s.len(), 12);
        assert!(s.chars().all(|c| c.is_ascii_hexdigit()));
        // Deterministic
        assert_eq!(s, short_id(id));
    }
}
