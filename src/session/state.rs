//! Session State
//!
//! Bookkeeping states of an [`AuthSession`](super::AuthSession).

use std::fmt;

/// Lifecycle state of a session.
///
/// ```text
/// Unauthenticated --authenticate/refresh--> Authenticated --revoke--> Revoked
///        ^                                        |
///        +------------- token cache miss ---------+
/// ```
///
/// `refresh` is valid from every state and always lands in `Authenticated`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SessionState {
    #[default]
    Unauthenticated,
    Authenticated,
    /// Remote revocation succeeded. Local storage is left untouched.
    Revoked,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Authenticated => "authenticated",
            Self::Revoked => "revoked",
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state() {
        assert_eq!(SessionState::default(), SessionState::Unauthenticated);
        assert!(!SessionState::default().is_authenticated());
    }

    #[test]
    fn test_display() {
        assert_eq!(SessionState::Authenticated.to_string(), "authenticated");
        assert_eq!(SessionState::Revoked.as_str(), "revoked");
    }
}
