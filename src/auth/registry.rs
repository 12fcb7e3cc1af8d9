//! User registry
//!
//! In-memory table of users registered through `FtpServer::add_user`.
//! Logins are accepted for any username by default; the registry is only
//! consulted when the server is configured to enforce it.

use log::info;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::error::AuthError;

/// Longest username accepted on the wire.
pub const MAX_USERNAME_LENGTH: usize = 64;

/// Performs basic input sanitation on a username or password.
fn is_valid_input(input: &str, max_length: usize) -> bool {
    !input.trim().is_empty() && input.len() <= max_length && !input.contains(['\r', '\n', '\0'])
}

/// Registered users and their passwords.
#[derive(Debug, Default)]
pub struct UserRegistry {
    users: RwLock<HashMap<String, String>>,
}

impl UserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `username`, replacing the password of an existing entry.
    pub fn add_user(&self, username: &str, password: &str) {
        let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
        users.insert(username.to_string(), password.to_string());
        info!("Registered user {}", username);
    }

    pub fn contains(&self, username: &str) -> bool {
        self.users
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(username)
    }

    pub fn len(&self) -> usize {
        self.users.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Checks a USER argument.
    ///
    /// Malformed names are always rejected. When `enforce` is false every
    /// well-formed name is accepted, registered or not.
    pub fn validate_user(&self, username: &str, enforce: bool) -> Result<(), AuthError> {
        if !is_valid_input(username, MAX_USERNAME_LENGTH) {
            return Err(AuthError::MalformedInput("Invalid username format".into()));
        }

        if !enforce || self.contains(username) {
            Ok(())
        } else {
            Err(AuthError::UserNotFound(username.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_any_user_accepted_without_enforcement() {
        let registry = UserRegistry::new();
        assert!(registry.validate_user("anyone", false).is_ok());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_enforced_registry() {
        let registry = UserRegistry::new();
        registry.add_user("alice", "alice123");

        assert!(registry.validate_user("alice", true).is_ok());
        assert!(matches!(
            registry.validate_user("mallory", true),
            Err(AuthError::UserNotFound(_))
        ));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_malformed_usernames() {
        let registry = UserRegistry::new();
        assert!(matches!(
            registry.validate_user("", false),
            Err(AuthError::MalformedInput(_))
        ));
        assert!(registry.validate_user(&"x".repeat(MAX_USERNAME_LENGTH + 1), false).is_err());
    }
}
