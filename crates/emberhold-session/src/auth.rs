//! Authentication hook for validating player identity.
//!
//! Emberhold doesn't implement authentication itself; that belongs to an
//! identity provider. The login dialog collects a username and password
//! and hands them to an [`Authenticator`], which answers with the
//! [`AccountName`] the player is logged in as, or an error.

use std::collections::HashMap;

use emberhold_protocol::AccountName;

use crate::SessionError;

/// What the login dialog collected.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

// Never print the password, not even at trace level.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Validates a player's credentials and returns their account.
///
/// # Example
///
/// ```rust
/// use emberhold_protocol::AccountName;
/// use emberhold_session::{Authenticator, Credentials, SessionError};
///
/// /// Lets anyone in whose password is their name backwards.
/// struct Mirror;
///
/// impl Authenticator for Mirror {
///     async fn authenticate(
///         &self,
///         creds: &Credentials,
///     ) -> Result<AccountName, SessionError> {
///         let reversed: String = creds.username.chars().rev().collect();
///         if creds.password == reversed {
///             Ok(AccountName::new(&creds.username))
///         } else {
///             Err(SessionError::AuthFailed("bad password".into()))
///         }
///     }
/// }
/// ```
pub trait Authenticator: Send + Sync + 'static {
    /// Returns `Err(SessionError::AuthFailed)` when the credentials are
    /// rejected. The message is logged, never shown to the player.
    fn authenticate(
        &self,
        creds: &Credentials,
    ) -> impl std::future::Future<Output = Result<AccountName, SessionError>> + Send;
}

/// A fixed table of usernames and passwords.
///
/// For development servers and tests.
#[derive(Debug, Default, Clone)]
pub struct StaticAuthenticator {
    users: HashMap<String, String>,
}

impl StaticAuthenticator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.users.insert(username.into(), password.into());
        self
    }
}

impl Authenticator for StaticAuthenticator {
    async fn authenticate(&self, creds: &Credentials) -> Result<AccountName, SessionError> {
        match self.users.get(&creds.username) {
            Some(pw) if *pw == creds.password => Ok(AccountName::new(&creds.username)),
            Some(_) => Err(SessionError::AuthFailed(format!(
                "wrong password for {}",
                creds.username
            ))),
            None => Err(SessionError::AuthFailed(format!(
                "unknown user {}",
                creds.username
            ))),
        }
    }
}
