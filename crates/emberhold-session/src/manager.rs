//! The session manager: which connections are live, and who they are.
//!
//! A connection is registered as soon as it is accepted, gets an account
//! once the login dialog succeeds, and is removed when its handler
//! finishes. The manager also holds each session's hangup token so a
//! server shutdown can end every session at once.
//!
//! # Concurrency note
//!
//! `SessionManager` uses a plain `HashMap`; the server keeps it behind a
//! `tokio::sync::Mutex` in its shared state.

use std::collections::HashMap;
use std::time::Instant;

use emberhold_protocol::AccountName;
use emberhold_transport::ConnectionId;
use tokio_util::sync::CancellationToken;

use crate::SessionError;

struct Tracked {
    account: Option<AccountName>,
    hangup: CancellationToken,
    connected_at: Instant,
}

/// Registry of live sessions.
///
/// ```text
/// register() ──→ login() ──→ remove()
///     │                         ▲
///     └──── (failed login) ─────┘
/// ```
#[derive(Default)]
pub struct SessionManager {
    sessions: HashMap<ConnectionId, Tracked>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking a freshly accepted connection.
    pub fn register(&mut self, id: ConnectionId, hangup: CancellationToken) {
        self.sessions.insert(
            id,
            Tracked {
                account: None,
                hangup,
                connected_at: Instant::now(),
            },
        );
        tracing::debug!(%id, "session registered");
    }

    /// Binds an authenticated account to a connection.
    ///
    /// # Errors
    /// - [`SessionError::NotFound`] if `id` was never registered
    /// - [`SessionError::AlreadyConnected`] if another connection is
    ///   logged in as `account`
    pub fn login(&mut self, id: ConnectionId, account: AccountName) -> Result<(), SessionError> {
        if self.is_logged_in(&account) {
            return Err(SessionError::AlreadyConnected(account));
        }
        let tracked = self.sessions.get_mut(&id).ok_or(SessionError::NotFound(id))?;
        tracing::info!(%id, %account, "account logged in");
        tracked.account = Some(account);
        Ok(())
    }

    /// The account a connection is logged in as.
    pub fn account(&self, id: ConnectionId) -> Option<&AccountName> {
        self.sessions.get(&id).and_then(|t| t.account.as_ref())
    }

    pub fn is_logged_in(&self, account: &AccountName) -> bool {
        self.sessions
            .values()
            .any(|t| t.account.as_ref() == Some(account))
    }

    /// Stops tracking a connection. Returns the account it was logged in
    /// as, if any.
    pub fn remove(&mut self, id: ConnectionId) -> Option<AccountName> {
        let tracked = self.sessions.remove(&id)?;
        tracing::debug!(
            %id,
            secs = tracked.connected_at.elapsed().as_secs(),
            "session removed"
        );
        tracked.account
    }

    /// Hangs up every tracked session. Returns how many were signalled.
    pub fn hangup_all(&self) -> usize {
        for tracked in self.sessions.values() {
            tracked.hangup.cancel();
        }
        self.sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn(n: u64) -> ConnectionId {
        ConnectionId::new(n)
    }

    #[test]
    fn test_login_binds_account() {
        let mut mgr = SessionManager::new();
        mgr.register(conn(1), CancellationToken::new());
        mgr.login(conn(1), AccountName::new("wren")).unwrap();
        assert_eq!(mgr.account(conn(1)).map(|a| a.as_str()), Some("wren"));
        assert!(mgr.is_logged_in(&AccountName::new("wren")));
    }

    #[test]
    fn test_login_twice_on_two_connections_is_rejected() {
        let mut mgr = SessionManager::new();
        mgr.register(conn(1), CancellationToken::new());
        mgr.register(conn(2), CancellationToken::new());
        mgr.login(conn(1), AccountName::new("wren")).unwrap();

        let err = mgr.login(conn(2), AccountName::new("wren")).unwrap_err();
        assert!(matches!(err, SessionError::AlreadyConnected(_)));
        assert_eq!(mgr.account(conn(2)), None);
    }

    #[test]
    fn test_login_unknown_connection_is_not_found() {
        let mut mgr = SessionManager::new();
        let err = mgr.login(conn(9), AccountName::new("wren")).unwrap_err();
        assert!(matches!(err, SessionError::NotFound(_)));
    }

    #[test]
    fn test_remove_frees_the_account() {
        let mut mgr = SessionManager::new();
        mgr.register(conn(1), CancellationToken::new());
        mgr.login(conn(1), AccountName::new("wren")).unwrap();

        assert_eq!(mgr.remove(conn(1)), Some(AccountName::new("wren")));
        assert!(mgr.is_empty());
        assert!(!mgr.is_logged_in(&AccountName::new("wren")));
        assert_eq!(mgr.remove(conn(1)), None);
    }

    #[test]
    fn test_hangup_all_cancels_every_token() {
        let mut mgr = SessionManager::new();
        let a = CancellationToken::new();
        let b = CancellationToken::new();
        mgr.register(conn(1), a.clone());
        mgr.register(conn(2), b.clone());

        assert_eq!(mgr.hangup_all(), 2);
        assert!(a.is_cancelled() && b.is_cancelled());
    }
}
