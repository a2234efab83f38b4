//! crates/todo_core/src/session_store.rs
//!
//! Holds the current user's session and mirrors its tokens into durable storage.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::domain::{Session, TokenPair};
use crate::ports::PortResult;
use crate::storage::TokenVault;

/// The two states a session store can be in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticated(Session),
}

/// Owns the in-memory session. Durable storage is always written before
/// memory changes, so a failed write leaves the previous state intact.
pub struct SessionStore {
    vault: TokenVault,
    session: Option<Session>,
}

impl SessionStore {
    /// Creates an Anonymous store. Hydration from storage is driven by the caller,
    /// which owns network access.
    pub fn new(vault: TokenVault) -> Self {
        Self {
            vault,
            session: None,
        }
    }

    pub fn login(&mut self, session: Session) -> PortResult<()> {
        self.vault.store(&session.tokens(), session.expires_in)?;
        info!(user_id = %session.user_id, "Session authenticated");
        self.session = Some(session);
        Ok(())
    }

    /// Clears storage, then memory. Logging out while Anonymous still clears
    /// any leftover tokens and is otherwise a no-op.
    pub fn logout(&mut self) -> PortResult<()> {
        self.vault.clear()?;
        if let Some(previous) = self.session.take() {
            info!(user_id = %previous.user_id, "Session cleared");
        }
        Ok(())
    }

    /// Patches identity fields. Returns `false` when there is no session to patch.
    pub fn update_profile(&mut self, user_id: impl Into<String>, email: impl Into<String>) -> bool {
        match self.session.as_mut() {
            Some(session) => {
                session.user_id = user_id.into();
                session.email = email.into();
                debug!(user_id = %session.user_id, "Session profile updated");
                true
            }
            None => false,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    pub fn state(&self) -> SessionState {
        match &self.session {
            Some(session) => SessionState::Authenticated(session.clone()),
            None => SessionState::Anonymous,
        }
    }

    /// The token pair currently in durable storage, which may be newer than the
    /// copy held in the session after a refresh.
    pub fn stored_tokens(&self) -> PortResult<Option<TokenPair>> {
        self.vault.tokens()
    }

    pub fn has_live_access_token(&self, now: DateTime<Utc>) -> PortResult<bool> {
        self.vault.has_live_access_token(now)
    }

    /// Drops tokens that can no longer be used, without touching the in-memory state.
    pub fn discard_stored_tokens(&self) -> PortResult<()> {
        self.vault.clear()
    }

    pub fn vault(&self) -> &TokenVault {
        &self.vault
    }
}
