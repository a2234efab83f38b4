//! crates/todo_core/src/storage.rs
//!
//! Named-key access to durable storage, plus an in-process implementation of
//! the `DurableStorage` port.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::domain::TokenPair;
use crate::ports::{DurableStorage, PortError, PortResult};

pub const ACCESS_TOKEN_KEY: &str = "accessToken";
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";
pub const ACCESS_TOKEN_EXPIRES_AT_KEY: &str = "accessTokenExpiresAt";

const TOKEN_KEYS: [&str; 3] = [
    ACCESS_TOKEN_KEY,
    REFRESH_TOKEN_KEY,
    ACCESS_TOKEN_EXPIRES_AT_KEY,
];

//=========================================================================================
// TokenVault
//=========================================================================================

/// The token entries of durable storage.
///
/// Shared by the session store and the refresh gateway. Tokens are always
/// written together in a single `DurableStorage` call.
#[derive(Clone)]
pub struct TokenVault {
    storage: Arc<dyn DurableStorage>,
}

impl TokenVault {
    pub fn new(storage: Arc<dyn DurableStorage>) -> Self {
        Self { storage }
    }

    pub fn access_token(&self) -> PortResult<Option<String>> {
        self.storage.get(ACCESS_TOKEN_KEY)
    }

    pub fn refresh_token(&self) -> PortResult<Option<String>> {
        self.storage.get(REFRESH_TOKEN_KEY)
    }

    /// Both tokens, or `None` unless both are present.
    pub fn tokens(&self) -> PortResult<Option<TokenPair>> {
        let access = self.access_token()?;
        let refresh = self.refresh_token()?;
        Ok(access.zip(refresh).map(|(access_token, refresh_token)| TokenPair {
            access_token,
            refresh_token,
        }))
    }

    pub fn access_token_expires_at(&self) -> PortResult<Option<DateTime<Utc>>> {
        let Some(raw) = self.storage.get(ACCESS_TOKEN_EXPIRES_AT_KEY)? else {
            return Ok(None);
        };
        DateTime::parse_from_rfc3339(&raw)
            .map(|at| Some(at.with_timezone(&Utc)))
            .map_err(|e| PortError::Storage(format!("Invalid token expiry '{raw}': {e}")))
    }

    /// True when an access token is stored and not known to be expired.
    /// A token without a recorded expiry counts as live.
    pub fn has_live_access_token(&self, now: DateTime<Utc>) -> PortResult<bool> {
        if self.access_token()?.is_none() {
            return Ok(false);
        }
        Ok(match self.access_token_expires_at()? {
            Some(expires_at) => expires_at > now,
            None => true,
        })
    }

    /// Writes both tokens and, when known, the access token's expiry.
    pub fn store(&self, tokens: &TokenPair, expires_in: Option<u64>) -> PortResult<()> {
        self.write(
            &tokens.access_token,
            Some(tokens.refresh_token.as_str()),
            expires_in,
        )
    }

    /// Writes a refreshed access token, keeping the stored refresh token unless
    /// the backend rotated it.
    pub fn store_refreshed(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
        expires_in: Option<u64>,
    ) -> PortResult<()> {
        self.write(access_token, refresh_token, expires_in)
    }

    pub fn clear(&self) -> PortResult<()> {
        self.storage.remove_many(&TOKEN_KEYS)
    }

    fn write(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
        expires_in: Option<u64>,
    ) -> PortResult<()> {
        let expires_at = expires_in
            .and_then(|secs| {
                let lifetime = Duration::try_seconds(i64::try_from(secs).ok()?)?;
                Utc::now().checked_add_signed(lifetime)
            })
            .map(|at| at.to_rfc3339());

        let mut entries = vec![(ACCESS_TOKEN_KEY, access_token)];
        if let Some(refresh_token) = refresh_token {
            entries.push((REFRESH_TOKEN_KEY, refresh_token));
        }
        // A new token without a known lifetime must not inherit the old expiry.
        let removed: &[&str] = match expires_at.as_deref() {
            Some(expires_at) => {
                entries.push((ACCESS_TOKEN_EXPIRES_AT_KEY, expires_at));
                &[]
            }
            None => &[ACCESS_TOKEN_EXPIRES_AT_KEY],
        };
        self.storage.apply(&entries, removed)
    }
}

//=========================================================================================
// MemoryStorage
//=========================================================================================

/// Durable storage that lives for the lifetime of the process.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> PortResult<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| PortError::Storage("memory storage lock poisoned".to_string()))
    }
}

impl DurableStorage for MemoryStorage {
    fn get(&self, key: &str) -> PortResult<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn apply(&self, entries: &[(&str, &str)], removed: &[&str]) -> PortResult<()> {
        let mut map = self.lock()?;
        for (key, value) in entries {
            map.insert((*key).to_string(), (*value).to_string());
        }
        for key in removed {
            map.remove(*key);
        }
        Ok(())
    }
}
