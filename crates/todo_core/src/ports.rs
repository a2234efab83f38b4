//! crates/todo_core/src/ports.rs
//!
//! Defines the service contracts (traits) the core relies on.
//! These traits form the boundary of the hexagonal architecture, allowing the stores
//! and the request logic to be independent of a concrete HTTP stack or storage medium.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;

use crate::http::{HttpRequest, HttpResponse};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// Field-level validation messages, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(pub BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn messages(&self) -> impl Iterator<Item = String> + '_ {
        self.0.iter().flat_map(|(field, messages)| {
            messages.iter().map(move |message| format!("{field}: {message}"))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self.messages().collect::<Vec<_>>().join("; ");
        f.write_str(&joined)
    }
}

/// The error type for all port operations.
/// Every failure a caller can observe maps to exactly one of these kinds.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

impl PortError {
    /// A stale local reference is reconciled on the next fetch, so it is not fatal.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::NotFound(_))
    }

    /// Whether retrying later could succeed without the user re-authenticating.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Executes one request against the backend.
    ///
    /// Any response that arrives, whatever its status, is `Ok`. Only a missing
    /// response (connect failure, timeout, broken body) is `PortError::Network`.
    async fn execute(
        &self,
        request: &HttpRequest,
        bearer: Option<&str>,
    ) -> PortResult<HttpResponse>;
}

/// Persistent key-value storage that survives process restarts.
///
/// A batch of writes and removals must be applied as a whole or not at all.
pub trait DurableStorage: Send + Sync {
    fn get(&self, key: &str) -> PortResult<Option<String>>;

    /// Sets `entries` and removes `removed` in one step.
    fn apply(&self, entries: &[(&str, &str)], removed: &[&str]) -> PortResult<()>;

    fn set_many(&self, entries: &[(&str, &str)]) -> PortResult<()> {
        self.apply(entries, &[])
    }

    fn remove_many(&self, keys: &[&str]) -> PortResult<()> {
        self.apply(&[], keys)
    }
}
