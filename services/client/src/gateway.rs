//! services/client/src/gateway.rs
//!
//! The token refresh gateway: the single path every authenticated request takes.
//!
//! It attaches the stored access token, and when the backend answers 401 it
//! exchanges the stored refresh token for a new access token and re-issues the
//! original request exactly once. Refreshes are single-flight: concurrent callers
//! that hit a 401 wait for the refresh in progress and reuse its outcome, whether
//! that is a new token or a failure.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use todo_core::http::{HttpRequest, HttpResponse};
use todo_core::ports::{HttpTransport, PortResult};
use todo_core::storage::TokenVault;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub const REFRESH_PATH: &str = "/refresh";

//=========================================================================================
// Refresh Payloads
//=========================================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    #[serde(default)]
    pub token_type: Option<String>,
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

//=========================================================================================
// Gateway
//=========================================================================================

#[derive(Clone)]
pub struct TokenRefreshGateway {
    transport: Arc<dyn HttpTransport>,
    vault: TokenVault,
    refresh_lock: Arc<Mutex<()>>,
    // Bumped under `refresh_lock` after every refresh attempt.
    refresh_generation: Arc<AtomicU64>,
}

impl TokenRefreshGateway {
    pub fn new(transport: Arc<dyn HttpTransport>, vault: TokenVault) -> Self {
        Self {
            transport,
            vault,
            refresh_lock: Arc::new(Mutex::new(())),
            refresh_generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Sends an authenticated request, refreshing the access token at most once.
    ///
    /// The returned response is the retried call's when a refresh succeeded, or
    /// the original response otherwise (including an unrefreshable 401).
    pub async fn send(&self, request: &HttpRequest) -> PortResult<HttpResponse> {
        let token = self.vault.access_token()?;
        let generation = self.refresh_generation.load(Ordering::Acquire);
        debug!(method = %request.method, path = %request.path, "Sending authenticated request");
        let response = self.transport.execute(request, token.as_deref()).await?;
        if !response.is_unauthorized() {
            return Ok(response);
        }

        match self.refreshed_token(token.as_deref(), generation).await {
            Some(fresh) => {
                debug!(method = %request.method, path = %request.path, "Retrying with refreshed token");
                self.transport.execute(request, Some(&fresh)).await
            }
            None => Ok(response),
        }
    }

    /// Sends a request without credentials and without refresh handling.
    pub async fn send_public(&self, request: &HttpRequest) -> PortResult<HttpResponse> {
        debug!(method = %request.method, path = %request.path, "Sending public request");
        self.transport.execute(request, None).await
    }

    /// Sends a request with an explicit bearer, ignoring stored tokens and
    /// without refresh handling.
    pub async fn send_with_bearer(
        &self,
        request: &HttpRequest,
        bearer: &str,
    ) -> PortResult<HttpResponse> {
        debug!(method = %request.method, path = %request.path, "Sending request with explicit bearer");
        self.transport.execute(request, Some(bearer)).await
    }

    /// Returns a usable access token after `stale` was rejected, or `None` if
    /// none can be obtained. `generation` is the refresh generation observed
    /// before the rejected request was sent.
    async fn refreshed_token(&self, stale: Option<&str>, generation: u64) -> Option<String> {
        let _guard = self.refresh_lock.lock().await;

        // Another caller may have refreshed while this one waited for the lock.
        match self.vault.access_token() {
            Ok(Some(current)) if Some(current.as_str()) != stale => return Some(current),
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "Could not read stored access token");
                return None;
            }
        }
        // A refresh attempted since the request went out failed; share that outcome.
        if self.refresh_generation.load(Ordering::Acquire) != generation {
            debug!("Token refresh already failed for this token");
            return None;
        }

        let outcome = self.refresh().await;
        self.refresh_generation.fetch_add(1, Ordering::Release);
        outcome
    }

    async fn refresh(&self) -> Option<String> {
        let refresh_token = match self.vault.refresh_token() {
            Ok(Some(token)) => token,
            Ok(None) => {
                info!("Access token rejected and no refresh token is stored");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "Could not read stored refresh token");
                return None;
            }
        };

        info!("Access token rejected, refreshing");
        match self.request_refresh(&refresh_token).await {
            Ok(refreshed) => {
                if let Err(e) = self.vault.store_refreshed(
                    &refreshed.access_token,
                    refreshed.refresh_token.as_deref(),
                    refreshed.expires_in,
                ) {
                    warn!(error = %e, "Refreshed token could not be persisted");
                    return None;
                }
                info!("Access token refreshed");
                Some(refreshed.access_token)
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed");
                None
            }
        }
    }

    async fn request_refresh(&self, refresh_token: &str) -> PortResult<RefreshResponse> {
        let request = HttpRequest::post(REFRESH_PATH, &RefreshRequest { refresh_token })?;
        self.transport
            .execute(&request, None)
            .await?
            .error_for_status()?
            .json()
    }
}
