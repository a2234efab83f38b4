//! services/client/src/resources/auth.rs
//!
//! Login and registration. These endpoints are public: no bearer is attached
//! and a 401 is returned to the caller instead of triggering a refresh.

use serde::Deserialize;
use todo_core::domain::{Credentials, Session};
use todo_core::http::HttpRequest;
use todo_core::ports::PortResult;

use crate::gateway::TokenRefreshGateway;

const DEFAULT_TOKEN_TYPE: &str = "Bearer";

//=========================================================================================
// Response Types
//=========================================================================================

/// Body returned by `/login` and `/register`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

impl AuthResponse {
    /// Builds a session, taking identity fields the body lacks from the caller.
    pub fn into_session(self, user_id: String, fallback_email: &str) -> Session {
        Session {
            user_id,
            email: self.email.unwrap_or_else(|| fallback_email.to_string()),
            token_type: self
                .token_type
                .unwrap_or_else(|| DEFAULT_TOKEN_TYPE.to_string()),
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_in: self.expires_in,
        }
    }
}

//=========================================================================================
// Client
//=========================================================================================

#[derive(Clone)]
pub struct AuthClient {
    gateway: TokenRefreshGateway,
}

impl AuthClient {
    pub fn new(gateway: TokenRefreshGateway) -> Self {
        Self { gateway }
    }

    /// POST /login
    pub async fn login(&self, credentials: &Credentials) -> PortResult<AuthResponse> {
        let request = HttpRequest::post("/login", credentials)?;
        self.gateway
            .send_public(&request)
            .await?
            .error_for_status()?
            .json()
    }

    /// POST /register
    ///
    /// Returns `None` when the backend accepts the registration without issuing
    /// tokens, in which case the caller has to log in separately.
    pub async fn register(&self, credentials: &Credentials) -> PortResult<Option<AuthResponse>> {
        let request = HttpRequest::post("/register", credentials)?;
        let response = self
            .gateway
            .send_public(&request)
            .await?
            .error_for_status()?;
        if !response.has_body() {
            return Ok(None);
        }
        let body: serde_json::Value = response.json()?;
        if body.get("accessToken").is_none() {
            return Ok(None);
        }
        response.json().map(Some)
    }
}
