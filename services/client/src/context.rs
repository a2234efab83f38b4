//! services/client/src/context.rs
//!
//! The application context: owns the session store, the todo store and the
//! resource clients, and is passed explicitly to whatever front end drives it.
//!
//! Lifecycle: `initialize` hydrates the session from durable storage,
//! `logout` tears it down. Store mutations only happen after the matching
//! server call succeeded.

use chrono::Utc;
use std::sync::Arc;
use todo_core::domain::{Credentials, NewTodoItem, Session, TodoItem, UserInformation};
use todo_core::ports::{DurableStorage, HttpTransport, PortError, PortResult};
use todo_core::session_store::SessionStore;
use todo_core::storage::TokenVault;
use todo_core::todo_store::TodoStore;
use tracing::{info, warn};

use crate::adapters::{FileStorage, ReqwestTransport};
use crate::config::Config;
use crate::error::ClientError;
use crate::gateway::TokenRefreshGateway;
use crate::resources::{AuthClient, AuthResponse, TodoClient, UserClient};

pub struct AppContext {
    session: SessionStore,
    todos: TodoStore,
    auth: AuthClient,
    users: UserClient,
    todo_client: TodoClient,
}

impl AppContext {
    /// Builds a context talking HTTP to the configured backend, with tokens in
    /// the configured file.
    pub fn new(config: &Config) -> Result<Self, ClientError> {
        let transport = ReqwestTransport::new(config.api_base_url.clone(), config.http_timeout)?;
        let storage = FileStorage::new(config.token_store_path.clone());
        Ok(Self::with_parts(Arc::new(transport), Arc::new(storage)))
    }

    /// Builds a context from explicit port implementations.
    pub fn with_parts(transport: Arc<dyn HttpTransport>, storage: Arc<dyn DurableStorage>) -> Self {
        let vault = TokenVault::new(storage);
        let gateway = TokenRefreshGateway::new(transport, vault.clone());
        Self {
            session: SessionStore::new(vault),
            todos: TodoStore::new(),
            auth: AuthClient::new(gateway.clone()),
            users: UserClient::new(gateway.clone()),
            todo_client: TodoClient::new(gateway),
        }
    }

    //=====================================================================================
    // Session Lifecycle
    //=====================================================================================

    /// Restores a session from durable storage when it holds a live access token.
    /// Returns whether the context ended up authenticated. Unreadable stored
    /// tokens leave the context anonymous instead of failing.
    pub async fn initialize(&mut self) -> PortResult<bool> {
        if self.session.is_authenticated() {
            return Ok(true);
        }
        match self.session.has_live_access_token(Utc::now()) {
            Ok(true) => {}
            Ok(false) => return Ok(false),
            Err(PortError::Storage(reason)) => return self.abandon_stored_session(&reason),
            Err(e) => return Err(e),
        }

        match self.users.own_details().await {
            Ok(user) => {
                // The gateway may have rotated tokens while fetching the user.
                let tokens = match self.session.stored_tokens() {
                    Ok(Some(tokens)) => tokens,
                    Ok(None) => return self.abandon_stored_session("no refresh token stored"),
                    Err(PortError::Storage(reason)) => return self.abandon_stored_session(&reason),
                    Err(e) => return Err(e),
                };
                let expires_in = self
                    .session
                    .vault()
                    .access_token_expires_at()
                    .ok()
                    .flatten()
                    .and_then(|at| u64::try_from((at - Utc::now()).num_seconds()).ok());
                self.session.login(Session {
                    user_id: user.id,
                    email: user.email,
                    token_type: "Bearer".to_string(),
                    access_token: tokens.access_token,
                    refresh_token: tokens.refresh_token,
                    expires_in,
                })?;
                Ok(true)
            }
            Err(PortError::Unauthorized(reason)) => {
                info!(%reason, "Stored session is no longer valid");
                self.session.discard_stored_tokens()?;
                Ok(false)
            }
            Err(e) => {
                warn!(error = %e, "Could not restore stored session");
                Ok(false)
            }
        }
    }

    /// Drops stored tokens that cannot back a session and stays anonymous.
    fn abandon_stored_session(&self, reason: &str) -> PortResult<bool> {
        warn!(%reason, "Discarding stored tokens that cannot restore a session");
        if let Err(e) = self.session.discard_stored_tokens() {
            warn!(error = %e, "Could not discard stored tokens");
        }
        Ok(false)
    }

    pub async fn login(&mut self, email: &str, password: &str) -> PortResult<&Session> {
        let credentials = Credentials::new(email, password);
        let response = self.auth.login(&credentials).await?;
        self.authenticate(response, email).await
    }

    /// Registers a new account and signs it in. On failure the current session,
    /// if any, is left untouched.
    pub async fn register(&mut self, email: &str, password: &str) -> PortResult<&Session> {
        let credentials = Credentials::new(email, password);
        let registered = self.auth.register(&credentials).await?;
        match registered {
            Some(response) => self.authenticate(response, email).await,
            None => {
                let response = self.auth.login(&credentials).await?;
                self.authenticate(response, email).await
            }
        }
    }

    /// Local-only logout: the refresh token is not revoked server-side.
    pub fn logout(&mut self) -> PortResult<()> {
        self.session.logout()?;
        self.todos.clear();
        Ok(())
    }

    /// Re-reads the identity behind the current token into the session.
    pub async fn refresh_profile(&mut self) -> PortResult<UserInformation> {
        self.require_user()?;
        let user = self.users.own_details().await?;
        self.session.update_profile(user.id.clone(), user.email.clone());
        Ok(user)
    }

    pub async fn user(&self, id: &str) -> PortResult<UserInformation> {
        self.require_user()?;
        self.users.by_id(id).await
    }

    async fn authenticate(&mut self, response: AuthResponse, email: &str) -> PortResult<&Session> {
        let user_id = match response.id.clone() {
            Some(id) => id,
            None => self.identify(&response).await?,
        };
        let session = response.into_session(user_id, email);
        self.todos.clear();
        self.session.login(session)?;
        self.session
            .session()
            .ok_or_else(|| PortError::Unexpected("session missing after login".to_string()))
    }

    /// Looks up the user id for a freshly issued token, before it is persisted.
    async fn identify(&self, response: &AuthResponse) -> PortResult<String> {
        self.users
            .own_details_for(&response.access_token)
            .await
            .map(|user| user.id)
    }

    //=====================================================================================
    // Todo Actions
    //=====================================================================================

    pub async fn refresh_todos(&mut self) -> PortResult<&[TodoItem]> {
        let user_id = self.require_user()?;
        let items = self.todo_client.list(&user_id).await?;
        self.todos.replace_all(items);
        Ok(self.todos.items())
    }

    pub async fn create_todo(&mut self, item: NewTodoItem) -> PortResult<TodoItem> {
        self.require_user()?;
        let created = self.todo_client.create(&item).await?;
        self.todos.add(created.clone());
        Ok(created)
    }

    /// Updates an item on the server, then in the cache. An item the cache no
    /// longer holds is left out until the next fetch.
    pub async fn update_todo(&mut self, item: TodoItem) -> PortResult<TodoItem> {
        self.require_user()?;
        let updated = self.todo_client.update(&item).await?;
        if !self.todos.update(updated.clone()) {
            info!(id = updated.id, "Updated item is not cached");
        }
        Ok(updated)
    }

    pub async fn delete_todo(&mut self, id: i64) -> PortResult<()> {
        self.require_user()?;
        self.todo_client.delete(id).await?;
        self.todos.remove(id);
        Ok(())
    }

    //=====================================================================================
    // Accessors
    //=====================================================================================

    pub fn session_store(&self) -> &SessionStore {
        &self.session
    }

    pub fn todo_store(&self) -> &TodoStore {
        &self.todos
    }

    fn require_user(&self) -> PortResult<String> {
        self.session
            .session()
            .map(|session| session.user_id.clone())
            .ok_or_else(|| PortError::Unauthorized("not logged in".to_string()))
    }
}
