//! services/client/src/resources/mod.rs
//!
//! Typed clients for the backend's REST resources. Each call builds an
//! `HttpRequest`, sends it through the gateway, and turns non-2xx responses
//! into `PortError` kinds.

pub mod auth;
pub mod todos;
pub mod users;

pub use auth::{AuthClient, AuthResponse};
pub use todos::TodoClient;
pub use users::UserClient;
