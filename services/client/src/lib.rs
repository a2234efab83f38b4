pub mod adapters;
pub mod config;
pub mod context;
pub mod error;
pub mod gateway;
pub mod resources;

pub use context::AppContext;
pub use error::ClientError;
pub use gateway::TokenRefreshGateway;
