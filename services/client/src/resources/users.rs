//! services/client/src/resources/users.rs

use todo_core::domain::UserInformation;
use todo_core::http::HttpRequest;
use todo_core::ports::PortResult;

use crate::gateway::TokenRefreshGateway;

#[derive(Clone)]
pub struct UserClient {
    gateway: TokenRefreshGateway,
}

impl UserClient {
    pub fn new(gateway: TokenRefreshGateway) -> Self {
        Self { gateway }
    }

    /// GET /users/getowndetails - identity behind the stored access token.
    pub async fn own_details(&self) -> PortResult<UserInformation> {
        self.fetch(HttpRequest::get("/users/getowndetails")).await
    }

    /// GET /users/getowndetails for a token that is not stored yet.
    pub async fn own_details_for(&self, access_token: &str) -> PortResult<UserInformation> {
        let request = HttpRequest::get("/users/getowndetails");
        self.gateway
            .send_with_bearer(&request, access_token)
            .await?
            .error_for_status()?
            .json()
    }

    /// GET /users/{id}
    pub async fn by_id(&self, id: &str) -> PortResult<UserInformation> {
        self.fetch(HttpRequest::get(format!("/users/{id}"))).await
    }

    async fn fetch(&self, request: HttpRequest) -> PortResult<UserInformation> {
        self.gateway
            .send(&request)
            .await?
            .error_for_status()?
            .json()
    }
}
