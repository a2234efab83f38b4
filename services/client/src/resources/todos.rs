//! services/client/src/resources/todos.rs
//!
//! CRUD calls for todo items. Results are returned to the caller, which decides
//! how to apply them to the todo store.

use serde::Deserialize;
use todo_core::domain::{NewTodoItem, TodoItem};
use todo_core::http::HttpRequest;
use todo_core::ports::PortResult;

use crate::gateway::TokenRefreshGateway;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TodoListResponse {
    #[serde(default)]
    todo_items: Vec<TodoItem>,
}

#[derive(Clone)]
pub struct TodoClient {
    gateway: TokenRefreshGateway,
}

impl TodoClient {
    pub fn new(gateway: TokenRefreshGateway) -> Self {
        Self { gateway }
    }

    /// GET /todos/{userId}
    pub async fn list(&self, user_id: &str) -> PortResult<Vec<TodoItem>> {
        let request = HttpRequest::get(format!("/todos/{user_id}"));
        let body: TodoListResponse = self
            .gateway
            .send(&request)
            .await?
            .error_for_status()?
            .json()?;
        Ok(body.todo_items)
    }

    /// POST /todos - the server assigns the id of the returned item.
    pub async fn create(&self, item: &NewTodoItem) -> PortResult<TodoItem> {
        let request = HttpRequest::post("/todos", item)?;
        self.gateway
            .send(&request)
            .await?
            .error_for_status()?
            .json()
    }

    /// PUT /todos/{id} - an empty success body means the submitted item was stored as-is.
    pub async fn update(&self, item: &TodoItem) -> PortResult<TodoItem> {
        let request = HttpRequest::put(format!("/todos/{}", item.id), item)?;
        let response = self.gateway.send(&request).await?.error_for_status()?;
        if response.has_body() {
            response.json()
        } else {
            Ok(item.clone())
        }
    }

    /// DELETE /todos/{id}
    pub async fn delete(&self, id: i64) -> PortResult<()> {
        let request = HttpRequest::delete(format!("/todos/{id}"));
        self.gateway.send(&request).await?.error_for_status()?;
        Ok(())
    }
}
