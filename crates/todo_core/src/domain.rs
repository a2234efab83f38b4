//! crates/todo_core/src/domain.rs
//!
//! Defines the core data structures shared by the stores and the resource clients.
//! Field names follow the backend's camelCase JSON contract.

use serde::{Deserialize, Serialize};
use std::fmt;

//=========================================================================================
// Identity and Session
//=========================================================================================

/// The email/password pair sent to `/login` and `/register`.
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Identity fields returned by the users endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInformation {
    pub id: String,
    pub email: String,
}

/// The access/refresh pair mirrored into durable storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// An authenticated user session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub email: String,
    pub token_type: String,
    pub access_token: String,
    pub refresh_token: String,
    /// Lifetime of the access token in seconds, as reported by the backend.
    pub expires_in: Option<u64>,
}

impl Session {
    pub fn tokens(&self) -> TokenPair {
        TokenPair {
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
        }
    }
}

//=========================================================================================
// Todo Items
//=========================================================================================

/// Progress of a todo item. Serialized as its integer discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum TodoStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

impl From<TodoStatus> for u8 {
    fn from(status: TodoStatus) -> Self {
        match status {
            TodoStatus::NotStarted => 0,
            TodoStatus::InProgress => 1,
            TodoStatus::Completed => 2,
        }
    }
}

impl TryFrom<u8> for TodoStatus {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::NotStarted),
            1 => Ok(Self::InProgress),
            2 => Ok(Self::Completed),
            other => Err(format!("unknown todo status {other}")),
        }
    }
}

impl fmt::Display for TodoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::NotStarted => "not started",
            Self::InProgress => "in progress",
            Self::Completed => "completed",
        };
        f.write_str(label)
    }
}

impl std::str::FromStr for TodoStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['-', '_', ' '], "").as_str() {
            "notstarted" | "0" => Ok(Self::NotStarted),
            "inprogress" | "1" => Ok(Self::InProgress),
            "completed" | "done" | "2" => Ok(Self::Completed),
            _ => Err(format!("'{s}' is not a todo status")),
        }
    }
}

/// A todo item as stored by the backend. The `id` is always server-assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoItem {
    pub id: i64,
    #[serde(alias = "name")]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: TodoStatus,
}

/// The body of a create request: a todo item without an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTodoItem {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: TodoStatus,
}

impl NewTodoItem {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            status: TodoStatus::NotStarted,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_status(mut self, status: TodoStatus) -> Self {
        self.status = status;
        self
    }
}
