//! crates/todo_core/src/http.rs
//!
//! Transport-agnostic request/response descriptors and the mapping from
//! non-success responses to `PortError` kinds.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::ports::{FieldErrors, PortError, PortResult};

pub const STATUS_UNAUTHORIZED: u16 = 401;

//=========================================================================================
// Request / Response Descriptors
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// Method, path (relative to the API base URL) and optional JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub path: String,
    pub body: Option<serde_json::Value>,
}

impl HttpRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            path: path.into(),
            body: None,
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Delete,
            path: path.into(),
            body: None,
        }
    }

    pub fn post<B: Serialize>(path: impl Into<String>, body: &B) -> PortResult<Self> {
        Self::with_body(HttpMethod::Post, path, body)
    }

    pub fn put<B: Serialize>(path: impl Into<String>, body: &B) -> PortResult<Self> {
        Self::with_body(HttpMethod::Put, path, body)
    }

    fn with_body<B: Serialize>(
        method: HttpMethod,
        path: impl Into<String>,
        body: &B,
    ) -> PortResult<Self> {
        let body = serde_json::to_value(body)
            .map_err(|e| PortError::Unexpected(format!("Failed to encode request body: {e}")))?;
        Ok(Self {
            method,
            path: path.into(),
            body: Some(body),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == STATUS_UNAUTHORIZED
    }

    pub fn has_body(&self) -> bool {
        !self.body.trim().is_empty()
    }

    /// Decodes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> PortResult<T> {
        serde_json::from_str(&self.body).map_err(|e| {
            PortError::Unexpected(format!("Failed to decode response body: {e}"))
        })
    }

    /// Passes a 2xx response through and classifies anything else.
    pub fn error_for_status(self) -> PortResult<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(classify(&self))
        }
    }
}

//=========================================================================================
// Error Classification
//=========================================================================================

/// The problem-details shape the backend uses for error bodies.
#[derive(Debug, Default, Deserialize)]
struct ProblemDetails {
    title: Option<String>,
    detail: Option<String>,
    #[serde(default)]
    errors: BTreeMap<String, Vec<String>>,
}

impl ProblemDetails {
    fn parse(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_default()
    }

    fn summary(&self, fallback: &str) -> String {
        self.detail
            .clone()
            .or_else(|| self.title.clone())
            .unwrap_or_else(|| fallback.to_string())
    }

    fn duplicate_entries(&self) -> Option<String> {
        let duplicates: Vec<String> = self
            .errors
            .iter()
            .filter(|(key, _)| key.starts_with("Duplicate"))
            .flat_map(|(key, messages)| {
                if messages.is_empty() {
                    vec![key.clone()]
                } else {
                    messages.iter().map(|m| format!("{key}: {m}")).collect()
                }
            })
            .collect();
        (!duplicates.is_empty()).then(|| duplicates.join("; "))
    }
}

/// Maps a non-success response to its error kind.
pub fn classify(response: &HttpResponse) -> PortError {
    let problem = ProblemDetails::parse(&response.body);
    let fallback = if response.has_body() {
        response.body.trim().to_string()
    } else {
        format!("HTTP {}", response.status)
    };

    match response.status {
        400 | 422 => match problem.duplicate_entries() {
            Some(duplicates) => PortError::Conflict(duplicates),
            None if problem.errors.is_empty() => {
                let mut errors = BTreeMap::new();
                errors.insert("request".to_string(), vec![problem.summary(&fallback)]);
                PortError::Validation(FieldErrors(errors))
            }
            None => PortError::Validation(FieldErrors(problem.errors)),
        },
        401 | 403 => PortError::Unauthorized(problem.summary(&fallback)),
        404 => PortError::NotFound(problem.summary(&fallback)),
        409 => PortError::Conflict(
            problem
                .duplicate_entries()
                .unwrap_or_else(|| problem.summary(&fallback)),
        ),
        status => PortError::Unexpected(format!(
            "HTTP {status}: {}",
            problem.summary(&fallback)
        )),
    }
}
