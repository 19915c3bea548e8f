//! Domain DTOs for the todo and auth APIs.
//!
//! # Design
//! These types mirror the mock-server's schema but are defined independently;
//! integration tests catch any schema drift between the two crates.
//!
//! `Todo` keeps every field the server sends, including ones this crate does
//! not model (`extra`), so replacing a local item with the server's copy
//! never drops server-computed metadata.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Server-assigned identity of a todo. Never generated client-side.
///
/// Accepts either a JSON number or a JSON string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TodoId {
    Number(i64),
    Text(String),
}

impl fmt::Display for TodoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TodoId::Number(n) => write!(f, "{n}"),
            TodoId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for TodoId {
    fn from(value: i64) -> Self {
        TodoId::Number(value)
    }
}

impl From<&str> for TodoId {
    fn from(value: &str) -> Self {
        TodoId::Text(value.to_string())
    }
}

impl From<String> for TodoId {
    fn from(value: String) -> Self {
        TodoId::Text(value)
    }
}

/// Priority of a todo. Ordered `Low < Mid < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rank {
    Low,
    Mid,
    High,
}

impl Rank {
    /// The next rank in the cycle low → mid → high → low.
    pub fn next(self) -> Self {
        match self {
            Rank::Low => Rank::Mid,
            Rank::Mid => Rank::High,
            Rank::High => Rank::Low,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Rank::Low => "low",
            Rank::Mid => "mid",
            Rank::High => "high",
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single todo item returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Todo {
    pub id: TodoId,
    pub title: String,
    pub completed: bool,
    pub rank: Rank,
    /// Fields the server sent that are not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Request payload for creating a new todo. The server assigns everything
/// else.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTodo {
    pub title: String,
}

/// Request payload for updating an existing todo. Only the fields present in
/// the JSON are applied; omitted fields remain unchanged on the server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTodo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<Rank>,
}

/// Server-side filter for listing todos. Unset fields are not sent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListFilter {
    pub completed: Option<bool>,
    pub rank: Option<Rank>,
}

impl ListFilter {
    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            rank: None,
        }
    }

    pub fn rank(rank: Rank) -> Self {
        Self {
            completed: None,
            rank: Some(rank),
        }
    }

    /// Render as a query string, including the leading `?`, or an empty
    /// string when no field is set.
    pub fn query_string(&self) -> String {
        let mut params = Vec::new();
        if let Some(completed) = self.completed {
            params.push(format!("completed={completed}"));
        }
        if let Some(rank) = self.rank {
            params.push(format!("rank={rank}"));
        }
        if params.is_empty() {
            String::new()
        } else {
            format!("?{}", params.join("&"))
        }
    }
}

/// Login / registration payload.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: &str, password: &str) -> Self {
        Self {
            email: email.to_string(),
            password: password.to_string(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Body of a login or refresh response. A missing token is a valid parse;
/// the session guard decides what it means.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub token: Option<String>,
}
