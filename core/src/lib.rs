//! Client core for the todo service: session lifecycle and list sync.
//!
//! # Overview
//! - `client` / `auth` build `HttpRequest` values and parse `HttpResponse`
//!   values without touching the network (host-does-IO pattern).
//! - `transport` is the I/O boundary; `UreqTransport` executes requests for
//!   real, `testutil::ScriptedTransport` replays canned responses.
//! - `token` reads a bearer credential's expiry; `store` persists the one
//!   credential a client holds.
//! - `session::SessionGuard` owns that credential: login, register, refresh,
//!   logout, and attaching the bearer token to outgoing requests.
//! - `list::TodoList` keeps the user's todos in step with the server,
//!   replacing local items only with what the server returns.
//!
//! # Design
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.
//! - Malformed credentials are `None`, not errors. Everything else the
//!   session and list operations can hit is an `Error` with a kind.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod list;
pub mod session;
pub mod store;
pub mod token;
pub mod transport;
pub mod types;

#[cfg(test)]
mod testutil;

pub use auth::AuthClient;
pub use client::TodoClient;
pub use config::ClientConfig;
pub use error::{ApiError, Error, ErrorKind, StoreError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use list::TodoList;
pub use session::{SessionGuard, SessionState};
pub use store::{CredentialStore, FileStore, MemoryStore};
pub use token::Claims;
pub use transport::{Transport, UreqTransport};
pub use types::{AuthResponse, CreateTodo, Credentials, ListFilter, Rank, Todo, TodoId, UpdateTodo};
