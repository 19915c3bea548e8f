//! Client configuration.
//!
//! # Environment Variables
//! - `TODO_SERVER_URL`: server root; both resource URLs derive from it
//!   (default: `http://localhost:3000`)
//! - `TODO_AUTH_URL`: users resource, overrides the derived value
//! - `TODO_ITEMS_URL`: todos resource, overrides the derived value
//! - `TODO_TOKEN_DIR`: directory holding the persisted credential; unset
//!   keeps the credential in memory only

use std::env;
use std::path::PathBuf;

use crate::auth::AuthClient;
use crate::client::TodoClient;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:3000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub auth_url: String,
    pub items_url: String,
    pub token_dir: Option<PathBuf>,
}

impl ClientConfig {
    /// Resource URLs for a server laid out as `{root}/api/users` and
    /// `{root}/api/todos`.
    pub fn for_server(root: &str) -> Self {
        let root = root.trim_end_matches('/');
        Self {
            auth_url: format!("{root}/api/users"),
            items_url: format!("{root}/api/todos"),
            token_dir: None,
        }
    }

    pub fn from_env() -> Self {
        let root = env::var("TODO_SERVER_URL").unwrap_or_else(|_| DEFAULT_SERVER_URL.to_string());
        let defaults = Self::for_server(&root);
        Self {
            auth_url: env::var("TODO_AUTH_URL").unwrap_or(defaults.auth_url),
            items_url: env::var("TODO_ITEMS_URL").unwrap_or(defaults.items_url),
            token_dir: env::var_os("TODO_TOKEN_DIR").map(PathBuf::from),
        }
    }

    pub fn auth_client(&self) -> AuthClient {
        AuthClient::new(&self.auth_url)
    }

    pub fn todo_client(&self) -> TodoClient {
        TodoClient::new(&self.items_url)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::for_server(DEFAULT_SERVER_URL)
    }
}
