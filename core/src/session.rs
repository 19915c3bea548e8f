//! Session guard: owner of the stored credential and of every auth call.
//!
//! # Design
//! `SessionGuard` is the single owner of the session's credential. It is
//! created once per client and shared (`Arc`) with the list controller,
//! which uses [`SessionGuard::send`] so every request carries the current
//! bearer token.
//!
//! `login`, `refresh` and `end_session` replace or destroy the credential.
//! They run under one async mutex so at most one of them is in flight.
//!
//! States: `LoggedOut --login--> LoggedIn --refresh--> LoggedIn`, and
//! `LoggedIn --end_session--> LoggedOut` whatever the server says. A failed
//! login or refresh leaves the state as it was.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::auth::AuthClient;
use crate::config::ClientConfig;
use crate::error::{ApiError, Error};
use crate::http::{HttpRequest, HttpResponse};
use crate::store::{CredentialStore, FileStore, MemoryStore};
use crate::token;
use crate::transport::Transport;
use crate::types::{AuthResponse, Credentials};

const LOGIN_CONTEXT: &str = "failed attempting to authenticate with server, please try again";
const REGISTER_CONTEXT: &str = "failed attempting to register your account with server, please try again";
const REFRESH_CONTEXT: &str = "failed to refresh your user session, please logout and back in";
const LOGOUT_CONTEXT: &str = "failed to invalidate token";

/// Whether a usable credential is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    LoggedOut,
    LoggedIn,
}

pub struct SessionGuard {
    auth: AuthClient,
    store: Box<dyn CredentialStore>,
    transport: Arc<dyn Transport>,
    lifecycle: Mutex<()>,
}

impl std::fmt::Debug for SessionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionGuard")
            .field("auth", &self.auth)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl SessionGuard {
    pub fn new(auth: AuthClient, store: impl CredentialStore + 'static, transport: Arc<dyn Transport>) -> Self {
        Self {
            auth,
            store: Box::new(store),
            transport,
            lifecycle: Mutex::new(()),
        }
    }

    /// Build a guard from configuration: a `FileStore` when a token
    /// directory is configured, a `MemoryStore` otherwise.
    pub fn from_config(config: &ClientConfig, transport: Arc<dyn Transport>) -> Self {
        let auth = config.auth_client();
        match &config.token_dir {
            Some(dir) => Self::new(auth, FileStore::new(dir), transport),
            None => Self::new(auth, MemoryStore::new(), transport),
        }
    }

    pub fn state(&self) -> SessionState {
        if self.is_logged_in() {
            SessionState::LoggedIn
        } else {
            SessionState::LoggedOut
        }
    }

    /// True iff a non-empty credential is stored.
    pub fn is_logged_in(&self) -> bool {
        self.credential().is_some()
    }

    /// The stored credential. A store that cannot be read counts as empty.
    pub fn credential(&self) -> Option<String> {
        match self.store.get() {
            Ok(credential) => credential,
            Err(e) => {
                warn!(error = %e, "failed to read stored credential");
                None
            }
        }
    }

    /// Store `credential`, replacing any previous one. Not validated here.
    pub fn persist(&self, credential: &str) -> Result<(), Error> {
        self.store.set(credential)?;
        Ok(())
    }

    /// Drop the stored credential unconditionally.
    pub fn clear(&self) -> Result<(), Error> {
        self.store.remove()?;
        Ok(())
    }

    /// Attach the session's credential to `request`.
    ///
    /// With a stored credential this sets `Authorization: Bearer <token>`,
    /// `Accept: */*` and, unless already present, `Content-Type:
    /// application/json`. Without one the request is returned unchanged.
    pub fn authorize(&self, mut request: HttpRequest) -> HttpRequest {
        if let Some(credential) = self.credential() {
            request.set_header("authorization", format!("Bearer {credential}"));
            request.set_header("accept", "*/*");
            if request.header("content-type").is_none() {
                request.set_header("content-type", "application/json");
            }
        }
        request
    }

    /// Authorize `request` and execute it.
    pub async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        self.transport.execute(self.authorize(request)).await
    }

    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<String, Error> {
        let _lifecycle = self.lifecycle.lock().await;

        let request = self
            .auth
            .build_login(&Credentials::new(email, password))
            .map_err(|e| Error::transport(LOGIN_CONTEXT, e))?;
        let body = self
            .exchange(request, |r| self.auth.parse_login(r))
            .await
            .map_err(|e| Error::transport(LOGIN_CONTEXT, e))?;

        let token = self.replace_credential(body, LOGIN_CONTEXT)?;
        info!("logged in");
        Ok(token)
    }

    /// Create an account. Does not log in or store anything.
    #[instrument(skip(self, password))]
    pub async fn register(&self, email: &str, password: &str) -> Result<Value, Error> {
        let request = self
            .auth
            .build_register(&Credentials::new(email, password))
            .map_err(|e| Error::transport(REGISTER_CONTEXT, e))?;
        let confirmation = self
            .exchange(request, |r| self.auth.parse_register(r))
            .await
            .map_err(|e| Error::transport(REGISTER_CONTEXT, e))?;

        confirmation.ok_or(Error::MissingCredential {
            context: REGISTER_CONTEXT,
        })
    }

    /// Trade the stored credential for a fresh one.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<String, Error> {
        let _lifecycle = self.lifecycle.lock().await;

        let body = self
            .exchange(self.auth.build_refresh(), |r| self.auth.parse_refresh(r))
            .await
            .map_err(|e| Error::transport(REFRESH_CONTEXT, e))?;

        let token = self.replace_credential(body, REFRESH_CONTEXT)?;
        info!("session refreshed");
        Ok(token)
    }

    /// Log out.
    ///
    /// With no stored credential this returns at once. A credential that is
    /// still live is first invalidated on the server; the local copy is
    /// cleared afterwards whether that call succeeded or not, and a failed
    /// call is still reported. An expired or undecodable credential is
    /// cleared without contacting the server. A store that cannot be read is
    /// cleared and its error returned.
    #[instrument(skip(self))]
    pub async fn end_session(&self) -> Result<(), Error> {
        let _lifecycle = self.lifecycle.lock().await;

        let stored = match self.store.get() {
            Ok(stored) => stored,
            Err(e) => {
                warn!(error = %e, "failed to read stored credential; clearing");
                self.clear()?;
                return Err(e.into());
            }
        };
        let Some(credential) = stored else {
            debug!("no stored credential");
            return Ok(());
        };

        let live = token::decode(&credential).is_some_and(|claims| !claims.is_expired(Utc::now()));
        if !live {
            info!("stored credential expired; clearing locally");
            return self.clear();
        }

        let outcome = self
            .exchange(self.auth.build_logout(), |r| self.auth.parse_logout(r))
            .await;
        self.clear()?;

        match outcome {
            Ok(()) => {
                info!("logged out");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "server-side invalidation failed; credential cleared locally");
                Err(Error::transport(LOGOUT_CONTEXT, e))
            }
        }
    }

    async fn exchange<T>(
        &self,
        request: HttpRequest,
        parse: impl FnOnce(HttpResponse) -> Result<T, ApiError>,
    ) -> Result<T, ApiError> {
        let response = self.send(request).await?;
        parse(response)
    }

    fn replace_credential(&self, body: AuthResponse, context: &'static str) -> Result<String, Error> {
        match body.token.filter(|t| !t.is_empty()) {
            Some(token) => {
                self.persist(&token)?;
                Ok(token)
            }
            None => Err(Error::MissingCredential { context }),
        }
    }
}
