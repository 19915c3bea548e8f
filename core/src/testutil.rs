//! Shared test helpers: a scripted transport and credential builders.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::Transport;

/// A `Transport` that replays queued outcomes in order and records every
/// request it receives. Running out of outcomes is a transport failure.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    outcomes: Mutex<VecDeque<Result<HttpResponse, ApiError>>>,
    requests: Mutex<Vec<HttpRequest>>,
    delay: Option<Duration>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold every request for `delay` after recording it and before
    /// answering, so concurrent callers overlap.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn push_response(&self, status: u16, body: impl Into<String>) {
        self.push(Ok(HttpResponse {
            status,
            headers: Vec::new(),
            body: body.into(),
        }));
    }

    pub fn push_json(&self, status: u16, body: serde_json::Value) {
        self.push_response(status, body.to_string());
    }

    pub fn push_failure(&self, error: ApiError) {
        self.push(Err(error));
    }

    /// Every request executed so far, in order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn push(&self, outcome: Result<HttpResponse, ApiError>) {
        self.outcomes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(outcome);
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.outcomes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Transport("no scripted response left".to_string())))
    }
}

/// An unsigned credential whose payload carries `exp`.
pub fn token_expiring_at(exp: i64) -> String {
    token_with_claims(&format!(r#"{{"exp":{exp},"sub":"test@example.com"}}"#))
}

/// An unsigned credential with `claims` (raw JSON) as its payload.
pub fn token_with_claims(claims: &str) -> String {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims);
    format!("{header}.{payload}.unsigned")
}
