//! Stateless request builder and response parser for the auth API.
//!
//! Same build/parse split as `TodoClient`. The parsers only check status and
//! shape; whether a missing token is an error is the session guard's call.

use serde_json::Value;

use crate::client::{check_status, parse_json};
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{AuthResponse, Credentials};

/// Synchronous, stateless client for the users resource.
#[derive(Debug, Clone)]
pub struct AuthClient {
    base_url: String,
}

impl AuthClient {
    /// `base_url` is the users resource URL, e.g. `http://host/api/users`.
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn build_register(&self, credentials: &Credentials) -> Result<HttpRequest, ApiError> {
        self.build_post("register", credentials)
    }

    pub fn build_login(&self, credentials: &Credentials) -> Result<HttpRequest, ApiError> {
        self.build_post("login", credentials)
    }

    pub fn build_refresh(&self) -> HttpRequest {
        self.build_get("refresh")
    }

    pub fn build_logout(&self) -> HttpRequest {
        self.build_get("logout")
    }

    /// Returns `None` when the server answered 2xx with no payload.
    pub fn parse_register(&self, response: HttpResponse) -> Result<Option<Value>, ApiError> {
        check_status(&response)?;
        if response.body.trim().is_empty() {
            return Ok(None);
        }
        let value: Value = parse_json(&response)?;
        Ok(Some(value).filter(|v| !v.is_null()))
    }

    pub fn parse_login(&self, response: HttpResponse) -> Result<AuthResponse, ApiError> {
        check_status(&response)?;
        parse_json(&response)
    }

    pub fn parse_refresh(&self, response: HttpResponse) -> Result<AuthResponse, ApiError> {
        check_status(&response)?;
        parse_json(&response)
    }

    pub fn parse_logout(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response)
    }

    fn build_post(&self, endpoint: &str, credentials: &Credentials) -> Result<HttpRequest, ApiError> {
        let body =
            serde_json::to_string(credentials).map_err(|e| ApiError::SerializationError(e.to_string()))?;
        Ok(HttpRequest {
            method: HttpMethod::Post,
            path: format!("{}/{endpoint}", self.base_url),
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: Some(body),
        })
    }

    fn build_get(&self, endpoint: &str) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            path: format!("{}/{endpoint}", self.base_url),
            headers: Vec::new(),
            body: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> AuthClient {
        AuthClient::new("http://localhost:3000/api/users")
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    #[test]
    fn build_login_posts_credentials() {
        let req = client().build_login(&Credentials::new("a@b.c", "pw")).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.path, "http://localhost:3000/api/users/login");
        let body: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, serde_json::json!({ "email": "a@b.c", "password": "pw" }));
    }

    #[test]
    fn build_refresh_and_logout_are_gets() {
        let refresh = client().build_refresh();
        let logout = client().build_logout();
        assert_eq!(refresh.method, HttpMethod::Get);
        assert_eq!(refresh.path, "http://localhost:3000/api/users/refresh");
        assert_eq!(logout.method, HttpMethod::Get);
        assert_eq!(logout.path, "http://localhost:3000/api/users/logout");
    }

    #[test]
    fn parse_login_with_token() {
        let body = client().parse_login(response(200, r#"{"token":"a.b.c"}"#)).unwrap();
        assert_eq!(body.token.as_deref(), Some("a.b.c"));
    }

    #[test]
    fn parse_login_without_token_is_not_an_error() {
        let body = client().parse_login(response(200, "{}")).unwrap();
        assert!(body.token.is_none());
    }

    #[test]
    fn parse_login_rejected() {
        let err = client().parse_login(response(401, "bad credentials")).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized));
    }

    #[test]
    fn parse_register_empty_body_is_none() {
        assert!(client().parse_register(response(201, "")).unwrap().is_none());
        assert!(client().parse_register(response(201, "null")).unwrap().is_none());
    }

    #[test]
    fn parse_register_returns_confirmation() {
        let confirmation = client()
            .parse_register(response(201, r#"{"email":"a@b.c"}"#))
            .unwrap()
            .unwrap();
        assert_eq!(confirmation["email"], "a@b.c");
    }

    #[test]
    fn parse_logout_failure() {
        let err = client().parse_logout(response(500, "boom")).unwrap_err();
        assert!(matches!(err, ApiError::HttpError { status: 500, .. }));
    }
}
