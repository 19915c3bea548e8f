use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use axum::{
    extract::{FromRequestParts, Path, Query, State},
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    routing::{get, post},
    Json, Router,
};
use jsonwebtoken::{
    decode, encode, get_current_timestamp, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub port: u16,
    pub jwt_secret: String,
    /// Lifetime of issued tokens. Negative values issue tokens that are
    /// already expired.
    pub token_ttl_secs: i64,
}

impl ServerConfig {
    /// # Environment Variables
    /// - `PORT` (default: 3000)
    /// - `JWT_SECRET` (default: a fixed development secret)
    /// - `TOKEN_TTL_SECS` (default: 3600)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            jwt_secret: std::env::var("JWT_SECRET").unwrap_or(defaults.jwt_secret),
            token_ttl_secs: std::env::var("TOKEN_TTL_SECS")
                .ok()
                .and_then(|t| t.parse().ok())
                .unwrap_or(defaults.token_ttl_secs),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            jwt_secret: "mock-server-development-secret".to_string(),
            token_ttl_secs: 3600,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rank {
    Low,
    Mid,
    High,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Todo {
    pub id: Uuid,
    pub title: String,
    pub completed: bool,
    pub rank: Rank,
    /// Seconds since epoch; set by the server only.
    pub created_at: u64,
}

#[derive(Deserialize)]
pub struct CreateTodo {
    pub title: String,
}

#[derive(Deserialize)]
pub struct UpdateTodo {
    pub title: Option<String>,
    pub completed: Option<bool>,
    pub rank: Option<Rank>,
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub completed: Option<bool>,
    pub rank: Option<Rank>,
}

#[derive(Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: u64,
    pub iat: u64,
    pub jti: String,
}

#[derive(Default)]
pub struct Db {
    users: HashMap<String, String>,
    todos: HashMap<String, Vec<Todo>>,
    revoked: HashSet<String>,
}

#[derive(Clone)]
pub struct AppState {
    db: Arc<RwLock<Db>>,
    tokens: Arc<TokenIssuer>,
}

pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: i64,
}

impl TokenIssuer {
    fn new(config: &ServerConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            ttl_secs: config.token_ttl_secs,
        }
    }

    fn issue(&self, email: &str) -> Result<String, StatusCode> {
        let now = get_current_timestamp();
        let claims = Claims {
            sub: email.to_string(),
            exp: now.saturating_add_signed(self.ttl_secs),
            iat: now,
            jti: Uuid::new_v4().to_string(),
        };
        encode(&Header::default(), &claims, &self.encoding).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn verify(&self, token: &str) -> Option<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        decode::<Claims>(token, &self.decoding, &validation)
            .ok()
            .map(|data| data.claims)
    }
}

/// The caller behind a valid, unrevoked bearer token.
pub struct AuthUser {
    pub email: String,
    pub token: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(StatusCode::UNAUTHORIZED)?;
        let claims = state.tokens.verify(token).ok_or(StatusCode::UNAUTHORIZED)?;
        if state.db.read().await.revoked.contains(token) {
            return Err(StatusCode::UNAUTHORIZED);
        }
        Ok(AuthUser {
            email: claims.sub,
            token: token.to_string(),
        })
    }
}

pub fn app() -> Router {
    app_with(&ServerConfig::default())
}

pub fn app_with(config: &ServerConfig) -> Router {
    let state = AppState {
        db: Arc::new(RwLock::new(Db::default())),
        tokens: Arc::new(TokenIssuer::new(config)),
    };
    Router::new()
        .route("/api/users/register", post(register))
        .route("/api/users/login", post(login))
        .route("/api/users/refresh", get(refresh))
        .route("/api/users/logout", get(logout))
        .route("/api/todos", get(list_todos).post(create_todo))
        .route("/api/todos/{id}", get(get_todo).put(update_todo).delete(delete_todo))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with(listener: TcpListener, config: &ServerConfig) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(config)).await
}

async fn register(
    State(state): State<AppState>,
    Json(input): Json<Credentials>,
) -> Result<(StatusCode, Json<serde_json::Value>), StatusCode> {
    if input.email.trim().is_empty() || input.password.is_empty() {
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    }
    let mut db = state.db.write().await;
    if db.users.contains_key(&input.email) {
        return Err(StatusCode::CONFLICT);
    }
    db.users.insert(input.email.clone(), input.password);
    info!(email = %input.email, "registered user");
    Ok((StatusCode::CREATED, Json(serde_json::json!({ "email": input.email }))))
}

async fn login(
    State(state): State<AppState>,
    Json(input): Json<Credentials>,
) -> Result<Json<TokenResponse>, StatusCode> {
    let db = state.db.read().await;
    match db.users.get(&input.email) {
        Some(password) if *password == input.password => {
            let token = state.tokens.issue(&input.email)?;
            info!(email = %input.email, "issued token");
            Ok(Json(TokenResponse { token }))
        }
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

async fn refresh(State(state): State<AppState>, user: AuthUser) -> Result<Json<TokenResponse>, StatusCode> {
    let token = state.tokens.issue(&user.email)?;
    state.db.write().await.revoked.insert(user.token);
    debug!(email = %user.email, "refreshed token");
    Ok(Json(TokenResponse { token }))
}

async fn logout(State(state): State<AppState>, user: AuthUser) -> StatusCode {
    state.db.write().await.revoked.insert(user.token);
    debug!(email = %user.email, "revoked token");
    StatusCode::NO_CONTENT
}

async fn list_todos(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ListQuery>,
) -> Json<Vec<Todo>> {
    let db = state.db.read().await;
    let todos = db
        .todos
        .get(&user.email)
        .map(|todos| {
            todos
                .iter()
                .filter(|t| query.completed.is_none_or(|c| t.completed == c))
                .filter(|t| query.rank.is_none_or(|r| t.rank == r))
                .cloned()
                .collect()
        })
        .unwrap_or_default();
    Json(todos)
}

async fn create_todo(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<CreateTodo>,
) -> (StatusCode, Json<Todo>) {
    let todo = Todo {
        id: Uuid::new_v4(),
        title: input.title,
        completed: false,
        rank: Rank::Mid,
        created_at: get_current_timestamp(),
    };
    state
        .db
        .write()
        .await
        .todos
        .entry(user.email)
        .or_default()
        .push(todo.clone());
    (StatusCode::CREATED, Json(todo))
}

async fn get_todo(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Todo>, StatusCode> {
    let db = state.db.read().await;
    db.todos
        .get(&user.email)
        .and_then(|todos| todos.iter().find(|t| t.id == id))
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn update_todo(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateTodo>,
) -> Result<Json<Todo>, StatusCode> {
    let mut db = state.db.write().await;
    let todo = db
        .todos
        .get_mut(&user.email)
        .and_then(|todos| todos.iter_mut().find(|t| t.id == id))
        .ok_or(StatusCode::NOT_FOUND)?;
    if let Some(title) = input.title {
        todo.title = title;
    }
    if let Some(completed) = input.completed {
        todo.completed = completed;
    }
    if let Some(rank) = input.rank {
        todo.rank = rank;
    }
    Ok(Json(todo.clone()))
}

async fn delete_todo(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, StatusCode> {
    let mut db = state.db.write().await;
    let todos = db.todos.get_mut(&user.email).ok_or(StatusCode::NOT_FOUND)?;
    let before = todos.len();
    todos.retain(|t| t.id != id);
    if todos.len() == before {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(StatusCode::NO_CONTENT)
}
