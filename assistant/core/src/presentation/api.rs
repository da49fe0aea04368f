// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! HTTP API
//!
//! | Method | Path | Auth |
//! |--------|------|------|
//! | POST | `/register` | no |
//! | POST | `/login` | no |
//! | POST | `/chat` | bearer |
//! | GET | `/validate-token` | bearer |
//! | GET | `/sessions` | bearer |
//! | GET/DELETE | `/sessions/{id}` | bearer |
//! | GET | `/health` | no |
//!
//! Every error body is `{"message": "..."}`.

use axum::{
    extract::{rejection::JsonRejection, FromRequestParts, Path, State},
    http::{header, request::Parts, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::application::auth_service::AuthService;
use crate::application::chat_service::{ChatError, ChatService};
use crate::domain::auth::AuthError;
use crate::domain::user::User;
use crate::domain::weather::Location;

pub struct AppState {
    pub auth_service: Arc<dyn AuthService>,
    pub chat_service: Arc<dyn ChatService>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(auth_service: Arc<dyn AuthService>, chat_service: Arc<dyn ChatService>) -> Self {
        Self {
            auth_service,
            chat_service,
            started_at: Instant::now(),
        }
    }
}

pub fn app(state: AppState, cors_allowed_origins: &[String]) -> Router {
    let state = Arc::new(state);

    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/chat", post(chat))
        .route("/validate-token", get(validate_token))
        .route("/sessions", get(list_sessions))
        .route("/sessions/{id}", get(get_session).delete(delete_session))
        .route("/health", get(health))
        .layer(cors_layer(cors_allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return base.allow_origin(Any);
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", o);
                None
            }
        })
        .collect();
    base.allow_origin(AllowOrigin::list(allowed))
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Chat(#[from] ChatError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Auth(err) => match err {
                AuthError::MissingToken | AuthError::InvalidToken | AuthError::InvalidCredentials => {
                    (StatusCode::UNAUTHORIZED, err.to_string())
                }
                AuthError::Conflict | AuthError::Validation(_) => (StatusCode::BAD_REQUEST, err.to_string()),
                AuthError::Internal(detail) => {
                    error!("auth failure: {}", detail);
                    (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
                }
            },
            ApiError::Chat(err) => match err {
                ChatError::MissingMessage => (StatusCode::BAD_REQUEST, err.to_string()),
                ChatError::SessionNotFound => (StatusCode::NOT_FOUND, err.to_string()),
                ChatError::Agent(detail) => {
                    error!("assistant failure: {}", detail);
                    (
                        StatusCode::BAD_GATEWAY,
                        "The assistant is unavailable right now. Please try again.".to_string(),
                    )
                }
                ChatError::Repository(_) | ChatError::Internal(_) => {
                    error!("chat failure: {}", err);
                    (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
                }
            },
        };

        (status, Json(json!({ "message": message }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

// ============================================================================
// Authentication extractor
// ============================================================================

/// The user named by a valid `Authorization: Bearer <token>` header.
pub struct AuthenticatedUser(pub User);

impl FromRequestParts<Arc<AppState>> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(header::AUTHORIZATION)
            .map(|value| value.to_str().map_err(|_| AuthError::InvalidToken))
            .transpose()?;

        let user = state.auth_service.authenticate(header).await?;
        Ok(AuthenticatedUser(user))
    }
}

// ============================================================================
// Handlers
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
    /// Kept loose so a bad location never costs the message itself
    #[serde(default)]
    pub location: Option<serde_json::Value>,
}

/// A missing or malformed body is treated like an empty one, so the
/// handler's own field validation produces the error message.
fn body_or_default<T: Default>(payload: Result<Json<T>, JsonRejection>) -> T {
    match payload {
        Ok(Json(body)) => body,
        Err(rejection) => {
            warn!("unreadable request body: {}", rejection.body_text());
            T::default()
        }
    }
}

async fn register(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let req = body_or_default(payload);
    state
        .auth_service
        .register(&req.username, &req.password, &req.email)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User registered successfully" })),
    ))
}

async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let req = body_or_default(payload);
    let token = state.auth_service.login(&req.username, &req.password).await?;
    Ok(Json(json!({ "token": token })))
}

async fn chat(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(user): AuthenticatedUser,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let req = body_or_default(payload);

    let location = req.location.and_then(|raw| parse_location(raw, &user.username));

    let reply = state
        .chat_service
        .chat(&user, &req.message, req.session_id.as_deref(), location)
        .await?;

    Ok(Json(reply))
}

/// Unreadable or out-of-range coordinates are dropped with a warning.
fn parse_location(raw: serde_json::Value, username: &str) -> Option<Location> {
    if raw.is_null() {
        return None;
    }
    let location: Location = match serde_json::from_value(raw) {
        Ok(location) => location,
        Err(e) => {
            warn!(username, "ignoring unreadable location: {}", e);
            return None;
        }
    };
    match location.validate() {
        Ok(()) => Some(location),
        Err(e) => {
            warn!(username, "ignoring location: {}", e);
            None
        }
    }
}

async fn validate_token(AuthenticatedUser(user): AuthenticatedUser) -> impl IntoResponse {
    Json(json!({ "message": "Token is valid", "username": user.username }))
}

async fn list_sessions(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.chat_service.list_sessions(&user).await?))
}

async fn get_session(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.chat_service.get_session(&user, &id).await?))
}

async fn delete_session(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.chat_service.delete_session(&user, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "uptime_seconds": state.started_at.elapsed().as_secs(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::agent_cache::AgentCache;
    use crate::application::assistant_agent::{AgentFactory, AgentSettings};
    use crate::application::auth_service::StandardAuthService;
    use crate::application::chat_service::StandardChatService;
    use crate::domain::llm::{
        FinishReason, GenerationOptions, GenerationResponse, LLMError, LLMProvider, LlmMessage, TokenUsage,
        ToolDefinition,
    };
    use crate::infrastructure::password::Argon2PasswordHasher;
    use crate::infrastructure::repositories::{InMemorySessionRepository, InMemoryUserRepository};
    use crate::infrastructure::token::JwtTokenIssuer;
    use crate::infrastructure::tool_router::ToolRouter;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request};
    use serde_json::Value;
    use tower::ServiceExt;

    struct Echo;

    #[async_trait]
    impl LLMProvider for Echo {
        async fn chat(
            &self,
            messages: &[LlmMessage],
            _tools: &[ToolDefinition],
            _options: &GenerationOptions,
        ) -> Result<GenerationResponse, LLMError> {
            Ok(GenerationResponse {
                content: messages.last().map(|m| format!("echo: {}", m.content)),
                tool_calls: vec![],
                usage: TokenUsage::default(),
                provider: "echo".into(),
                model: "echo".into(),
                finish_reason: FinishReason::Stop,
            })
        }

        async fn health_check(&self) -> Result<(), LLMError> {
            Ok(())
        }
    }

    fn router() -> Router {
        let auth = StandardAuthService::new(
            Arc::new(InMemoryUserRepository::new()),
            Arc::new(Argon2PasswordHasher::new()),
            Arc::new(JwtTokenIssuer::new("api-test-secret")),
        );
        let factory = AgentFactory::new(Arc::new(Echo), Arc::new(ToolRouter::new()), "Be a stylist.", AgentSettings::default());
        let chat = StandardChatService::new(
            Arc::new(InMemorySessionRepository::new()),
            Arc::new(factory),
            Arc::new(AgentCache::new(8)),
        );
        app(AppState::new(Arc::new(auth), Arc::new(chat)), &["*".to_string()])
    }

    async fn call(router: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn signed_in(router: &Router, username: &str) -> String {
        let (status, _) = call(
            router,
            Method::POST,
            "/register",
            None,
            Some(json!({"username": username, "password": "pw", "email": format!("{}@example.com", username)})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = call(
            router,
            Method::POST,
            "/login",
            None,
            Some(json!({"username": username, "password": "pw"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_register_errors() {
        let router = router();
        let (status, body) = call(&router, Method::POST, "/register", None, Some(json!({"username": "ada"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "username, password & email required");

        signed_in(&router, "ada").await;
        let (status, body) = call(
            &router,
            Method::POST,
            "/register",
            None,
            Some(json!({"username": "ada", "password": "x", "email": "new@example.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Username or e-mail already exists");
    }

    #[tokio::test]
    async fn test_login_errors() {
        let router = router();
        let (status, body) = call(&router, Method::POST, "/login", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Missing username or password");

        let (status, body) = call(
            &router,
            Method::POST,
            "/login",
            None,
            Some(json!({"username": "ghost", "password": "pw"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid username or password");
    }

    #[tokio::test]
    async fn test_token_required() {
        let router = router();
        let (status, body) = call(&router, Method::GET, "/sessions", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Token is missing!");

        let (status, body) = call(&router, Method::GET, "/validate-token", Some("garbage"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid token!");
    }

    #[tokio::test]
    async fn test_validate_token() {
        let router = router();
        let token = signed_in(&router, "ada").await;
        let (status, body) = call(&router, Method::GET, "/validate-token", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"message": "Token is valid", "username": "ada"}));
    }

    #[tokio::test]
    async fn test_chat_and_session_lifecycle() {
        let router = router();
        let token = signed_in(&router, "ada").await;

        let (status, body) = call(&router, Method::POST, "/chat", Some(&token), Some(json!({"message": ""}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Missing message");

        let (status, body) = call(
            &router,
            Method::POST,
            "/chat",
            Some(&token),
            Some(json!({"message": "hi", "location": {"latitude": 9.0, "longitude": 38.7}})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"], "echo: hi");
        let session_id = body["session_id"].as_str().unwrap().to_string();

        let (status, body) = call(&router, Method::GET, "/sessions", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["_id"], session_id.as_str());
        assert!(body[0].get("messages").is_none());

        let uri = format!("/sessions/{}", session_id);
        let (status, body) = call(&router, Method::GET, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["messages"].as_array().unwrap().len(), 2);
        assert_eq!(body["messages"][0]["role"], "user");

        let (status, body) = call(&router, Method::DELETE, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(body, Value::Null);

        let (status, body) = call(&router, Method::GET, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Session not found");
    }

    #[tokio::test]
    async fn test_chat_ignores_bad_location() {
        let router = router();
        let token = signed_in(&router, "ada").await;

        for location in [
            json!({"latitude": "north", "longitude": 2.0}),
            json!("somewhere"),
            json!({"latitude": 120.0, "longitude": 2.0}),
        ] {
            let (status, body) = call(
                &router,
                Method::POST,
                "/chat",
                Some(&token),
                Some(json!({"message": "what should I wear?", "location": location})),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["response"], "echo: what should I wear?");
        }
    }

    #[test]
    fn test_parse_location() {
        let parsed = parse_location(json!({"latitude": 9.0, "longitude": 38.7}), "ada").unwrap();
        assert_eq!(parsed.latitude, 9.0);
        assert!(parse_location(Value::Null, "ada").is_none());
        assert!(parse_location(json!({"latitude": 9.0}), "ada").is_none());
    }

    #[tokio::test]
    async fn test_sessions_are_private() {
        let router = router();
        let ada = signed_in(&router, "ada").await;
        let bob = signed_in(&router, "bob").await;

        let (_, body) = call(&router, Method::POST, "/chat", Some(&ada), Some(json!({"message": "secret"}))).await;
        let uri = format!("/sessions/{}", body["session_id"].as_str().unwrap());

        let (status, _) = call(&router, Method::GET, &uri, Some(&bob), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = call(&router, Method::DELETE, &uri, Some(&bob), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, listed) = call(&router, Method::GET, "/sessions", Some(&bob), None).await;
        assert_eq!(listed, json!([]));
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = call(&router(), Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }
}
