// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::types::*;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("{status}: {message}")]
    Api { status: u16, message: String },

    #[error("no token configured; log in first")]
    MissingToken,
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// Client for the Wardrobe Assistant HTTP API.
pub struct WardrobeClient {
    base_url: String,
    client: Client,
    token: Option<String>,
}

impl WardrobeClient {
    /// Create a client for the API at `base_url`, e.g. `http://127.0.0.1:5000`.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(120)).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            token: None,
        })
    }

    /// Set the bearer token sent with authenticated calls.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, req: RequestBuilder) -> Result<RequestBuilder> {
        let token = self.token.as_deref().ok_or(ClientError::MissingToken)?;
        Ok(req.bearer_auth(token))
    }

    /// Create an account. Returns the server's confirmation message.
    pub async fn register(&self, username: &str, password: &str, email: &str) -> Result<String> {
        let body = RegisterRequest {
            username: username.to_string(),
            password: password.to_string(),
            email: email.to_string(),
        };
        let response = self.client.post(self.url("/register")).json(&body).send().await?;
        let created: MessageResponse = decode(response).await?;
        Ok(created.message)
    }

    /// Log in and return the issued token. The client itself is not
    /// modified; pass the token to [`WardrobeClient::with_token`].
    pub async fn login(&self, username: &str, password: &str) -> Result<String> {
        let body = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let response = self.client.post(self.url("/login")).json(&body).send().await?;
        let issued: TokenResponse = decode(response).await?;
        Ok(issued.token)
    }

    pub async fn validate_token(&self) -> Result<TokenValidation> {
        let req = self.authorized(self.client.get(self.url("/validate-token")))?;
        decode(req.send().await?).await
    }

    /// Send a message; a `None` session starts a new conversation.
    pub async fn chat(
        &self,
        message: &str,
        session_id: Option<&str>,
        location: Option<Location>,
    ) -> Result<ChatResponse> {
        let body = ChatRequest {
            message: message.to_string(),
            session_id: session_id.map(str::to_string),
            location,
        };
        let req = self.authorized(self.client.post(self.url("/chat")))?.json(&body);
        decode(req.send().await?).await
    }

    pub async fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        let req = self.authorized(self.client.get(self.url("/sessions")))?;
        decode(req.send().await?).await
    }

    pub async fn get_session(&self, session_id: &str) -> Result<ChatSession> {
        let req = self.authorized(self.client.get(self.url(&format!("/sessions/{}", session_id))))?;
        decode(req.send().await?).await
    }

    pub async fn delete_session(&self, session_id: &str) -> Result<()> {
        let req = self.authorized(self.client.delete(self.url(&format!("/sessions/{}", session_id))))?;
        let response = req.send().await?;
        if response.status().is_success() {
            return Ok(());
        }
        Err(api_error(response).await)
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    if !response.status().is_success() {
        return Err(api_error(response).await);
    }
    Ok(response.json().await?)
}

/// Prefer the `{"message"}` body; fall back to the raw text or the reason phrase.
async fn api_error(response: Response) -> ClientError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<MessageResponse>(&text)
        .map(|body| body.message)
        .ok()
        .filter(|m| !m.is_empty())
        .or_else(|| Some(text.trim().to_string()).filter(|t| !t.is_empty()))
        .unwrap_or_else(|| reason(status));
    ClientError::Api {
        status: status.as_u16(),
        message,
    }
}

fn reason(status: StatusCode) -> String {
    status.canonical_reason().unwrap_or("unexpected status").to_string()
}
