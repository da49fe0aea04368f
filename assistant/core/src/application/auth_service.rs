// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::auth::{AuthError, PasswordHasher, TokenIssuer};
use crate::domain::repository::{RepositoryError, UserRepository};
use crate::domain::user::User;

/// Registration, login and bearer-token authentication.
#[async_trait]
pub trait AuthService: Send + Sync {
    async fn register(&self, username: &str, password: &str, email: &str) -> Result<User, AuthError>;

    /// Returns a signed access token
    async fn login(&self, username: &str, password: &str) -> Result<String, AuthError>;

    /// Resolve an `Authorization` header value to the user it names
    async fn authenticate(&self, authorization: Option<&str>) -> Result<User, AuthError>;
}

pub struct StandardAuthService {
    users: Arc<dyn UserRepository>,
    hasher: Arc<dyn PasswordHasher>,
    tokens: Arc<dyn TokenIssuer>,
}

impl StandardAuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        hasher: Arc<dyn PasswordHasher>,
        tokens: Arc<dyn TokenIssuer>,
    ) -> Self {
        Self { users, hasher, tokens }
    }

    /// Argon2 is CPU-bound; keep it off the async workers.
    async fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let hasher = self.hasher.clone();
        let password = password.to_string();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AuthError::Internal(format!("password hashing task failed: {}", e)))?
    }

    async fn verify_password(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let hasher = self.hasher.clone();
        let password = password.to_string();
        let hash = hash.to_string();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| AuthError::Internal(format!("password verification task failed: {}", e)))?
    }
}

fn storage(err: RepositoryError) -> AuthError {
    AuthError::Internal(err.to_string())
}

#[async_trait]
impl AuthService for StandardAuthService {
    async fn register(&self, username: &str, password: &str, email: &str) -> Result<User, AuthError> {
        if username.is_empty() || password.is_empty() || email.is_empty() {
            return Err(AuthError::Validation("username, password & email required".to_string()));
        }

        if self.users.exists(username, email).await.map_err(storage)? {
            return Err(AuthError::Conflict);
        }

        let user = User::new(username, email, self.hash_password(password).await?);
        match self.users.insert(&user).await {
            Ok(()) => {}
            // Lost a race with a concurrent registration
            Err(RepositoryError::Duplicate(_)) => return Err(AuthError::Conflict),
            Err(e) => return Err(storage(e)),
        }

        info!(username, "registered user");
        Ok(user)
    }

    async fn login(&self, username: &str, password: &str) -> Result<String, AuthError> {
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::Validation("Missing username or password".to_string()));
        }

        let user = self
            .users
            .find_by_username(username)
            .await
            .map_err(storage)?
            .ok_or(AuthError::InvalidCredentials)?;

        if !self.verify_password(password, &user.password_hash).await? {
            warn!(username, "login rejected: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        self.tokens.issue(&user.username)
    }

    async fn authenticate(&self, authorization: Option<&str>) -> Result<User, AuthError> {
        let header = authorization
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or(AuthError::MissingToken)?;

        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::InvalidToken)?;

        let claims = self.tokens.verify(token)?;

        self.users
            .find_by_username(&claims.username)
            .await
            .map_err(storage)?
            .ok_or(AuthError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::password::Argon2PasswordHasher;
    use crate::infrastructure::repositories::InMemoryUserRepository;
    use crate::infrastructure::token::JwtTokenIssuer;

    fn service() -> StandardAuthService {
        StandardAuthService::new(
            Arc::new(InMemoryUserRepository::new()),
            Arc::new(Argon2PasswordHasher::new()),
            Arc::new(JwtTokenIssuer::new("test-secret")),
        )
    }

    #[tokio::test]
    async fn test_register_login_authenticate() {
        let auth = service();
        let user = auth.register("ada", "pw", "ada@example.com").await.unwrap();
        assert_ne!(user.password_hash, "pw");

        let token = auth.login("ada", "pw").await.unwrap();
        let header = format!("Bearer {}", token);
        let resolved = auth.authenticate(Some(&header)).await.unwrap();
        assert_eq!(resolved.username, "ada");
    }

    #[tokio::test]
    async fn test_register_validation_and_conflict() {
        let auth = service();
        let err = auth.register("ada", "", "ada@example.com").await.unwrap_err();
        assert_eq!(err.to_string(), "username, password & email required");

        auth.register("ada", "pw", "ada@example.com").await.unwrap();
        let err = auth.register("ada", "pw", "other@example.com").await.unwrap_err();
        assert!(matches!(err, AuthError::Conflict));
        let err = auth.register("bob", "pw", "ada@example.com").await.unwrap_err();
        assert!(matches!(err, AuthError::Conflict));
    }

    #[tokio::test]
    async fn test_login_failures() {
        let auth = service();
        auth.register("ada", "pw", "ada@example.com").await.unwrap();

        let err = auth.login("", "pw").await.unwrap_err();
        assert_eq!(err.to_string(), "Missing username or password");
        assert!(matches!(auth.login("ada", "wrong").await, Err(AuthError::InvalidCredentials)));
        assert!(matches!(auth.login("nobody", "pw").await, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_authenticate_rejections() {
        let auth = service();
        assert!(matches!(auth.authenticate(None).await, Err(AuthError::MissingToken)));
        assert!(matches!(auth.authenticate(Some("Token abc")).await, Err(AuthError::InvalidToken)));
        assert!(matches!(auth.authenticate(Some("Bearer abc")).await, Err(AuthError::InvalidToken)));

        // valid signature, but the user no longer exists
        let orphan = JwtTokenIssuer::new("test-secret").issue("ghost").unwrap();
        let header = format!("Bearer {}", orphan);
        assert!(matches!(auth.authenticate(Some(&header)).await, Err(AuthError::InvalidToken)));
    }

    /// Records which thread did the password work
    struct ThreadSpy {
        threads: parking_lot::Mutex<Vec<std::thread::ThreadId>>,
    }

    impl PasswordHasher for ThreadSpy {
        fn hash(&self, password: &str) -> Result<String, AuthError> {
            self.threads.lock().push(std::thread::current().id());
            Ok(format!("spy:{}", password))
        }

        fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
            self.threads.lock().push(std::thread::current().id());
            Ok(hash == format!("spy:{}", password))
        }
    }

    #[tokio::test]
    async fn test_password_work_runs_off_the_runtime_thread() {
        let spy = Arc::new(ThreadSpy {
            threads: parking_lot::Mutex::new(Vec::new()),
        });
        let auth = StandardAuthService::new(
            Arc::new(InMemoryUserRepository::new()),
            spy.clone(),
            Arc::new(JwtTokenIssuer::new("test-secret")),
        );

        auth.register("ada", "pw", "ada@example.com").await.unwrap();
        auth.login("ada", "pw").await.unwrap();
        assert!(matches!(auth.login("ada", "nope").await, Err(AuthError::InvalidCredentials)));

        // the default test runtime drives everything on this thread
        let here = std::thread::current().id();
        let threads = spy.threads.lock();
        assert_eq!(threads.len(), 3);
        assert!(threads.iter().all(|id| *id != here));
    }
}
