// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Authentication contract
//!
//! Passwords are stored as salted one-way hashes; sessions are stateless
//! HS256 bearer tokens whose only identity claim is the username.

use serde::{Deserialize, Serialize};

pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;

/// JWT claims issued on login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub username: String,
    /// Expiry, seconds since the epoch
    pub exp: i64,
    /// Issued-at, seconds since the epoch
    pub iat: i64,
}

pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<String, AuthError>;

    /// `Ok(false)` for a wrong password; `Err` only when the stored hash
    /// itself is unreadable.
    fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError>;
}

pub trait TokenIssuer: Send + Sync {
    fn issue(&self, username: &str) -> Result<String, AuthError>;

    fn verify(&self, token: &str) -> Result<Claims, AuthError>;
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Token is missing!")]
    MissingToken,

    #[error("Invalid token!")]
    InvalidToken,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Username or e-mail already exists")]
    Conflict,

    #[error("{0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
