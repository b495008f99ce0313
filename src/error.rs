// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client error types shared across the session and API layers.

/// Error type for everything that can go wrong talking to the gateway.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Authentication required")]
    Unauthorized,

    #[error("Session expired: {0}")]
    SessionExpired(String),

    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Malformed response: {0}")]
    Decode(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl Error {
    /// True for failures that end or prevent an authenticated session.
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidCredentials | Error::Unauthorized | Error::SessionExpired(_)
        )
    }
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, Error>;
