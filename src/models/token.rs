// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Wire models for the token and application login endpoints.

use serde::{Deserialize, Serialize};

/// Response from the OAuth token endpoint (password and refresh grants).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Lifetime of the access token in seconds
    pub expires_in: Option<i64>,
    pub token_type: Option<String>,
    pub scope: Option<String>,
}

/// Body for the application login endpoint (`POST /auth/login`).
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body for the registration endpoint (`POST /auth/register`).
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub nombre: String,
    pub apellido: String,
    pub correo: String,
    pub password: String,
}

/// Response from the application login endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub refresh_token: Option<String>,
}

impl From<LoginResponse> for TokenResponse {
    fn from(res: LoginResponse) -> Self {
        TokenResponse {
            access_token: res.access_token,
            refresh_token: res.refresh_token,
            expires_in: Some(res.expires_in),
            token_type: Some(res.token_type),
            scope: None,
        }
    }
}
