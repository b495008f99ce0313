// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User resource wrappers: profiles, role queries, registration.

use crate::client::ApiClient;
use crate::error::Result;
use crate::models::user::RawProfile;
use crate::models::{RegisterRequest, User};

/// Typed access to the user endpoints.
#[derive(Clone)]
pub struct UsersApi {
    api: ApiClient,
}

impl UsersApi {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Profile of the authenticated user.
    pub async fn me(&self) -> Result<User> {
        let raw: RawProfile = self.api.get_json("/api/users/me").await?;
        Ok(raw.normalize())
    }

    /// A user together with their role set (`GET /api/users/{id}`).
    pub async fn get_with_roles(&self, user_id: u64) -> Result<User> {
        let raw: RawProfile = self
            .api
            .get_json(&format!("/api/users/{user_id}"))
            .await?;
        Ok(raw.normalize())
    }

    /// Register a new account.
    pub async fn register(&self, request: &RegisterRequest) -> Result<User> {
        let raw: RawProfile = self.api.post_json("/auth/register", request).await?;
        Ok(raw.normalize())
    }
}
