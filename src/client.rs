// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Authorized HTTP client for the gateway.
//!
//! Every resource call goes through here. The client:
//! - leaves public endpoints (login, token endpoint) untouched
//! - attaches `Authorization: Bearer <token>` to everything else
//! - on a 401, refreshes the token once and replays the original request
//!
//! A request is never retried more than once: a second 401 after a fresh
//! token is a hard failure that ends the session.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::services::SessionManager;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Path suffixes that must never carry an Authorization header.
const PUBLIC_SUFFIXES: &[&str] = &["/login", "/auth/token", "/oauth/token"];

/// Gateway API client with transparent 401 recovery.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: SessionManager,
}

impl ApiClient {
    /// Create a client bound to a session.
    pub fn new(config: &Config, session: SessionManager) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            session,
        }
    }

    /// The session this client authorizes with.
    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    // ─── Typed Helpers ───────────────────────────────────────────────────────

    /// GET a JSON resource.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.dispatch(self.http.get(self.url(path)), path).await?;
        Self::check_response_json(response).await
    }

    /// POST a JSON body and parse a JSON response.
    pub async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self
            .dispatch(self.http.post(self.url(path)).json(body), path)
            .await?;
        Self::check_response_json(response).await
    }

    /// PUT a JSON body and parse a JSON response.
    pub async fn put_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self
            .dispatch(self.http.put(self.url(path)).json(body), path)
            .await?;
        Self::check_response_json(response).await
    }

    /// DELETE a resource, ignoring the response body.
    pub async fn delete(&self, path: &str) -> Result<()> {
        let response = self.dispatch(self.http.delete(self.url(path)), path).await?;
        Self::check_response(response).await
    }

    // ─── Request Pipeline ────────────────────────────────────────────────────

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn is_public(path: &str) -> bool {
        let path = path.split('?').next().unwrap_or(path);
        PUBLIC_SUFFIXES.iter().any(|suffix| path.ends_with(suffix))
    }

    /// Send a request with bearer authorization and one-shot 401 recovery.
    async fn dispatch(
        &self,
        request: reqwest::RequestBuilder,
        path: &str,
    ) -> Result<reqwest::Response> {
        if Self::is_public(path) {
            return Ok(request.send().await?);
        }

        // Clone before the first send so the request can be replayed.
        let replay = request.try_clone();

        // A missing token is not an error here; the server rejects and the
        // 401 path below decides what happens next.
        let request = match self.session.stored_access_token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        tracing::debug!(path, "request unauthorized, attempting token refresh");

        let Some(replay) = replay else {
            // Streaming bodies cannot be replayed; surface the 401 as-is.
            return Err(Error::Unauthorized);
        };

        // Refresh failure already forced logout; the original 401 is what
        // the caller sees.
        let token = self
            .session
            .refresh_token()
            .await
            .map_err(|err| {
                tracing::warn!(error = %err, path, "refresh after 401 failed");
                Error::Unauthorized
            })?;

        let response = replay.bearer_auth(token).send().await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            tracing::warn!(path, "still unauthorized after refresh, forcing logout");
            self.session.logout();
            return Err(Error::Unauthorized);
        }

        Ok(response)
    }

    /// Check response status and return an error if not successful.
    async fn check_response(response: reqwest::Response) -> Result<()> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let message = response.text().await.unwrap_or_default();
        Err(Error::Api {
            status: status.as_u16(),
            message,
        })
    }

    /// Check response status and parse the JSON body.
    async fn check_response_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|err| Error::Decode(format!("JSON parse error: {err}")))
    }
}
