// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session lifecycle: login, logout, token refresh and proactive renewal.
//!
//! Handles:
//! - OAuth2 password/refresh grants against the gateway token endpoint
//! - The alternate application login (`POST /auth/login`)
//! - Single-flight token refresh shared by concurrent callers
//! - A self-rescheduling renewal timer that fires ahead of expiry

use crate::config::{join_url, Config};
use crate::error::{Error, Result};
use crate::guards::{Navigator, NoopNavigator, Route};
use crate::models::user::{RawProfile, User};
use crate::models::{LoginRequest, TokenResponse};
use crate::store::{keys, MemoryStore, TokenStore};
use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, RwLock, Weak};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Owner of the authentication state.
///
/// Cheap to clone; all clones share the same session. Constructed explicitly
/// and passed by handle; there is no ambient global session, so tests can
/// instantiate as many isolated sessions as they like.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    http: reqwest::Client,
    config: Config,
    store: Arc<dyn TokenStore>,
    navigator: Arc<dyn Navigator>,
    /// Serializes refresh operations; waiters adopt the winner's result.
    refresh_lock: Mutex<()>,
    /// Bumped on every successful token rotation.
    token_generation: AtomicU64,
    /// Handle of the pending renewal timer, if any.
    renewal_task: StdMutex<Option<JoinHandle<()>>>,
    current_user: RwLock<Option<User>>,
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        if let Some(handle) = lock(&self.renewal_task).take() {
            handle.abort();
        }
    }
}

/// Lock a std mutex, recovering the data if a panicking thread poisoned it.
fn lock<T>(mutex: &StdMutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl SessionManager {
    /// Create a session with explicit storage and navigation collaborators.
    pub fn new(config: Config, store: Arc<dyn TokenStore>, navigator: Arc<dyn Navigator>) -> Self {
        // Rehydrate the cached profile from a previous run, if the store has one.
        let current_user = store.get(keys::CURRENT_USER).and_then(|raw| {
            serde_json::from_str(&raw)
                .map_err(|err| tracing::warn!(error = %err, "stored profile unreadable, ignoring"))
                .ok()
        });

        Self {
            inner: Arc::new(SessionInner {
                http: reqwest::Client::new(),
                config,
                store,
                navigator,
                refresh_lock: Mutex::new(()),
                token_generation: AtomicU64::new(0),
                renewal_task: StdMutex::new(None),
                current_user: RwLock::new(current_user),
            }),
        }
    }

    /// Create a session with in-memory storage and no navigation sink.
    pub fn in_memory(config: Config) -> Self {
        Self::new(
            config,
            Arc::new(MemoryStore::new()),
            Arc::new(NoopNavigator),
        )
    }

    // ─── Login / Logout ──────────────────────────────────────────────────────

    /// Exchange credentials for tokens via the OAuth2 password grant.
    ///
    /// On success the tokens are persisted, the profile is fetched from the
    /// gateway and the renewal timer is scheduled. On failure the session is
    /// left unauthenticated and the error is surfaced unchanged; there is no
    /// retry.
    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        let config = &self.inner.config;
        let mut form: Vec<(&str, &str)> = vec![
            ("grant_type", "password"),
            ("username", username),
            ("password", password),
        ];
        if let Some(scope) = config.scope.as_deref() {
            form.push(("scope", scope));
        }
        if !config.client_id.is_empty() {
            form.push(("client_id", &config.client_id));
        }
        if !config.client_secret.is_empty() {
            form.push(("client_secret", &config.client_secret));
        }

        let tokens = match self.post_token_form(&form).await {
            Ok(tokens) => tokens,
            Err(Error::Api {
                status: 400 | 401, ..
            }) => return Err(Error::InvalidCredentials),
            Err(err) => return Err(err),
        };

        self.finish_login(tokens).await
    }

    /// Alternate application login (`POST /auth/login` with a JSON body).
    ///
    /// Feeds the same persistence, profile and renewal path as [`login`].
    ///
    /// [`login`]: SessionManager::login
    pub async fn login_with_api(&self, email: &str, password: &str) -> Result<()> {
        let url = join_url(&self.inner.config.api_base_url, "/auth/login");
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };

        let response = self.inner.http.post(url).json(&request).send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::BAD_REQUEST
            || status == reqwest::StatusCode::UNAUTHORIZED
        {
            return Err(Error::InvalidCredentials);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                message,
            });
        }

        let login: crate::models::LoginResponse = response
            .json()
            .await
            .map_err(|err| Error::Decode(format!("login response: {err}")))?;

        self.finish_login(login.into()).await
    }

    /// Clear the session: cancel the renewal timer, drop every persisted
    /// field and navigate to the login route. Safe to call repeatedly.
    pub fn logout(&self) {
        if let Some(handle) = lock(&self.inner.renewal_task).take() {
            handle.abort();
        }

        let store = &self.inner.store;
        store.remove(keys::ACCESS_TOKEN);
        store.remove(keys::REFRESH_TOKEN);
        store.remove(keys::EXPIRES_AT);
        store.remove(keys::CURRENT_USER);

        *self
            .inner
            .current_user
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;

        self.inner.navigator.navigate(Route::Login);
    }

    // ─── State Queries ───────────────────────────────────────────────────────

    /// The access token, only while it is unexpired.
    ///
    /// An expired token clears the whole session as a side effect (expiry is
    /// terminal for the cached token); callers must not assume this read is
    /// pure.
    pub fn access_token(&self) -> Option<String> {
        let token = self.stored_access_token()?;
        match self.expires_at_millis() {
            Some(expires_at) if Utc::now().timestamp_millis() < expires_at => Some(token),
            _ => {
                tracing::debug!("access token expired, clearing session");
                self.logout();
                None
            }
        }
    }

    /// Synchronous authentication check: token present and unexpired.
    pub fn is_authenticated(&self) -> bool {
        match (self.stored_access_token(), self.expires_at_millis()) {
            (Some(_), Some(expires_at)) => Utc::now().timestamp_millis() < expires_at,
            _ => false,
        }
    }

    /// The cached normalized profile, if the session has one.
    pub fn current_user(&self) -> Option<User> {
        self.inner
            .current_user
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Raw stored token without the expiry side effect. The request layer
    /// reads this: a stale token simply 401s and goes through the refresh
    /// path, which needs the refresh credential an eager logout would destroy.
    pub(crate) fn stored_access_token(&self) -> Option<String> {
        self.inner.store.get(keys::ACCESS_TOKEN)
    }

    fn expires_at_millis(&self) -> Option<i64> {
        self.inner
            .store
            .get(keys::EXPIRES_AT)
            .and_then(|raw| raw.parse().ok())
    }

    // ─── Token Refresh ───────────────────────────────────────────────────────

    /// Exchange the stored refresh token for a new access token.
    ///
    /// Single-flight: concurrent callers queue on the refresh lock and adopt
    /// the winner's token instead of issuing duplicate requests (detected via
    /// the generation counter). Any token-endpoint failure is terminal for
    /// the session: it forces logout and the error is returned to every
    /// caller. A rejected refresh token is never retried.
    pub async fn refresh_token(&self) -> Result<String> {
        let observed = self.inner.token_generation.load(Ordering::SeqCst);
        let _guard = self.inner.refresh_lock.lock().await;

        // Another caller may have rotated the token while we waited.
        if self.inner.token_generation.load(Ordering::SeqCst) != observed {
            if let Some(token) = self.stored_access_token() {
                tracing::debug!("adopting token from concurrent refresh");
                return Ok(token);
            }
        }

        let Some(refresh) = self.inner.store.get(keys::REFRESH_TOKEN) else {
            return Err(Error::SessionExpired("no refresh token".to_string()));
        };

        let config = &self.inner.config;
        let mut form: Vec<(&str, &str)> = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", &refresh),
        ];
        if !config.client_id.is_empty() {
            form.push(("client_id", &config.client_id));
        }
        if !config.client_secret.is_empty() {
            form.push(("client_secret", &config.client_secret));
        }

        match self.post_token_form(&form).await {
            Ok(tokens) => {
                self.install_tokens(&tokens);
                self.schedule_renewal();
                tracing::info!("access token refreshed");
                Ok(tokens.access_token)
            }
            Err(err) => {
                let err = match err {
                    Error::Api { status, message } => Error::SessionExpired(format!(
                        "refresh rejected (HTTP {status}): {message}"
                    )),
                    other => other,
                };
                tracing::warn!(error = %err, "token refresh failed, forcing logout");
                self.logout();
                Err(err)
            }
        }
    }

    // ─── Internals ───────────────────────────────────────────────────────────

    /// POST a form to the token endpoint and parse the token response.
    async fn post_token_form(&self, form: &[(&str, &str)]) -> Result<TokenResponse> {
        let response = self
            .inner
            .http
            .post(&self.inner.config.token_url)
            .form(form)
            .send()
            .await?;

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
            .map_err(|err| Error::Decode(format!("token response: {err}")))
    }

    /// Shared tail of both login flows: persist tokens, fetch the profile,
    /// schedule renewal.
    async fn finish_login(&self, tokens: TokenResponse) -> Result<()> {
        self.install_tokens(&tokens);

        match self.fetch_profile(&tokens.access_token).await {
            Ok(user) => {
                tracing::info!(user_id = user.id, "login succeeded");
                self.cache_user(user);
            }
            Err(err) => {
                // Tokens are already valid; a missing profile only degrades
                // role checks until the next fetch.
                tracing::warn!(error = %err, "profile fetch after login failed, continuing");
            }
        }

        self.schedule_renewal();
        Ok(())
    }

    /// Persist all token fields from one response.
    fn install_tokens(&self, tokens: &TokenResponse) {
        let store = &self.inner.store;
        store.set(keys::ACCESS_TOKEN, &tokens.access_token);
        if let Some(refresh) = &tokens.refresh_token {
            // The server may omit the refresh token on rotation; keep the old one.
            store.set(keys::REFRESH_TOKEN, refresh);
        }
        if let Some(expires_in) = tokens.expires_in {
            let expires_at = Utc::now().timestamp_millis() + expires_in * 1000;
            store.set(keys::EXPIRES_AT, &expires_at.to_string());
        }
        self.inner.token_generation.fetch_add(1, Ordering::SeqCst);
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<User> {
        let url = join_url(&self.inner.config.api_base_url, "/api/users/me");
        let response = self
            .inner
            .http
            .get(url)
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                message,
            });
        }

        let raw: RawProfile = response
            .json()
            .await
            .map_err(|err| Error::Decode(format!("profile response: {err}")))?;

        Ok(raw.normalize())
    }

    fn cache_user(&self, user: User) {
        match serde_json::to_string(&user) {
            Ok(json) => self.inner.store.set(keys::CURRENT_USER, &json),
            Err(err) => tracing::warn!(error = %err, "failed to serialize profile"),
        }
        *self
            .inner
            .current_user
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(user);
    }

    /// Schedule one renewal ahead of the stored expiry, replacing any pending
    /// timer. Each successful refresh reschedules exactly one successor, so
    /// the chain is terminated only by logout or a refresh failure.
    fn schedule_renewal(&self) {
        let Some(expires_at) = self.expires_at_millis() else {
            return;
        };

        let margin_ms = self.inner.config.renewal_margin_secs * 1000;
        let delay_ms = expires_at - Utc::now().timestamp_millis() - margin_ms;

        let mut slot = lock(&self.inner.renewal_task);
        if let Some(handle) = slot.take() {
            // The renewal task reschedules itself through this path; never
            // abort the task we are currently running on.
            if tokio::task::try_id() != Some(handle.id()) {
                handle.abort();
            }
        }

        if delay_ms <= 0 {
            tracing::debug!(delay_ms, "token lifetime shorter than renewal margin, not scheduling");
            return;
        }

        // The timer holds only a weak handle: dropping the last session clone
        // must not be kept alive by its own pending renewal.
        let weak: Weak<SessionInner> = Arc::downgrade(&self.inner);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(delay_ms as u64)).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let session = SessionManager { inner };
            if let Err(err) = session.refresh_token().await {
                tracing::warn!(error = %err, "scheduled renewal failed");
            }
        });

        tracing::debug!(delay_ms, "renewal timer scheduled");
        *slot = Some(handle);
    }
}
