// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Navigation guards over the session state.
//!
//! Guards never perform the navigation themselves; they return a
//! [`GuardDecision`] for the application shell to act on. The role guard is
//! the only asynchronous one (it has to ask the gateway for the role set) and
//! fails closed: any query error denies and redirects to a safe route.

use crate::services::{SessionManager, UsersApi};

/// Application routes that guards and the session can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Public entry point (login form)
    Login,
    /// Authenticated landing page
    Dashboard,
    /// Role-acquisition form for would-be foodies
    FoodieForm,
}

/// Outcome of a guard check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect(Route),
}

/// Sink for navigation requests issued outside of guards (e.g. on logout).
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// Navigator that ignores every request (headless usage, tests).
#[derive(Debug, Default)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn navigate(&self, _route: Route) {}
}

/// Allow navigation only for authenticated sessions.
pub fn auth_guard(session: &SessionManager) -> GuardDecision {
    if session.is_authenticated() {
        GuardDecision::Allow
    } else {
        tracing::debug!("unauthenticated navigation denied, redirecting to login");
        GuardDecision::Redirect(Route::Login)
    }
}

/// Keep authenticated users out of the public entry points (login/register).
pub fn no_auth_guard(session: &SessionManager) -> GuardDecision {
    if session.is_authenticated() {
        GuardDecision::Redirect(Route::Dashboard)
    } else {
        GuardDecision::Allow
    }
}

/// Allow navigation only when the current user holds the given role.
///
/// A user without the role is redirected to the role-acquisition form; a
/// failed role query (including a missing current user) denies and redirects
/// to the dashboard.
pub async fn role_guard(
    users: &UsersApi,
    session: &SessionManager,
    role: &str,
) -> GuardDecision {
    let Some(user) = session.current_user() else {
        tracing::warn!(role, "role check without a current user, denying");
        return GuardDecision::Redirect(Route::Dashboard);
    };

    match users.get_with_roles(user.id).await {
        Ok(user) if user.has_role(role) => GuardDecision::Allow,
        Ok(_) => {
            tracing::debug!(user_id = user.id, role, "role absent, redirecting to form");
            GuardDecision::Redirect(Route::FoodieForm)
        }
        Err(err) => {
            tracing::warn!(error = %err, user_id = user.id, role, "role query failed, denying");
            GuardDecision::Redirect(Route::Dashboard)
        }
    }
}

/// Gate for foodie-only routes.
pub async fn foodie_guard(users: &UsersApi, session: &SessionManager) -> GuardDecision {
    role_guard(users, session, "foodie").await
}
