// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Mesa client SDK: authenticated access to the Mesa restaurant marketplace
//! gateway.
//!
//! This crate owns the session subsystem the front-end shells build on:
//! token lifecycle (single-flight refresh, proactive renewal), bearer
//! authorization with one-shot 401 recovery, and navigation guards.

pub mod client;
pub mod config;
pub mod error;
pub mod guards;
pub mod models;
pub mod services;
pub mod store;

use std::sync::Arc;

use client::ApiClient;
use config::Config;
use guards::Navigator;
use services::{SessionManager, UsersApi};
use store::TokenStore;

/// Wired client handles (composition root).
///
/// Everything hangs off one explicitly constructed session: no globals, so
/// tests and multi-tenant shells can hold as many isolated clients as needed.
pub struct MesaClient {
    pub session: SessionManager,
    pub api: ApiClient,
    pub users: UsersApi,
}

impl MesaClient {
    /// Wire a client from configuration and collaborators.
    pub fn new(config: Config, store: Arc<dyn TokenStore>, navigator: Arc<dyn Navigator>) -> Self {
        let session = SessionManager::new(config.clone(), store, navigator);
        let api = ApiClient::new(&config, session.clone());
        let users = UsersApi::new(api.clone());
        Self {
            session,
            api,
            users,
        }
    }
}
