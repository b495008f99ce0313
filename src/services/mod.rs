// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - session lifecycle and resource wrappers.

pub mod session;
pub mod users;

pub use session::SessionManager;
pub use users::UsersApi;
