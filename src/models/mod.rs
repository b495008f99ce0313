// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the gateway's wire contracts.

pub mod token;
pub mod user;

pub use token::{LoginRequest, LoginResponse, RegisterRequest, TokenResponse};
pub use user::{RawProfile, RawRole, Role, User};
