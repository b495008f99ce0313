//! User and role models, normalized from the heterogeneous profile endpoints.
//!
//! The gateway is inconsistent about profile shapes: some endpoints return
//! `nombre` + `apellido`, others a bare `name`, and the email field appears as
//! either `correo` or `email`. [`RawProfile`] captures the union of those
//! shapes and [`RawProfile::normalize`] maps it to the fixed-shape [`User`]
//! that the rest of the crate (and the persisted session) works with. The raw
//! shape never leaves this module's callers.

use serde::{Deserialize, Serialize};

/// A role granted to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: u64,
    pub name: String,
    pub description: Option<String>,
    pub active: bool,
}

/// Normalized user profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub display_name: String,
    pub email: Option<String>,
    pub active: bool,
    #[serde(default)]
    pub roles: Vec<Role>,
}

impl User {
    /// Case-insensitive role membership check.
    pub fn has_role(&self, name: &str) -> bool {
        self.roles.iter().any(|r| r.name.eq_ignore_ascii_case(name))
    }
}

/// Profile as the gateway actually sends it.
#[derive(Debug, Clone, Deserialize)]
pub struct RawProfile {
    pub id: u64,
    #[serde(default)]
    pub nombre: Option<String>,
    #[serde(default)]
    pub apellido: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub correo: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub activo: Option<bool>,
    #[serde(default, rename = "estaActivo")]
    pub esta_activo: Option<bool>,
    #[serde(default)]
    pub roles: Vec<RawRole>,
}

/// Role entry as the gateway sends it.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRole {
    pub id: u64,
    pub nombre: String,
    #[serde(default)]
    pub descripcion: Option<String>,
    #[serde(default)]
    pub activo: Option<bool>,
}

impl RawProfile {
    /// Map the wire shape to a [`User`].
    ///
    /// Display name fallback order: `nombre [apellido]`, then `name`, then the
    /// local part of the email address, then empty. A missing active flag is
    /// treated as active (the gateway omits it for live accounts).
    pub fn normalize(self) -> User {
        let email = self.correo.or(self.email);

        let display_name = if let Some(nombre) = self.nombre {
            match self.apellido {
                Some(apellido) => format!("{nombre} {apellido}"),
                None => nombre,
            }
        } else if let Some(name) = self.name {
            name
        } else if let Some(email) = email.as_deref() {
            email.split('@').next().unwrap_or_default().to_string()
        } else {
            String::new()
        };

        User {
            id: self.id,
            display_name,
            email,
            active: self.activo.or(self.esta_activo).unwrap_or(true),
            roles: self
                .roles
                .into_iter()
                .map(|r| Role {
                    id: r.id,
                    name: r.nombre,
                    description: r.descripcion,
                    active: r.activo.unwrap_or(true),
                })
                .collect(),
        }
    }
}
