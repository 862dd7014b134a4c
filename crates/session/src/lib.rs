use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

mod password;
pub use password::*;
mod store;
pub use store::*;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("user file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("password hash error: {0}")]
    Hash(String),
    #[error("unknown user: {0}")]
    UnknownUser(String),
    #[error("wrong password")]
    WrongPassword,
    #[error("user already exists: {0}")]
    DuplicateUser(String),
    #[error("password must be at least {0} characters")]
    WeakPassword(usize),
    #[error("administrator role required")]
    AdminRequired,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => f.write_str("admin"),
            Role::User => f.write_str("user"),
        }
    }
}

/// Outcome of a login: either anonymous or a user with a role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: Option<Uuid>,
    pub username: Option<String>,
    pub role: Option<Role>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn logged_in(&self) -> bool {
        self.user_id.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.role == Some(Role::Admin)
    }

    pub fn require_admin(&self) -> Result<(), AuthError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AuthError::AdminRequired)
        }
    }

    pub fn logout(&mut self) {
        *self = Self::anonymous();
    }
}
