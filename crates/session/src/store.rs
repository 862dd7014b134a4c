use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{hash_password, validate_password_strength, verify_password, AuthError, Role, Session};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    /// Argon2 PHC string.
    pub hash: String,
    pub role: Role,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct UserFile {
    users: Vec<UserRecord>,
}

/// Users backed by a JSON file of the form `{"users": [...]}`.
#[derive(Debug, Clone, Default)]
pub struct UserStore {
    path: Option<PathBuf>,
    users: Vec<UserRecord>,
}

impl UserStore {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// A missing file yields an empty store that will be created on save.
    pub fn load(path: &Path) -> Result<Self, AuthError> {
        let users = match fs::read_to_string(path) {
            Ok(text) => serde_json::from_str::<UserFile>(&text)?.users,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no user file yet");
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path: Some(path.to_path_buf()),
            users,
        })
    }

    pub fn save(&self) -> Result<(), AuthError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = UserFile {
            users: self.users.clone(),
        };
        fs::write(path, serde_json::to_string_pretty(&file)?)?;
        Ok(())
    }

    pub fn users(&self) -> &[UserRecord] {
        &self.users
    }

    pub fn find(&self, username: &str) -> Option<&UserRecord> {
        self.users.iter().find(|u| u.username == username)
    }

    pub fn add_user(
        &mut self,
        username: &str,
        password: &str,
        role: Role,
    ) -> Result<&UserRecord, AuthError> {
        if self.find(username).is_some() {
            return Err(AuthError::DuplicateUser(username.to_string()));
        }
        validate_password_strength(password)?;
        let record = UserRecord {
            id: Uuid::new_v4(),
            username: username.to_string(),
            hash: hash_password(password)?,
            role,
        };
        info!(username, %role, "user added");
        self.users.push(record);
        let idx = self.users.len() - 1;
        Ok(&self.users[idx])
    }

    /// Unknown names and wrong passwords are reported separately.
    pub fn login(&self, username: &str, password: &str) -> Result<Session, AuthError> {
        let user = self.find(username).ok_or_else(|| {
            info!(username, "login failed: unknown user");
            AuthError::UnknownUser(username.to_string())
        })?;
        if !verify_password(password, &user.hash)? {
            info!(username, "login failed: wrong password");
            return Err(AuthError::WrongPassword);
        }
        info!(username, role = %user.role, "login succeeded");
        Ok(Session {
            user_id: Some(user.id),
            username: Some(user.username.clone()),
            role: Some(user.role),
        })
    }

    /// Re-resolves a session against the current store, like a page reload.
    pub fn check(&self, session: &Session) -> Session {
        match session
            .user_id
            .and_then(|id| self.users.iter().find(|u| u.id == id))
        {
            Some(user) => Session {
                user_id: Some(user.id),
                username: Some(user.username.clone()),
                role: Some(user.role),
            },
            None => Session::anonymous(),
        }
    }
}
