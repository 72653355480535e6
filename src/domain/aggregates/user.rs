//! User accounts and the admin role.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleChange { Promote, Demote }

impl User {
    pub fn require_admin(&self) -> Result<(), UserError> {
        if self.is_admin { Ok(()) } else { Err(UserError::NotAdmin) }
    }

    /// Admins may change or delete other accounts, never their own.
    pub fn check_can_modify(&self, target: Uuid) -> Result<(), UserError> {
        self.require_admin()?;
        if self.id == target { return Err(UserError::SelfModification); }
        Ok(())
    }

    pub fn apply(&mut self, change: RoleChange) {
        self.is_admin = change == RoleChange::Promote;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UserError {
    #[error("admin access required")]
    NotAdmin,
    #[error("you cannot change or delete your own account")]
    SelfModification,
}
