//! Authenticated caller identity and ownership rules.
//!
//! The core never reads session state. Every operation receives the caller
//! explicitly, already authenticated by the surrounding layer.

use serde::{Deserialize, Serialize};
use tally_shared::types::UserId;

use crate::error::BudgetError;

/// Caller role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular user, may only touch their own records.
    User,
    /// Administrator, may touch any record.
    Admin,
}

/// An authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    /// Caller's user ID.
    pub user_id: UserId,
    /// Caller's role.
    pub role: Role,
}

impl Caller {
    /// Creates a regular user caller.
    #[must_use]
    pub const fn user(user_id: UserId) -> Self {
        Self {
            user_id,
            role: Role::User,
        }
    }

    /// Creates an admin caller.
    #[must_use]
    pub const fn admin(user_id: UserId) -> Self {
        Self {
            user_id,
            role: Role::Admin,
        }
    }

    /// Returns true if the caller has the admin role.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Allows access when the caller owns the record or is an admin.
    ///
    /// # Errors
    ///
    /// Returns `BudgetError::AccessDenied` otherwise.
    pub fn ensure_can_access(&self, owner: UserId) -> Result<(), BudgetError> {
        if owner == self.user_id || self.is_admin() {
            Ok(())
        } else {
            Err(BudgetError::AccessDenied)
        }
    }
}
