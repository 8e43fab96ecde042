//! Explicit caller identity passed to every domain operation.

use common::UserId;

use crate::DomainError;

/// Who is invoking an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Caller {
    #[default]
    Anonymous,
    Customer(UserId),
    Admin(UserId),
}

impl Caller {
    /// The caller's user id, if any.
    pub fn id(&self) -> Option<UserId> {
        match self {
            Caller::Anonymous => None,
            Caller::Customer(id) | Caller::Admin(id) => Some(*id),
        }
    }

    /// The caller's user id, or `NotAuthenticated`.
    pub fn user_id(&self) -> Result<UserId, DomainError> {
        self.id().ok_or(DomainError::NotAuthenticated)
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Caller::Admin(_))
    }

    /// Succeeds only for administrators.
    pub fn require_admin(&self) -> Result<UserId, DomainError> {
        match self {
            Caller::Anonymous => Err(DomainError::NotAuthenticated),
            Caller::Customer(_) => Err(DomainError::AccessDenied),
            Caller::Admin(id) => Ok(*id),
        }
    }

    /// True if the caller owns the resource or is an administrator.
    pub fn can_access(&self, owner: UserId) -> bool {
        match self {
            Caller::Anonymous => false,
            Caller::Customer(id) => *id == owner,
            Caller::Admin(_) => true,
        }
    }

    /// Like [`Caller::can_access`], with the matching error.
    pub fn require_access(&self, owner: UserId) -> Result<UserId, DomainError> {
        let id = self.user_id()?;
        if self.can_access(owner) {
            Ok(id)
        } else {
            Err(DomainError::AccessDenied)
        }
    }
}
