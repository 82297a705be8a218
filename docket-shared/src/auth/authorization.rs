/// Role gate for role-restricted operations
///
/// Ownership checks are not done here: every store query is already scoped
/// to the caller, so a record owned by someone else simply is not found.
///
/// # Example
///
/// ```
/// use docket_shared::auth::authorization::{require_role, AuthzError};
/// use docket_shared::models::user::Role;
///
/// assert!(require_role(Role::User, &[Role::User, Role::Admin]).is_ok());
/// assert!(matches!(
///     require_role(Role::Guest, &[Role::User]),
///     Err(AuthzError::InsufficientRole { .. })
/// ));
/// ```

use crate::models::user::Role;

/// Error type for authorization checks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    /// Caller's role is not in the allowed set
    #[error("Insufficient permissions: requires one of {allowed:?}, has {actual:?}")]
    InsufficientRole { allowed: Vec<Role>, actual: Role },
}

/// Checks that `role` is one of `allowed`
pub fn require_role(role: Role, allowed: &[Role]) -> Result<(), AuthzError> {
    if allowed.contains(&role) {
        return Ok(());
    }

    Err(AuthzError::InsufficientRole {
        allowed: allowed.to_vec(),
        actual: role,
    })
}

/// Roles allowed to invite people into their company
pub const INVITER_ROLES: &[Role] = &[Role::User];
