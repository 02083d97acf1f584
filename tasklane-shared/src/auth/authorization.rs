/// Role checks for privileged operations
///
/// Ownership of individual tasks is enforced inside the store, which matches
/// both the task ID and the caller's user ID. The checks here cover the
/// admin tier, and run before any admin operation is dispatched.
///
/// # Example
///
/// ```
/// use tasklane_shared::auth::authorization::{forbid_self_deletion, require_admin};
/// use tasklane_shared::auth::context::{AuthContext, Role};
///
/// let admin = AuthContext { user_id: 0, username: "root".to_string(), role: Role::Admin };
/// assert!(require_admin(&admin).is_ok());
/// assert!(forbid_self_deletion(&admin, 5).is_ok());
/// ```

use super::context::AuthContext;

/// Error type for authorization checks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    /// Caller is not an administrator
    #[error("Admin access required")]
    AdminRequired,

    /// Caller tried to delete their own account
    #[error("Cannot delete your own account")]
    SelfDeletion,
}

/// Checks that the caller holds the admin role
///
/// # Errors
///
/// Returns `AuthzError::AdminRequired` for ordinary users.
pub fn require_admin(auth: &AuthContext) -> Result<(), AuthzError> {
    if !auth.is_admin() {
        return Err(AuthzError::AdminRequired);
    }

    Ok(())
}

/// Rejects a user deletion that targets the caller
pub fn forbid_self_deletion(auth: &AuthContext, target_user_id: i64) -> Result<(), AuthzError> {
    if auth.user_id == target_user_id {
        return Err(AuthzError::SelfDeletion);
    }

    Ok(())
}
