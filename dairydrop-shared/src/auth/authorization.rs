/// Role-based authorization checks
///
/// The storefront has two roles. `Admin` can do everything a `User` can,
/// plus catalog, order, review and user administration.
///
/// # Example
///
/// ```
/// use dairydrop_shared::auth::authorization::require_role;
/// use dairydrop_shared::auth::middleware::AuthContext;
/// use dairydrop_shared::models::user::UserRole;
/// use uuid::Uuid;
///
/// let customer = AuthContext::from_jwt(Uuid::new_v4(), UserRole::User);
/// assert!(require_role(&customer, UserRole::User).is_ok());
/// assert!(require_role(&customer, UserRole::Admin).is_err());
/// ```

use super::middleware::AuthContext;
use crate::models::user::UserRole;

/// Error type for authorization checks
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// Caller doesn't have the required role
    #[error("Insufficient permissions: requires {required:?}, has {actual:?}")]
    InsufficientRole {
        required: UserRole,
        actual: UserRole,
    },
}

/// Checks that the caller's role satisfies `required`
pub fn require_role(auth: &AuthContext, required: UserRole) -> Result<(), AuthzError> {
    if auth.role.satisfies(required) {
        Ok(())
    } else {
        Err(AuthzError::InsufficientRole {
            required,
            actual: auth.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_require_role() {
        let user = AuthContext::from_jwt(Uuid::new_v4(), UserRole::User);
        let admin = AuthContext::from_jwt(Uuid::new_v4(), UserRole::Admin);

        assert!(require_role(&user, UserRole::User).is_ok());
        assert!(require_role(&admin, UserRole::User).is_ok());
        assert!(require_role(&admin, UserRole::Admin).is_ok());

        match require_role(&user, UserRole::Admin) {
            Err(AuthzError::InsufficientRole { required, actual }) => {
                assert_eq!(required, UserRole::Admin);
                assert_eq!(actual, UserRole::User);
            }
            other => panic!("expected InsufficientRole, got {:?}", other),
        }
    }
}
