//! Role and ownership checks run after the authentication gate

use tracing::warn;

use super::error::AuthError;
use super::extractors::AuthContext;
use super::models::Role;

/// Caller must hold exactly `role`
pub fn require_role(context: &AuthContext, role: Role) -> Result<(), AuthError> {
    if context.role == role {
        return Ok(());
    }
    warn!(
        user_id = %context.user_id,
        role = %context.role,
        required = %role,
        "Forbidden: role requirement not met"
    );
    Err(AuthError::Forbidden(
        "Unauthorized to access this resource".to_string(),
    ))
}

/// Caller must be the target identity, or hold `role`
pub fn require_self_or_role(
    context: &AuthContext,
    target_id: &str,
    role: Role,
) -> Result<(), AuthError> {
    if context.user_id == target_id || context.role == role {
        return Ok(());
    }
    warn!(
        user_id = %context.user_id,
        target_id = %target_id,
        "Forbidden: caller is neither owner nor {}",
        role
    );
    Err(AuthError::Forbidden(
        "Unauthorized to access this resource".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(user_id: &str, role: Role) -> AuthContext {
        AuthContext {
            user_id: user_id.to_string(),
            email: format!("{}@x.com", user_id.to_lowercase()),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            role,
        }
    }

    #[test]
    fn test_require_role() {
        assert!(require_role(&context("U_A", Role::Admin), Role::Admin).is_ok());
        assert!(matches!(
            require_role(&context("U_B", Role::User), Role::Admin),
            Err(AuthError::Forbidden(_))
        ));
        // USER routes are not implicitly open to ADMIN
        assert!(require_role(&context("U_A", Role::Admin), Role::User).is_err());
    }

    #[test]
    fn test_require_self_or_role() {
        let user = context("U_B", Role::User);
        assert!(require_self_or_role(&user, "U_B", Role::Admin).is_ok());
        assert!(require_self_or_role(&user, "U_C", Role::Admin).is_err());

        let admin = context("U_A", Role::Admin);
        assert!(require_self_or_role(&admin, "U_C", Role::Admin).is_ok());
    }

    #[test]
    fn test_checks_are_repeatable() {
        let user = context("U_B", Role::User);
        for _ in 0..2 {
            assert!(require_role(&user, Role::Admin).is_err());
            assert!(require_self_or_role(&user, "U_B", Role::Admin).is_ok());
        }
    }
}
