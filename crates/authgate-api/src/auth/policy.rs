//! Claim-based authorization rules
//!
//! Pure decisions over the request principal and a target descriptor. The
//! rules never fetch or mutate the resource they guard.

use super::middleware::{AuthError, AuthenticatedUser};
use authgate_core::UserRole;

/// Outcome of an authorization rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        self == Decision::Allow
    }

    /// Turn a denial into [`AuthError::Forbidden`]
    pub fn enforce(self) -> Result<(), AuthError> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny => Err(AuthError::Forbidden),
        }
    }
}

/// Allow only principals holding exactly `expected`
pub fn require_role(principal: &AuthenticatedUser, expected: UserRole) -> Decision {
    if principal.role == expected {
        Decision::Allow
    } else {
        Decision::Deny
    }
}

/// Allow the privileged role unconditionally, and an ordinary user only on
/// their own record
pub fn require_self_or_role(
    principal: &AuthenticatedUser,
    target_user_id: &str,
    privileged: UserRole,
) -> Decision {
    if principal.role == privileged {
        return Decision::Allow;
    }

    match principal.role {
        UserRole::User if principal.user_id == target_user_id => Decision::Allow,
        _ => Decision::Deny,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn principal(role: UserRole, user_id: &str) -> AuthenticatedUser {
        AuthenticatedUser {
            user_id: user_id.to_string(),
            role,
            email: format!("{user_id}@example.com"),
        }
    }

    #[test]
    fn test_require_self_or_role_table() {
        let user_u1 = principal(UserRole::User, "u1");
        let admin_u9 = principal(UserRole::Admin, "u9");

        assert_eq!(
            require_self_or_role(&user_u1, "u2", UserRole::Admin),
            Decision::Deny
        );
        assert_eq!(
            require_self_or_role(&user_u1, "u1", UserRole::Admin),
            Decision::Allow
        );
        assert_eq!(
            require_self_or_role(&admin_u9, "anything", UserRole::Admin),
            Decision::Allow
        );
    }

    #[test]
    fn test_require_role_table() {
        assert_eq!(
            require_role(&principal(UserRole::User, "u1"), UserRole::Admin),
            Decision::Deny
        );
        assert_eq!(
            require_role(&principal(UserRole::Admin, "u1"), UserRole::Admin),
            Decision::Allow
        );
    }

    #[test]
    fn test_deny_maps_to_forbidden() {
        assert!(Decision::Allow.enforce().is_ok());
        assert!(matches!(Decision::Deny.enforce(), Err(AuthError::Forbidden)));
    }

    #[test]
    fn test_admin_is_not_matched_as_self_when_privileged_role_differs() {
        // With USER as the privileged role an admin gets no ownership shortcut.
        let admin = principal(UserRole::Admin, "u1");
        assert_eq!(
            require_self_or_role(&admin, "u1", UserRole::User),
            Decision::Deny
        );
    }

    fn role_strategy() -> impl Strategy<Value = UserRole> {
        prop_oneof![Just(UserRole::Admin), Just(UserRole::User)]
    }

    proptest! {
        #[test]
        fn prop_user_never_reaches_other_records(
            own in "[a-z0-9]{1,12}",
            target in "[a-z0-9]{1,12}",
        ) {
            let p = principal(UserRole::User, &own);
            let decision = require_self_or_role(&p, &target, UserRole::Admin);
            prop_assert_eq!(decision.is_allowed(), own == target);
        }

        #[test]
        fn prop_admin_reaches_every_record(
            own in "[a-z0-9]{1,12}",
            target in "[a-z0-9]{1,12}",
        ) {
            let p = principal(UserRole::Admin, &own);
            prop_assert!(require_self_or_role(&p, &target, UserRole::Admin).is_allowed());
        }

        #[test]
        fn prop_require_role_is_equality(held in role_strategy(), expected in role_strategy()) {
            let p = principal(held, "u1");
            prop_assert_eq!(require_role(&p, expected).is_allowed(), held == expected);
        }
    }
}
