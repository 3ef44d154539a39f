use crate::error::CoreError;
use fraghub_models::role::Role;

/// The authenticated caller of a mutating operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: i64,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: i64, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn is_moderator(&self) -> bool {
        has_role(self.role, Role::Moderator)
    }
}

/// Roles are ordered user < moderator < admin; a higher role satisfies a lower requirement.
pub fn has_role(user_role: Role, required: Role) -> bool {
    user_role >= required
}

pub fn require_role(actor: &Actor, required: Role) -> Result<(), CoreError> {
    if has_role(actor.role, required) {
        Ok(())
    } else {
        Err(CoreError::Forbidden)
    }
}

/// Authors may edit their own content; anyone else needs `required`.
pub fn require_owner_or_role(actor: &Actor, owner_id: i64, required: Role) -> Result<(), CoreError> {
    if actor.user_id == owner_id {
        return Ok(());
    }
    require_role(actor, required)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_ordering_is_respected() {
        assert!(has_role(Role::Admin, Role::Moderator));
        assert!(has_role(Role::Moderator, Role::Moderator));
        assert!(has_role(Role::User, Role::User));
        assert!(!has_role(Role::User, Role::Moderator));
        assert!(!has_role(Role::Moderator, Role::Admin));
    }

    #[test]
    fn require_role_returns_forbidden() {
        let user = Actor::new(1, Role::User);
        assert!(matches!(
            require_role(&user, Role::Moderator),
            Err(CoreError::Forbidden)
        ));
        assert!(require_role(&Actor::new(2, Role::Admin), Role::Moderator).is_ok());
    }

    #[test]
    fn owner_bypasses_role_requirement() {
        let author = Actor::new(7, Role::User);
        assert!(require_owner_or_role(&author, 7, Role::Moderator).is_ok());
        assert!(require_owner_or_role(&author, 8, Role::Moderator).is_err());
        let moderator = Actor::new(9, Role::Moderator);
        assert!(require_owner_or_role(&moderator, 8, Role::Moderator).is_ok());
    }
}
