//! Authorization decisions for every protected operation.
//!
//! Routes never compare roles themselves: they build an [`Actor`] from the session
//! and ask one of the functions below.

use super::permissions::{Permission, UserRole};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: usize,
    pub role: UserRole,
    pub approved: bool,
}

/// The user an administrative change is aimed at, as currently stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub user_id: usize,
    pub role: UserRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserChange {
    SetRole(UserRole),
    SetApproval(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PolicyDenial {
    #[error("Account is waiting for approval")]
    NotApproved,
    #[error("Missing permission {0:?}")]
    MissingPermission(Permission),
    #[error("Users cannot change their own role or approval")]
    SelfChange,
    #[error("Owner accounts cannot be modified")]
    OwnerImmutable,
    #[error("Only owners can grant the owner role")]
    OwnerGrantRequiresOwner,
    #[error("Target user has an equal or higher role")]
    TargetOutranksActor,
    #[error("Cannot assign a role equal to or above your own")]
    RoleAboveActor,
    #[error("Only the author or a moderator can remove this content")]
    NotAuthor,
}

impl Actor {
    pub fn new(user_id: usize, role: UserRole, approved: bool) -> Self {
        Self {
            user_id,
            role,
            approved,
        }
    }

    /// Unapproved accounts hold no permissions at all.
    pub fn permissions(&self) -> &'static [Permission] {
        if self.approved {
            self.role.permissions()
        } else {
            &[]
        }
    }

    pub fn has(&self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }
}

pub fn require(actor: &Actor, permission: Permission) -> Result<(), PolicyDenial> {
    if !actor.approved {
        return Err(PolicyDenial::NotApproved);
    }
    if !actor.has(permission) {
        return Err(PolicyDenial::MissingPermission(permission));
    }
    Ok(())
}

pub fn authorize_user_change(
    actor: &Actor,
    target: &Target,
    change: UserChange,
) -> Result<(), PolicyDenial> {
    require(actor, Permission::ManageUsers)?;

    if actor.user_id == target.user_id {
        return Err(PolicyDenial::SelfChange);
    }
    if target.role == UserRole::Owner {
        return Err(PolicyDenial::OwnerImmutable);
    }
    if let UserChange::SetRole(UserRole::Owner) = change {
        if actor.role != UserRole::Owner {
            return Err(PolicyDenial::OwnerGrantRequiresOwner);
        }
    }
    if actor.role == UserRole::Owner {
        return Ok(());
    }

    if target.role >= actor.role {
        return Err(PolicyDenial::TargetOutranksActor);
    }
    if let UserChange::SetRole(new_role) = change {
        if new_role >= actor.role {
            return Err(PolicyDenial::RoleAboveActor);
        }
    }
    Ok(())
}

pub fn authorize_content_removal(actor: &Actor, author_id: usize) -> Result<(), PolicyDenial> {
    if !actor.approved {
        return Err(PolicyDenial::NotApproved);
    }
    if actor.user_id == author_id || actor.has(Permission::ModerateContent) {
        Ok(())
    } else {
        Err(PolicyDenial::NotAuthor)
    }
}
