//! Authorization gate.
//!
//! Decides whether an authenticated [`Actor`] may act on a target account. The gate is
//! pure: no IO, no panics. Its outputs, [`Grant`] and [`AdminGrant`], have private
//! fields and are required by every mutating entry point of the ledger, so an
//! operation cannot run before the check has passed.

use crate::entities::Role;
use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};

/// An authenticated identity with its role claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    /// Ledger user id
    pub id: i64,
    /// Role claim
    pub role: Role,
}

impl Actor {
    /// Creates an actor.
    #[must_use]
    pub const fn new(id: i64, role: Role) -> Self {
        Self { id, role }
    }
}

/// True iff the actor's role claim is `admin`.
#[must_use]
pub const fn is_admin(actor: &Actor) -> bool {
    matches!(actor.role, Role::Admin)
}

/// True iff the actor is an admin or is the target user.
#[must_use]
pub const fn can_act_on_user(actor: &Actor, target_user_id: i64) -> bool {
    is_admin(actor) || actor.id == target_user_id
}

/// Proof that an actor passed the gate for one target account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grant {
    actor: Actor,
    user_id: i64,
}

impl Grant {
    /// The actor the grant was issued to.
    #[must_use]
    pub const fn actor(&self) -> &Actor {
        &self.actor
    }

    /// The account the actor may act on.
    #[must_use]
    pub const fn user_id(&self) -> i64 {
        self.user_id
    }
}

/// Proof that an actor passed the gate as an administrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminGrant {
    actor: Actor,
}

impl AdminGrant {
    /// Identity used by in-process jobs such as the salary scheduler.
    pub(crate) const fn system() -> Self {
        Self {
            actor: Actor::new(0, Role::Admin),
        }
    }

    /// The administrator the grant was issued to.
    #[must_use]
    pub const fn actor(&self) -> &Actor {
        &self.actor
    }

    /// An administrator may act on any account.
    #[must_use]
    pub const fn grant_for(&self, user_id: i64) -> Grant {
        Grant {
            actor: self.actor,
            user_id,
        }
    }
}

/// Gate for acting on one account.
///
/// # Errors
/// * [`Error::Authentication`] when there is no actor
/// * [`Error::Authorization`] when the actor is neither admin nor the owner
pub fn authorize(actor: Option<&Actor>, target_user_id: i64) -> Result<Grant> {
    let actor = actor.ok_or(Error::Authentication)?;
    if !can_act_on_user(actor, target_user_id) {
        return Err(Error::authorization(format!(
            "user {} may not act on user {target_user_id}",
            actor.id
        )));
    }
    Ok(Grant {
        actor: *actor,
        user_id: target_user_id,
    })
}

/// Gate for acting on one's own account.
pub fn authorize_self(actor: Option<&Actor>) -> Result<Grant> {
    let actor = actor.ok_or(Error::Authentication)?;
    authorize(Some(actor), actor.id)
}

/// Gate for admin-only operations.
///
/// # Errors
/// * [`Error::Authentication`] when there is no actor
/// * [`Error::Authorization`] when the actor is not an admin
pub fn require_admin(actor: Option<&Actor>) -> Result<AdminGrant> {
    let actor = actor.ok_or(Error::Authentication)?;
    if !is_admin(actor) {
        return Err(Error::authorization(format!(
            "user {} is not an admin",
            actor.id
        )));
    }
    Ok(AdminGrant { actor: *actor })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::errors::ErrorKind;

    const ADMIN: Actor = Actor::new(1, Role::Admin);
    const ALICE: Actor = Actor::new(2, Role::User);

    #[test]
    fn test_predicates() {
        assert!(is_admin(&ADMIN));
        assert!(!is_admin(&ALICE));
        assert!(can_act_on_user(&ADMIN, 99));
        assert!(can_act_on_user(&ALICE, 2));
        assert!(!can_act_on_user(&ALICE, 3));
    }

    #[test]
    fn test_authorize_owner_and_admin() {
        let own = authorize(Some(&ALICE), 2).unwrap();
        assert_eq!(own.user_id(), 2);
        assert_eq!(own.actor(), &ALICE);

        let other = authorize(Some(&ADMIN), 2).unwrap();
        assert_eq!(other.user_id(), 2);
        assert_eq!(other.actor().id, 1);
    }

    #[test]
    fn test_authorize_rejects_missing_and_foreign_actor() {
        assert_eq!(
            authorize(None, 2).unwrap_err().kind(),
            ErrorKind::Authentication
        );
        assert_eq!(
            authorize(Some(&ALICE), 3).unwrap_err().kind(),
            ErrorKind::Authorization
        );
        assert_eq!(authorize_self(None).unwrap_err().kind(), ErrorKind::Authentication);
        assert_eq!(authorize_self(Some(&ALICE)).unwrap().user_id(), 2);
    }

    #[test]
    fn test_require_admin() {
        let admin = require_admin(Some(&ADMIN)).unwrap();
        assert_eq!(admin.grant_for(42).user_id(), 42);
        assert_eq!(
            require_admin(Some(&ALICE)).unwrap_err().kind(),
            ErrorKind::Authorization
        );
        assert_eq!(require_admin(None).unwrap_err().kind(), ErrorKind::Authentication);
    }
}
