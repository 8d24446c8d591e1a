//! Role-scoped visibility and per-record mutation guards.

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::error::Result;
use crate::filter::Predicate;
use crate::models::{Defect, Role, Status, User};

/// Statuses an observer is allowed to see.
pub const OBSERVER_STATUSES: [Status; 2] = [Status::Review, Status::Closed];

/// The identity a request runs as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub role: Role,
    pub user_id: i64,
}

impl Actor {
    pub fn new(role: Role, user_id: i64) -> Self {
        Self { role, user_id }
    }

    /// Resolve a raw role string. Unknown roles fail with a policy error.
    pub fn from_raw(role: &str, user_id: i64) -> Result<Self> {
        match role.parse::<Role>() {
            Ok(role) => Ok(Self::new(role, user_id)),
            Err(err) => {
                warn!(user_id, role, "rejected unrecognized role");
                Err(err)
            }
        }
    }

    pub fn for_user(user: &User) -> Result<Self> {
        Self::from_raw(&user.role, user.id)
    }
}

/// Base predicate narrowing the defect collection to what `actor` may see.
pub fn scope(actor: &Actor) -> Predicate {
    match actor.role {
        Role::Manager => Predicate::all(),
        Role::Engineer => Predicate::builder().involves_user(actor.user_id).build(),
        Role::Observer => Predicate::builder().status_in(OBSERVER_STATUSES).build(),
    }
}

/// [`scope`] for a role that has not been parsed yet.
pub fn scope_raw(role: &str, user_id: i64) -> Result<Predicate> {
    Actor::from_raw(role, user_id).map(|actor| scope(&actor))
}

pub fn is_visible(actor: &Actor, defect: &Defect, now: DateTime<Utc>) -> bool {
    scope(actor).matches(defect, now)
}

pub fn can_create(actor: &Actor) -> bool {
    matches!(actor.role, Role::Manager | Role::Engineer)
}

/// Managers may edit anything; everyone else only what is assigned to them.
pub fn can_update(actor: &Actor, defect: &Defect) -> bool {
    actor.role == Role::Manager || defect.assignee_id == Some(actor.user_id)
}

pub fn can_delete(actor: &Actor) -> bool {
    actor.role == Role::Manager
}

pub fn can_comment(actor: &Actor, defect: &Defect, now: DateTime<Utc>) -> bool {
    actor.role != Role::Observer && is_visible(actor, defect, now)
}

pub fn can_export(actor: &Actor) -> bool {
    actor.role == Role::Manager
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::models::Priority;
    use proptest::prelude::*;

    fn defect(creator_id: i64, assignee_id: Option<i64>, status: Status) -> Defect {
        let now = Utc::now();
        Defect {
            id: 1,
            title: "Spalling concrete".to_string(),
            description: "Column C4".to_string(),
            status,
            priority: Priority::High,
            due_date: None,
            creator_id,
            assignee_id,
            project_id: 1,
            created_at: now,
            updated_at: now,
        }
    }

    // ==================== Unit Tests ====================

    #[test]
    fn test_manager_scope_is_unrestricted() {
        assert!(scope(&Actor::new(Role::Manager, 1)).is_unrestricted());
    }

    #[test]
    fn test_engineer_sees_created_or_assigned() {
        let now = Utc::now();
        let engineer = Actor::new(Role::Engineer, 5);
        assert!(is_visible(&engineer, &defect(5, None, Status::New), now));
        assert!(is_visible(&engineer, &defect(1, Some(5), Status::New), now));
        assert!(!is_visible(&engineer, &defect(1, Some(2), Status::Closed), now));
    }

    #[test]
    fn test_observer_sees_review_and_closed() {
        let now = Utc::now();
        let observer = Actor::new(Role::Observer, 9);
        assert!(is_visible(&observer, &defect(1, None, Status::Review), now));
        assert!(is_visible(&observer, &defect(1, None, Status::Closed), now));
        assert!(!is_visible(&observer, &defect(9, Some(9), Status::New), now));
        assert!(!is_visible(&observer, &defect(1, None, Status::InProgress), now));
    }

    #[test]
    fn test_unknown_role_never_widens() {
        let err = scope_raw("superuser", 1).unwrap_err();
        assert!(matches!(err, CoreError::Policy(_)));
        assert!(scope_raw("", 1).is_err());
        assert!(scope_raw("Manager", 1).is_err());
    }

    #[test]
    fn test_mutation_guards() {
        let manager = Actor::new(Role::Manager, 1);
        let engineer = Actor::new(Role::Engineer, 2);
        let observer = Actor::new(Role::Observer, 3);
        let now = Utc::now();

        assert!(can_create(&manager) && can_create(&engineer) && !can_create(&observer));
        assert!(can_delete(&manager) && !can_delete(&engineer));
        assert!(can_export(&manager) && !can_export(&observer));

        let own = defect(9, Some(2), Status::New);
        assert!(can_update(&engineer, &own));
        assert!(can_update(&manager, &own));
        // Creator without assignment may not edit.
        assert!(!can_update(&engineer, &defect(2, Some(7), Status::New)));

        assert!(can_comment(&engineer, &own, now));
        assert!(!can_comment(&observer, &defect(1, None, Status::Closed), now));
    }

    // ==================== Property-Based Tests ====================

    proptest! {
        #[test]
        fn prop_engineer_visibility_is_involvement(
            user in 1i64..6,
            creator in 1i64..6,
            assignee in proptest::option::of(1i64..6),
            status in prop::sample::select(Status::ALL.to_vec())
        ) {
            let engineer = Actor::new(Role::Engineer, user);
            let d = defect(creator, assignee, status);
            let expected = assignee == Some(user) || creator == user;
            prop_assert_eq!(is_visible(&engineer, &d, Utc::now()), expected);
        }

        #[test]
        fn prop_observer_visibility_is_status(
            status in prop::sample::select(Status::ALL.to_vec())
        ) {
            let observer = Actor::new(Role::Observer, 1);
            let d = defect(1, Some(1), status);
            let expected = matches!(status, Status::Closed | Status::Review);
            prop_assert_eq!(is_visible(&observer, &d, Utc::now()), expected);
        }
    }
}
