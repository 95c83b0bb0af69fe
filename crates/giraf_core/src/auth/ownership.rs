//! Resource ownership resolver.
//!
//! Decision table:
//!
//! | level     | anonymous | authenticated                                |
//! |-----------|-----------|----------------------------------------------|
//! | public    | allow     | allow                                        |
//! | protected | deny      | actor department is an owning department     |
//! | private   | deny      | actor is a direct owner                      |

use crate::model::access::AccessLevel;
use crate::model::resource::ResourceOwnership;
use crate::model::user::User;

/// Returns whether `actor` may read a resource.
pub fn can_access(
    level: AccessLevel,
    ownership: &ResourceOwnership,
    actor: Option<&User>,
) -> bool {
    match level {
        AccessLevel::Public => true,
        AccessLevel::Protected => actor
            .and_then(|user| user.department_id)
            .is_some_and(|department_id| ownership.department_ids.contains(&department_id)),
        AccessLevel::Private => {
            actor.is_some_and(|user| ownership.user_ids.contains(&user.id))
        }
    }
}

/// Edit permission coincides with read permission.
pub fn can_edit(level: AccessLevel, ownership: &ResourceOwnership, actor: Option<&User>) -> bool {
    can_access(level, ownership, actor)
}

/// Delete permission coincides with read permission.
pub fn can_delete(
    level: AccessLevel,
    ownership: &ResourceOwnership,
    actor: Option<&User>,
) -> bool {
    can_access(level, ownership, actor)
}

/// Returns whether `actor` may create a resource at `level`.
///
/// Protected resources need a department to own them; private ones need a
/// user.
pub fn can_create(level: AccessLevel, actor: Option<&User>) -> bool {
    match level {
        AccessLevel::Public => true,
        AccessLevel::Protected => actor.is_some_and(|user| user.department_id.is_some()),
        AccessLevel::Private => actor.is_some(),
    }
}
