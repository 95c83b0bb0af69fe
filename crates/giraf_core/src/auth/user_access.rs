//! User-to-user access checks.

use crate::model::user::{NewUser, User};

/// Grants access to self, to a guardian of `target`, and to members of the
/// same department.
pub fn has_edit_or_read_user_access(actor: &User, target: &User) -> bool {
    if actor.id == target.id {
        return true;
    }
    if target.is_guarded_by(actor.id) {
        return true;
    }
    matches!(
        (actor.department_id, target.department_id),
        (Some(left), Some(right)) if left == right
    )
}

/// Optional-argument form of [`has_edit_or_read_user_access`]. An absent
/// side denies.
pub fn check_user_access(actor: Option<&User>, target: Option<&User>) -> bool {
    match (actor, target) {
        (Some(actor), Some(target)) => has_edit_or_read_user_access(actor, target),
        _ => false,
    }
}

/// Whether `actor` may register `guardian` as guardian of `citizen`.
///
/// Only the guardian itself, or a department administrator of the
/// citizen's department, may create the link. Access to the citizen is
/// checked separately.
pub fn can_assign_guardian(actor: &User, guardian: &User, citizen: &User) -> bool {
    if actor.id == guardian.id {
        return true;
    }
    actor.role.administers_department() && same_department(actor, citizen.department_id)
}

/// Whether `actor` may create `account`: a strictly lower role inside the
/// actor's own department.
pub fn can_register(actor: &User, account: &NewUser) -> bool {
    actor.role.outranks(account.role) && same_department(actor, account.department_id)
}

/// Whether `actor` may delete `target`: user access plus a strictly higher
/// role. Nobody deletes their own account here.
pub fn can_delete_user(actor: &User, target: &User) -> bool {
    has_edit_or_read_user_access(actor, target) && actor.role.outranks(target.role)
}

fn same_department(actor: &User, department_id: Option<i64>) -> bool {
    matches!(
        (actor.department_id, department_id),
        (Some(left), Some(right)) if left == right
    )
}
