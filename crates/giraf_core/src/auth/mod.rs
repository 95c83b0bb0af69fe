//! Authorization gates.
//!
//! # Responsibility
//! - Decide resource visibility from access level and ownership rows.
//! - Decide user-to-user access for schedule and settings operations.
//! - Decide who may link guardians and register or delete accounts.
//!
//! # Invariants
//! - Every function here is pure: no I/O, no logging, no mutation.
//! - Missing or inconsistent data always denies.

pub mod ownership;
pub mod user_access;

pub use ownership::{can_access, can_create, can_delete, can_edit};
pub use user_access::{
    can_assign_guardian, can_delete_user, can_register, check_user_access,
    has_edit_or_read_user_access,
};
