//! Domain model for users, resources and week schedules.
//!
//! # Responsibility
//! - Define canonical data structures used by authorization and scheduling.
//! - Keep relationship data as id lists instead of object graphs.
//!
//! # Invariants
//! - Every resource carries exactly one `AccessLevel`.
//! - A week contains at most one weekday per day-of-week value.

pub mod access;
pub mod resource;
pub mod schedule;
pub mod user;
