//! Core use-case services.
//!
//! # Responsibility
//! - Gate every operation through `auth` before touching storage.
//! - Orchestrate repository calls into use-case level APIs.
//!
//! # Invariants
//! - Services never bypass repository validation/persistence contracts.
//! - Validation failures abort before any write.
//! - Log lines carry ids and counts only, never titles or names.

pub mod activity_service;
pub mod choice_service;
pub mod pictogram_service;
pub mod response;
pub mod user_service;
pub mod week_service;

use crate::auth::has_edit_or_read_user_access;
use crate::model::access::AccessLevel;
use crate::model::resource::{Frame, FrameKind, ResourceId, ResourceOwnership};
use crate::model::user::{User, UserId};
use crate::repo::resource_repo::ResourceRepository;
use crate::repo::user_repo::UserRepository;
use log::{error, info, warn};
use response::{ServiceError, ServiceResult};
use std::time::Instant;

/// Resolves `user_id` and checks that `actor` may act on it.
///
/// Order: unauthenticated, then unknown user, then access denied.
pub(crate) fn authorize_user_target<U: UserRepository>(
    users: &U,
    actor: Option<&User>,
    user_id: UserId,
) -> ServiceResult<User> {
    let actor = actor.ok_or(ServiceError::NotAuthorized)?;
    let target = users.get_user(user_id)?.ok_or(ServiceError::UserNotFound)?;
    if !has_edit_or_read_user_access(actor, &target) {
        return Err(ServiceError::NotAuthorized);
    }
    Ok(target)
}

/// Emits one `event=... module=... status=...` line for a finished operation.
///
/// `detail` carries extra `key=value` pairs; ids and counts only.
pub(crate) fn log_outcome<T>(
    event: &'static str,
    module: &'static str,
    started_at: Instant,
    detail: &str,
    result: &ServiceResult<T>,
) {
    let duration_ms = started_at.elapsed().as_millis();
    match result {
        Ok(_) => info!(
            "event={event} module={module} status=ok duration_ms={duration_ms} {detail}"
        ),
        Err(err) => match err.code() {
            Some(code) => warn!(
                "event={event} module={module} status=rejected duration_ms={duration_ms} error_code={code} {detail}"
            ),
            None => error!(
                "event={event} module={module} status=error duration_ms={duration_ms} error_code=infrastructure {detail} error={err}"
            ),
        },
    }
}

/// Owners a new resource at `level` gets from its creator.
pub(crate) fn ownership_for(level: AccessLevel, actor: Option<&User>) -> ResourceOwnership {
    match (level, actor) {
        (AccessLevel::Protected, Some(user)) => user
            .department_id
            .map(ResourceOwnership::owned_by_department)
            .unwrap_or_default(),
        (AccessLevel::Private, Some(user)) => ResourceOwnership::owned_by_user(user.id),
        _ => ResourceOwnership::default(),
    }
}

/// Loads frame `id` of `kind` and applies `gate` to it.
///
/// A missing id or a frame of another kind is `NotFound`.
pub(crate) fn load_gated_frame<R: ResourceRepository>(
    resources: &R,
    actor: Option<&User>,
    id: ResourceId,
    kind: FrameKind,
    gate: fn(AccessLevel, &ResourceOwnership, Option<&User>) -> bool,
) -> ServiceResult<(Frame, ResourceOwnership)> {
    let frame = resources
        .get_frame(id)?
        .filter(|frame| frame.kind() == kind)
        .ok_or(ServiceError::NotFound)?;
    let ownership = resources.get_ownership(id)?;
    if !gate(frame.access_level(), &ownership, actor) {
        return Err(ServiceError::NotAuthorized);
    }
    Ok((frame, ownership))
}

/// Rejects absent or blank titles.
pub(crate) fn require_title(title: &str) -> ServiceResult<()> {
    if title.trim().is_empty() {
        return Err(ServiceError::MissingProperties("title"));
    }
    Ok(())
}
