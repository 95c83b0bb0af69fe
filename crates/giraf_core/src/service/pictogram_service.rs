//! Pictogram use-case service.
//!
//! # Responsibility
//! - Gate pictogram reads and writes through the ownership resolver.
//! - Keep image bytes and the `has_image` flag in step.
//! - Seed the public placeholder pictogram.
//!
//! # Invariants
//! - Update and delete require an authenticated actor.
//! - A level change adds the ownership row the new level needs in the
//!   same transaction as the frame write; existing rows are never removed.
//! - Deleting a pictogram succeeds once its row is deleted, even if the
//!   image file cannot be removed.

use crate::auth::{can_access, can_create, can_delete, can_edit};
use crate::image_store::ImageStore;
use crate::model::resource::{
    merge_frame, Frame, FrameKind, FrameUpdate, NewPictogram, Pictogram, PictogramUpdate,
    ResourceId,
};
use crate::model::user::User;
use crate::repo::now_epoch_ms;
use crate::repo::resource_repo::ResourceRepository;
use crate::service::response::{ServiceError, ServiceResult};
use crate::service::{load_gated_frame, log_outcome, ownership_for, require_title};
use log::warn;
use std::time::Instant;

/// Largest accepted page size for pictogram listings.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Listing filter and 1-based paging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PictogramQuery {
    /// Case-insensitive title substring.
    pub title: Option<String>,
    pub page: u32,
    pub page_size: u32,
}

impl Default for PictogramQuery {
    fn default() -> Self {
        Self {
            title: None,
            page: 1,
            page_size: 10,
        }
    }
}

/// Use-case service for pictogram operations.
pub struct PictogramService<R: ResourceRepository, I: ImageStore> {
    resources: R,
    images: I,
}

impl<R: ResourceRepository, I: ImageStore> PictogramService<R, I> {
    pub fn new(resources: R, images: I) -> Self {
        Self { resources, images }
    }

    /// Returns a pictogram visible to `actor`.
    pub fn read_pictogram(&self, actor: Option<&User>, id: ResourceId) -> ServiceResult<Pictogram> {
        let (frame, _) = load_gated_frame(
            &self.resources,
            actor,
            id,
            FrameKind::Pictogram,
            can_access,
        )?;
        into_pictogram(frame)
    }

    /// Lists pictograms visible to `actor`, ordered by title.
    pub fn list_pictograms(
        &self,
        actor: Option<&User>,
        query: &PictogramQuery,
    ) -> ServiceResult<Vec<Pictogram>> {
        if query.page == 0 || query.page_size == 0 || query.page_size > MAX_PAGE_SIZE {
            return Err(ServiceError::InvalidProperties(format!(
                "page must be >= 1 and page_size in 1..={MAX_PAGE_SIZE}"
            )));
        }
        let skip = (query.page as usize - 1) * query.page_size as usize;

        let visible = self
            .resources
            .list_pictograms(query.title.as_deref())?
            .into_iter()
            .filter(|(pictogram, ownership)| can_access(pictogram.access_level, ownership, actor))
            .map(|(pictogram, _)| pictogram)
            .skip(skip)
            .take(query.page_size as usize)
            .collect();
        Ok(visible)
    }

    /// Creates a pictogram owned according to `access_level`.
    pub fn create_pictogram(
        &self,
        actor: Option<&User>,
        pictogram: &NewPictogram,
    ) -> ServiceResult<Pictogram> {
        let started_at = Instant::now();
        let result = self.create_pictogram_inner(actor, pictogram);
        let detail = match &result {
            Ok(created) => format!(
                "resource_id={} access_level={}",
                created.key,
                created.access_level.as_str()
            ),
            Err(_) => format!("access_level={}", pictogram.access_level.as_str()),
        };
        log_outcome("pictogram_create", "pictogram", started_at, &detail, &result);
        result
    }

    fn create_pictogram_inner(
        &self,
        actor: Option<&User>,
        pictogram: &NewPictogram,
    ) -> ServiceResult<Pictogram> {
        require_title(&pictogram.title)?;
        if !can_create(pictogram.access_level, actor) {
            return Err(ServiceError::NotAuthorized);
        }
        let ownership = ownership_for(pictogram.access_level, actor);
        Ok(self.resources.create_pictogram(pictogram, &ownership)?)
    }

    /// Replaces title and access level.
    pub fn update_pictogram(
        &self,
        actor: Option<&User>,
        id: ResourceId,
        update: PictogramUpdate,
    ) -> ServiceResult<Pictogram> {
        let started_at = Instant::now();
        let result = self.update_pictogram_inner(actor, id, update);
        log_outcome(
            "pictogram_update",
            "pictogram",
            started_at,
            &format!("resource_id={id}"),
            &result,
        );
        result
    }

    fn update_pictogram_inner(
        &self,
        actor: Option<&User>,
        id: ResourceId,
        update: PictogramUpdate,
    ) -> ServiceResult<Pictogram> {
        let actor = actor.ok_or(ServiceError::NotAuthorized)?;
        require_title(&update.title)?;
        let (mut frame, _) = load_gated_frame(
            &self.resources,
            Some(actor),
            id,
            FrameKind::Pictogram,
            can_edit,
        )?;
        let new_level = update.access_level;
        if !can_create(new_level, Some(actor)) {
            return Err(ServiceError::NotAuthorized);
        }

        merge_frame(&mut frame, FrameUpdate::Pictogram(update), now_epoch_ms())?;
        self.resources
            .update_frame(&frame, &ownership_for(new_level, Some(actor)))?;
        into_pictogram(frame)
    }

    /// Deletes the pictogram and its image.
    pub fn delete_pictogram(&self, actor: Option<&User>, id: ResourceId) -> ServiceResult<()> {
        let started_at = Instant::now();
        let result = self.delete_pictogram_inner(actor, id);
        log_outcome(
            "pictogram_delete",
            "pictogram",
            started_at,
            &format!("resource_id={id}"),
            &result,
        );
        result
    }

    fn delete_pictogram_inner(&self, actor: Option<&User>, id: ResourceId) -> ServiceResult<()> {
        let actor = actor.ok_or(ServiceError::NotAuthorized)?;
        load_gated_frame(
            &self.resources,
            Some(actor),
            id,
            FrameKind::Pictogram,
            can_delete,
        )?;
        self.resources.delete_resource(id)?;
        // The row is gone at this point; a leftover file is unreachable.
        if let Err(err) = self.images.remove(id) {
            warn!(
                "event=pictogram_image_remove module=pictogram status=error resource_id={id} error={err}"
            );
        }
        Ok(())
    }

    /// Stores image bytes for a pictogram the actor may edit.
    pub fn set_image(
        &self,
        actor: Option<&User>,
        id: ResourceId,
        bytes: &[u8],
    ) -> ServiceResult<Pictogram> {
        let started_at = Instant::now();
        let result = self.set_image_inner(actor, id, bytes);
        log_outcome(
            "pictogram_set_image",
            "pictogram",
            started_at,
            &format!("resource_id={id} bytes={}", bytes.len()),
            &result,
        );
        result
    }

    fn set_image_inner(
        &self,
        actor: Option<&User>,
        id: ResourceId,
        bytes: &[u8],
    ) -> ServiceResult<Pictogram> {
        let actor = actor.ok_or(ServiceError::NotAuthorized)?;
        if bytes.is_empty() {
            return Err(ServiceError::MissingProperties("image"));
        }
        let (frame, _) = load_gated_frame(
            &self.resources,
            Some(actor),
            id,
            FrameKind::Pictogram,
            can_edit,
        )?;
        let mut pictogram = into_pictogram(frame)?;

        self.images.put(id, bytes)?;
        pictogram.has_image = true;
        pictogram.last_edit = now_epoch_ms();
        self.resources
            .set_has_image(id, true, pictogram.last_edit)?;
        Ok(pictogram)
    }

    /// Returns stored image bytes; `NotFound` when no image exists.
    pub fn read_image(&self, actor: Option<&User>, id: ResourceId) -> ServiceResult<Vec<u8>> {
        load_gated_frame(
            &self.resources,
            actor,
            id,
            FrameKind::Pictogram,
            can_access,
        )?;
        self.images.get(id)?.ok_or(ServiceError::NotFound)
    }

    /// Returns the placeholder pictogram, creating it once.
    pub fn ensure_default_pictogram(&self, title: &str) -> ServiceResult<Pictogram> {
        let started_at = Instant::now();
        let result = require_title(title)
            .and_then(|()| Ok(self.resources.ensure_default_pictogram(title)?));
        let detail = match &result {
            Ok(pictogram) => format!("resource_id={}", pictogram.key),
            Err(_) => String::new(),
        };
        log_outcome("pictogram_seed", "pictogram", started_at, &detail, &result);
        result
    }
}

fn into_pictogram(frame: Frame) -> ServiceResult<Pictogram> {
    match frame {
        Frame::Pictogram(pictogram) => Ok(pictogram),
        Frame::Choice(_) => Err(ServiceError::NotFound),
    }
}
