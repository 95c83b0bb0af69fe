//! Choice use-case service.
//!
//! Visibility is decided by the choice's own access level; option
//! pictograms are not gated individually.

use crate::auth::{can_access, can_create, can_delete, can_edit};
use crate::model::resource::{
    merge_frame, Choice, ChoiceUpdate, Frame, FrameKind, FrameUpdate, NewChoice, ResourceId,
};
use crate::model::user::User;
use crate::repo::now_epoch_ms;
use crate::repo::resource_repo::ResourceRepository;
use crate::service::response::{ServiceError, ServiceResult};
use crate::service::{load_gated_frame, log_outcome, ownership_for, require_title};
use std::time::Instant;

pub struct ChoiceService<R: ResourceRepository> {
    resources: R,
}

impl<R: ResourceRepository> ChoiceService<R> {
    pub fn new(resources: R) -> Self {
        Self { resources }
    }

    pub fn read_choice(&self, actor: Option<&User>, id: ResourceId) -> ServiceResult<Choice> {
        let (frame, _) =
            load_gated_frame(&self.resources, actor, id, FrameKind::Choice, can_access)?;
        into_choice(frame)
    }

    pub fn create_choice(&self, actor: Option<&User>, choice: &NewChoice) -> ServiceResult<Choice> {
        let started_at = Instant::now();
        let result = self.create_choice_inner(actor, choice);
        let detail = match &result {
            Ok(created) => format!(
                "resource_id={} options={}",
                created.key,
                created.options().len()
            ),
            Err(_) => format!("options={}", choice.options.len()),
        };
        log_outcome("choice_create", "choice", started_at, &detail, &result);
        result
    }

    fn create_choice_inner(
        &self,
        actor: Option<&User>,
        choice: &NewChoice,
    ) -> ServiceResult<Choice> {
        require_title(&choice.title)?;
        if !can_create(choice.access_level, actor) {
            return Err(ServiceError::NotAuthorized);
        }
        self.ensure_options_exist(&choice.options)?;
        let ownership = ownership_for(choice.access_level, actor);
        Ok(self.resources.create_choice(choice, &ownership)?)
    }

    /// Replaces title, access level and the full option set.
    pub fn update_choice(
        &self,
        actor: Option<&User>,
        id: ResourceId,
        update: ChoiceUpdate,
    ) -> ServiceResult<Choice> {
        let started_at = Instant::now();
        let result = self.update_choice_inner(actor, id, update);
        log_outcome(
            "choice_update",
            "choice",
            started_at,
            &format!("resource_id={id}"),
            &result,
        );
        result
    }

    fn update_choice_inner(
        &self,
        actor: Option<&User>,
        id: ResourceId,
        update: ChoiceUpdate,
    ) -> ServiceResult<Choice> {
        let actor = actor.ok_or(ServiceError::NotAuthorized)?;
        require_title(&update.title)?;
        let (mut frame, _) =
            load_gated_frame(&self.resources, Some(actor), id, FrameKind::Choice, can_edit)?;
        let new_level = update.access_level;
        if !can_create(new_level, Some(actor)) {
            return Err(ServiceError::NotAuthorized);
        }
        self.ensure_options_exist(&update.options)?;

        merge_frame(&mut frame, FrameUpdate::Choice(update), now_epoch_ms())?;
        self.resources
            .update_frame(&frame, &ownership_for(new_level, Some(actor)))?;
        into_choice(frame)
    }

    pub fn delete_choice(&self, actor: Option<&User>, id: ResourceId) -> ServiceResult<()> {
        let started_at = Instant::now();
        let result = actor
            .ok_or(ServiceError::NotAuthorized)
            .and_then(|actor| {
                load_gated_frame(&self.resources, Some(actor), id, FrameKind::Choice, can_delete)
            })
            .and_then(|_| Ok(self.resources.delete_resource(id)?));
        log_outcome(
            "choice_delete",
            "choice",
            started_at,
            &format!("resource_id={id}"),
            &result,
        );
        result
    }

    fn ensure_options_exist(&self, options: &[ResourceId]) -> ServiceResult<()> {
        for &option in options {
            if self.resources.get_pictogram(option)?.is_none() {
                return Err(ServiceError::ResourceNotFound(option));
            }
        }
        Ok(())
    }
}

fn into_choice(frame: Frame) -> ServiceResult<Choice> {
    match frame {
        Frame::Choice(choice) => Ok(choice),
        Frame::Pictogram(_) => Err(ServiceError::NotFound),
    }
}
