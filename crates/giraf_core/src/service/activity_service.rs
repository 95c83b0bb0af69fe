//! Activity use-case service.
//!
//! # Responsibility
//! - Append, update and delete single activities inside stored weeks.
//! - Reconcile the optional timer of an updated activity.
//!
//! # Invariants
//! - Activity lookup scans every week of the target user, so cost grows
//!   with the total number of activities in that schedule.
//! - An overwritten timer keeps its storage id.

use crate::model::resource::ResourceId;
use crate::model::schedule::{
    Activity, ActivityId, ActivityState, Day, Timer, TimerDescription, UNSAVED_ID,
};
use crate::model::user::{User, UserId};
use crate::repo::resource_repo::ResourceRepository;
use crate::repo::user_repo::UserRepository;
use crate::repo::week_repo::{NewActivity, WeekRepository};
use crate::service::response::{ServiceError, ServiceResult};
use crate::service::week_service::validate_week_number;
use crate::service::{authorize_user_target, log_outcome};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Submitted fields of a new activity. Order is assigned by storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewActivityDescription {
    pub pictogram_id: ResourceId,
    pub state: ActivityState,
    pub timer: Option<TimerDescription>,
}

/// Submitted state of an existing activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityUpdate {
    pub id: ActivityId,
    pub pictogram_id: ResourceId,
    pub order: i64,
    pub state: ActivityState,
    /// `None` removes a stored timer.
    pub timer: Option<TimerDescription>,
}

/// Applies `update` to the stored activity.
///
/// Timer rules: incoming without stored creates, incoming with stored
/// overwrites in place, absent incoming drops the stored timer.
pub fn apply_activity_update(stored: &mut Activity, update: &ActivityUpdate) {
    stored.pictogram_id = update.pictogram_id;
    stored.order = update.order;
    stored.state = update.state;
    stored.timer = match (stored.timer.take(), &update.timer) {
        (Some(mut timer), Some(incoming)) => {
            timer.overwrite(incoming);
            Some(timer)
        }
        (None, Some(incoming)) => Some(Timer {
            key: UNSAVED_ID,
            start_time: incoming.start_time,
            progress: incoming.progress,
            full_length: incoming.full_length,
            paused: incoming.paused,
        }),
        (_, None) => None,
    };
}

pub struct ActivityService<U: UserRepository, R: ResourceRepository, W: WeekRepository> {
    users: U,
    resources: R,
    weeks: W,
}

impl<U: UserRepository, R: ResourceRepository, W: WeekRepository> ActivityService<U, R, W> {
    pub fn new(users: U, resources: R, weeks: W) -> Self {
        Self {
            users,
            resources,
            weeks,
        }
    }

    /// Appends an activity to `day` of a stored week.
    pub fn create_activity(
        &self,
        actor: Option<&User>,
        user_id: UserId,
        year: i32,
        week_number: u8,
        day: Day,
        description: &NewActivityDescription,
    ) -> ServiceResult<Activity> {
        let started_at = Instant::now();
        let result =
            self.create_activity_inner(actor, user_id, year, week_number, day, description);
        let detail = match &result {
            Ok(activity) => format!(
                "activity_id={} day={} order={}",
                activity.key,
                day.number(),
                activity.order
            ),
            Err(_) => format!("day={}", day.number()),
        };
        log_outcome("activity_create", "activity", started_at, &detail, &result);
        result
    }

    fn create_activity_inner(
        &self,
        actor: Option<&User>,
        user_id: UserId,
        year: i32,
        week_number: u8,
        day: Day,
        description: &NewActivityDescription,
    ) -> ServiceResult<Activity> {
        authorize_user_target(&self.users, actor, user_id)?;
        validate_week_number(week_number)?;

        let week = self
            .weeks
            .get_week(user_id, year, week_number)?
            .ok_or(ServiceError::WeekNotFound)?;
        let weekday = week.day(day).ok_or_else(|| {
            ServiceError::InvalidDay(format!("day {} is not part of the week", day.number()))
        })?;
        if self
            .resources
            .get_pictogram(description.pictogram_id)?
            .is_none()
        {
            return Err(ServiceError::ResourceNotFound(description.pictogram_id));
        }

        Ok(self.weeks.create_activity(
            weekday.key,
            &NewActivity {
                pictogram_id: description.pictogram_id,
                order: weekday.next_order(),
                state: description.state,
                timer: description.timer.clone(),
            },
        )?)
    }

    /// Updates an activity found anywhere in the user's schedule.
    pub fn update_activity(
        &self,
        actor: Option<&User>,
        user_id: UserId,
        update: &ActivityUpdate,
    ) -> ServiceResult<Activity> {
        let started_at = Instant::now();
        let result = self.update_activity_inner(actor, user_id, update);
        let detail = match &result {
            Ok(activity) => format!(
                "activity_id={} has_timer={}",
                activity.key,
                activity.timer.is_some()
            ),
            Err(_) => format!("activity_id={}", update.id),
        };
        log_outcome("activity_update", "activity", started_at, &detail, &result);
        result
    }

    fn update_activity_inner(
        &self,
        actor: Option<&User>,
        user_id: UserId,
        update: &ActivityUpdate,
    ) -> ServiceResult<Activity> {
        authorize_user_target(&self.users, actor, user_id)?;
        let mut stored = self.find_activity(user_id, update.id)?;
        if update.pictogram_id != stored.pictogram_id
            && self.resources.get_pictogram(update.pictogram_id)?.is_none()
        {
            return Err(ServiceError::ResourceNotFound(update.pictogram_id));
        }

        apply_activity_update(&mut stored, update);
        Ok(self.weeks.update_activity(&stored)?)
    }

    /// Deletes an activity found anywhere in the user's schedule.
    pub fn delete_activity(
        &self,
        actor: Option<&User>,
        user_id: UserId,
        activity_id: ActivityId,
    ) -> ServiceResult<()> {
        let started_at = Instant::now();
        let result = authorize_user_target(&self.users, actor, user_id)
            .and_then(|_| self.find_activity(user_id, activity_id))
            .and_then(|_| Ok(self.weeks.delete_activity(activity_id)?));
        log_outcome(
            "activity_delete",
            "activity",
            started_at,
            &format!("activity_id={activity_id}"),
            &result,
        );
        result
    }

    fn find_activity(&self, user_id: UserId, activity_id: ActivityId) -> ServiceResult<Activity> {
        self.weeks
            .list_weeks(user_id)?
            .iter()
            .find_map(|week| week.find_activity(activity_id))
            .map(|(_, activity)| activity.clone())
            .ok_or(ServiceError::ActivityNotFound)
    }
}
