//! Week schedule reconciliation.
//!
//! # Responsibility
//! - Validate a submitted week description before any write.
//! - Merge it into the stored week at day granularity and persist atomically.
//!
//! # Invariants
//! - Validation and pictogram resolution complete before `save_week` runs;
//!   any failure leaves storage untouched.
//! - Days present in the description replace stored days wholesale.
//! - Stored days absent from the description are removed.

use crate::model::resource::ResourceId;
use crate::model::schedule::{
    Activity, ActivityState, Day, Timer, TimerDescription, Week, WeekName, Weekday, UNSAVED_ID,
};
use crate::model::user::{User, UserId};
use crate::repo::resource_repo::ResourceRepository;
use crate::repo::user_repo::UserRepository;
use crate::repo::week_repo::WeekRepository;
use crate::service::response::{ServiceError, ServiceResult};
use crate::service::{authorize_user_target, log_outcome};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Submitted state of one week. Absent fields are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekDescription {
    pub name: Option<String>,
    pub thumbnail_id: Option<ResourceId>,
    pub days: Option<Vec<WeekdayDescription>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekdayDescription {
    pub day: Day,
    pub activities: Vec<ActivityDescription>,
}

/// Submitted activity. `order` ties keep list position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityDescription {
    pub pictogram_id: ResourceId,
    pub order: i64,
    pub state: ActivityState,
    pub timer: Option<TimerDescription>,
}

/// Checks day count and uniqueness. Returns the validated day list.
pub fn validate_days(days: Option<&[WeekdayDescription]>) -> ServiceResult<&[WeekdayDescription]> {
    let days = days.ok_or(ServiceError::MissingProperties("days"))?;
    if days.is_empty() || days.len() > Day::ALL.len() {
        return Err(ServiceError::InvalidDay(format!(
            "expected 1..=7 days, got {}",
            days.len()
        )));
    }
    let mut seen = Vec::with_capacity(days.len());
    for weekday in days {
        if seen.contains(&weekday.day) {
            return Err(ServiceError::InvalidDay(format!(
                "day {} submitted twice",
                weekday.day.number()
            )));
        }
        seen.push(weekday.day);
    }
    Ok(days)
}

pub fn validate_week_number(week_number: u8) -> ServiceResult<()> {
    if !(1..=53).contains(&week_number) {
        return Err(ServiceError::InvalidProperties(format!(
            "week number {week_number} outside 1..=53"
        )));
    }
    Ok(())
}

/// Installs every described day into `week` and drops the days not described.
///
/// Pure: pictogram references must already be resolved.
pub fn reconcile_week(week: &mut Week, days: &[WeekdayDescription]) {
    for description in days {
        week.update_day(build_weekday(description));
    }
    week.retain_days(|day| days.iter().any(|description| description.day == day));
}

fn build_weekday(description: &WeekdayDescription) -> Weekday {
    let mut activities: Vec<Activity> = description
        .activities
        .iter()
        .map(|activity| Activity {
            key: UNSAVED_ID,
            pictogram_id: activity.pictogram_id,
            order: activity.order,
            state: activity.state,
            timer: activity.timer.as_ref().map(|timer| Timer {
                key: UNSAVED_ID,
                start_time: timer.start_time,
                progress: timer.progress,
                full_length: timer.full_length,
                paused: timer.paused,
            }),
        })
        .collect();
    activities.sort_by_key(|activity| activity.order);

    Weekday {
        key: UNSAVED_ID,
        day: description.day,
        activities,
    }
}

/// Use-case service for week schedules.
pub struct WeekService<U: UserRepository, R: ResourceRepository, W: WeekRepository> {
    users: U,
    resources: R,
    weeks: W,
    default_thumbnail: Option<ResourceId>,
}

impl<U: UserRepository, R: ResourceRepository, W: WeekRepository> WeekService<U, R, W> {
    pub fn new(users: U, resources: R, weeks: W) -> Self {
        Self {
            users,
            resources,
            weeks,
            default_thumbnail: None,
        }
    }

    /// Thumbnail used for weeks that are not stored yet.
    pub fn with_default_thumbnail(mut self, thumbnail_id: ResourceId) -> Self {
        self.default_thumbnail = Some(thumbnail_id);
        self
    }

    pub fn list_week_names(
        &self,
        actor: Option<&User>,
        user_id: UserId,
    ) -> ServiceResult<Vec<WeekName>> {
        authorize_user_target(&self.users, actor, user_id)?;
        let names = self.weeks.list_week_names(user_id)?;
        if names.is_empty() {
            return Err(ServiceError::NoWeekScheduleFound);
        }
        Ok(names)
    }

    /// Returns the stored week or an unsaved template with seven empty days.
    pub fn get_week(
        &self,
        actor: Option<&User>,
        user_id: UserId,
        year: i32,
        week_number: u8,
    ) -> ServiceResult<Week> {
        authorize_user_target(&self.users, actor, user_id)?;
        validate_week_number(week_number)?;
        if let Some(week) = self.weeks.get_week(user_id, year, week_number)? {
            return Ok(week);
        }

        let mut week = Week::shell(year, week_number, Week::default_name(year, week_number));
        week.thumbnail_id = self.default_thumbnail;
        for day in Day::ALL {
            week.update_day(Weekday::empty(day));
        }
        Ok(week)
    }

    /// Creates or reconciles the week for (`user_id`, `year`, `week_number`).
    pub fn update_week(
        &self,
        actor: Option<&User>,
        user_id: UserId,
        year: i32,
        week_number: u8,
        description: &WeekDescription,
    ) -> ServiceResult<Week> {
        let started_at = Instant::now();
        let result = self.update_week_inner(actor, user_id, year, week_number, description);
        let detail = match &result {
            Ok(week) => format!(
                "week_id={} year={year} week_number={week_number} days={}",
                week.key,
                week.days().len()
            ),
            Err(_) => format!("year={year} week_number={week_number}"),
        };
        log_outcome("week_update", "week", started_at, &detail, &result);
        result
    }

    fn update_week_inner(
        &self,
        actor: Option<&User>,
        user_id: UserId,
        year: i32,
        week_number: u8,
        description: &WeekDescription,
    ) -> ServiceResult<Week> {
        authorize_user_target(&self.users, actor, user_id)?;

        validate_week_number(week_number)?;
        let days = validate_days(description.days.as_deref())?;
        let thumbnail_id = description
            .thumbnail_id
            .ok_or(ServiceError::MissingProperties("thumbnail"))?;
        if self.resources.get_pictogram(thumbnail_id)?.is_none() {
            return Err(ServiceError::ThumbnailDoesNotExist);
        }
        for activity in days.iter().flat_map(|weekday| weekday.activities.iter()) {
            if self.resources.get_pictogram(activity.pictogram_id)?.is_none() {
                return Err(ServiceError::ResourceNotFound(activity.pictogram_id));
            }
        }

        let mut week = match self.weeks.get_week(user_id, year, week_number)? {
            Some(week) => week,
            None => Week::shell(year, week_number, Week::default_name(year, week_number)),
        };
        if let Some(name) = description
            .name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
        {
            week.name = name.to_string();
        }
        week.thumbnail_id = Some(thumbnail_id);
        reconcile_week(&mut week, days);

        Ok(self.weeks.save_week(user_id, &week)?)
    }

    pub fn delete_week(
        &self,
        actor: Option<&User>,
        user_id: UserId,
        year: i32,
        week_number: u8,
    ) -> ServiceResult<()> {
        let started_at = Instant::now();
        let result = authorize_user_target(&self.users, actor, user_id).and_then(|_| {
            if self.weeks.delete_week(user_id, year, week_number)? {
                Ok(())
            } else {
                Err(ServiceError::WeekNotFound)
            }
        });
        log_outcome(
            "week_delete",
            "week",
            started_at,
            &format!("year={year} week_number={week_number}"),
            &result,
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn activity(pictogram_id: ResourceId, order: i64) -> ActivityDescription {
        ActivityDescription {
            pictogram_id,
            order,
            state: ActivityState::Normal,
            timer: None,
        }
    }

    fn weekday(day: Day, activities: Vec<ActivityDescription>) -> WeekdayDescription {
        WeekdayDescription { day, activities }
    }

    #[test]
    fn validate_days_rejects_bad_counts_and_duplicates() {
        assert!(matches!(
            validate_days(None),
            Err(ServiceError::MissingProperties("days"))
        ));
        assert!(matches!(
            validate_days(Some(&[][..])),
            Err(ServiceError::InvalidDay(_))
        ));

        let eight: Vec<WeekdayDescription> = Day::ALL
            .iter()
            .chain([Day::Monday].iter())
            .map(|day| weekday(*day, Vec::new()))
            .collect();
        assert!(matches!(
            validate_days(Some(eight.as_slice())),
            Err(ServiceError::InvalidDay(_))
        ));

        let duplicate = vec![weekday(Day::Monday, Vec::new()), weekday(Day::Monday, Vec::new())];
        assert!(matches!(
            validate_days(Some(duplicate.as_slice())),
            Err(ServiceError::InvalidDay(_))
        ));

        let seven: Vec<WeekdayDescription> =
            Day::ALL.iter().map(|day| weekday(*day, Vec::new())).collect();
        assert_eq!(validate_days(Some(seven.as_slice())).expect("seven days").len(), 7);
    }

    #[test]
    fn reconcile_replaces_inserts_and_removes_days() {
        let mut week = Week::shell(2024, 5, "w");
        let mut monday = Weekday::empty(Day::Monday);
        monday.key = 11;
        week.update_day(monday);
        let mut tuesday = Weekday::empty(Day::Tuesday);
        tuesday.key = 12;
        week.update_day(tuesday);

        reconcile_week(
            &mut week,
            &[
                weekday(Day::Friday, vec![activity(3, 0)]),
                weekday(Day::Monday, vec![activity(4, 0)]),
            ],
        );

        let days: Vec<Day> = week.days().iter().map(|weekday| weekday.day).collect();
        assert_eq!(days, vec![Day::Monday, Day::Friday]);
        let monday = week.day(Day::Monday).expect("monday kept");
        assert_eq!(monday.key, 11);
        assert_eq!(monday.activities[0].pictogram_id, 4);
    }

    #[test]
    fn activities_follow_order_then_list_position() {
        let mut week = Week::shell(2024, 5, "w");
        reconcile_week(
            &mut week,
            &[weekday(
                Day::Sunday,
                vec![activity(1, 2), activity(2, 0), activity(3, 2), activity(4, 1)],
            )],
        );

        let pictograms: Vec<ResourceId> = week
            .day(Day::Sunday)
            .expect("sunday")
            .activities
            .iter()
            .map(|activity| activity.pictogram_id)
            .collect();
        assert_eq!(pictograms, vec![2, 4, 1, 3]);
    }

    #[test]
    fn week_number_bounds() {
        assert!(validate_week_number(1).is_ok());
        assert!(validate_week_number(53).is_ok());
        assert!(matches!(
            validate_week_number(0),
            Err(ServiceError::InvalidProperties(_))
        ));
        assert!(matches!(
            validate_week_number(54),
            Err(ServiceError::InvalidProperties(_))
        ));
    }
}
