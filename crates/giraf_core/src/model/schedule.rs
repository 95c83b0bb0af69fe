//! Week schedule model.
//!
//! # Responsibility
//! - Define weeks, weekdays, activities and timers.
//! - Keep day-level install/remove semantics next to the data they guard.
//!
//! # Invariants
//! - A week holds at most one `Weekday` per `Day`.
//! - `Week::days` is always sorted by `Day`, independent of insert order.
//! - A `Timer` belongs to exactly one activity.

use crate::model::resource::ResourceId;
use serde::{Deserialize, Serialize};

pub type WeekId = i64;
pub type WeekdayId = i64;
pub type ActivityId = i64;
pub type TimerId = i64;

/// Storage id placeholder for rows that were not persisted yet.
pub const UNSAVED_ID: i64 = 0;

/// Day of week, Monday first, 1-indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Day {
    Monday = 1,
    Tuesday = 2,
    Wednesday = 3,
    Thursday = 4,
    Friday = 5,
    Saturday = 6,
    Sunday = 7,
}

impl Day {
    pub const ALL: [Day; 7] = [
        Day::Monday,
        Day::Tuesday,
        Day::Wednesday,
        Day::Thursday,
        Day::Friday,
        Day::Saturday,
        Day::Sunday,
    ];

    /// 1-based day number.
    pub fn number(self) -> u8 {
        self as u8
    }

    /// Parses a 1-based day number.
    pub fn from_number(value: i64) -> Option<Self> {
        match value {
            1 => Some(Day::Monday),
            2 => Some(Day::Tuesday),
            3 => Some(Day::Wednesday),
            4 => Some(Day::Thursday),
            5 => Some(Day::Friday),
            6 => Some(Day::Saturday),
            7 => Some(Day::Sunday),
            _ => None,
        }
    }
}

/// Progress state of one activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityState {
    Normal,
    Active,
    Canceled,
    Completed,
}

impl ActivityState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Active => "active",
            Self::Canceled => "canceled",
            Self::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "normal" => Some(Self::Normal),
            "active" => Some(Self::Active),
            "canceled" => Some(Self::Canceled),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

/// Countdown attached to an activity. Times are milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timer {
    pub key: TimerId,
    pub start_time: i64,
    pub progress: i64,
    pub full_length: i64,
    pub paused: bool,
}

/// Timer fields supplied by a client, without identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerDescription {
    pub start_time: i64,
    pub progress: i64,
    pub full_length: i64,
    pub paused: bool,
}

impl Timer {
    /// Overwrites every field except identity.
    pub fn overwrite(&mut self, description: &TimerDescription) {
        self.start_time = description.start_time;
        self.progress = description.progress;
        self.full_length = description.full_length;
        self.paused = description.paused;
    }
}

/// Scheduled pictogram inside one weekday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub key: ActivityId,
    pub pictogram_id: ResourceId,
    pub order: i64,
    pub state: ActivityState,
    pub timer: Option<Timer>,
}

/// One day's activity list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Weekday {
    pub key: WeekdayId,
    pub day: Day,
    /// Sorted by `order`.
    pub activities: Vec<Activity>,
}

impl Weekday {
    pub fn empty(day: Day) -> Self {
        Self {
            key: UNSAVED_ID,
            day,
            activities: Vec::new(),
        }
    }

    /// Order for the next appended activity: max + 1, or 0 when empty.
    pub fn next_order(&self) -> i64 {
        self.activities
            .iter()
            .map(|activity| activity.order)
            .max()
            .map_or(0, |max| max + 1)
    }
}

/// Week schedule owned by one user, keyed by (year, week number).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Week {
    pub key: WeekId,
    pub year: i32,
    pub week_number: u8,
    pub name: String,
    pub thumbnail_id: Option<ResourceId>,
    days: Vec<Weekday>,
}

impl Week {
    /// Creates an unsaved week without days.
    pub fn shell(year: i32, week_number: u8, name: impl Into<String>) -> Self {
        Self {
            key: UNSAVED_ID,
            year,
            week_number,
            name: name.into(),
            thumbnail_id: None,
            days: Vec::new(),
        }
    }

    /// Default display name for weeks created without one.
    pub fn default_name(year: i32, week_number: u8) -> String {
        format!("{year} - {week_number}")
    }

    /// Days sorted by `Day`.
    pub fn days(&self) -> &[Weekday] {
        &self.days
    }

    pub fn day(&self, day: Day) -> Option<&Weekday> {
        self.days.iter().find(|weekday| weekday.day == day)
    }

    /// Installs `weekday`, replacing an existing entry with the same day.
    ///
    /// A replaced entry keeps its storage key.
    pub fn update_day(&mut self, mut weekday: Weekday) {
        match self.days.binary_search_by_key(&weekday.day, |current| current.day) {
            Ok(index) => {
                if weekday.key == UNSAVED_ID {
                    weekday.key = self.days[index].key;
                }
                self.days[index] = weekday;
            }
            Err(index) => self.days.insert(index, weekday),
        }
    }

    /// Removes every day for which `keep` returns false.
    pub fn retain_days(&mut self, mut keep: impl FnMut(Day) -> bool) {
        self.days.retain(|weekday| keep(weekday.day));
    }

    /// Finds an activity anywhere in this week.
    pub fn find_activity(&self, activity_id: ActivityId) -> Option<(Day, &Activity)> {
        self.days.iter().find_map(|weekday| {
            weekday
                .activities
                .iter()
                .find(|activity| activity.key == activity_id)
                .map(|activity| (weekday.day, activity))
        })
    }
}

/// Lightweight week listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekName {
    pub year: i32,
    pub week_number: u8,
    pub name: String,
}
