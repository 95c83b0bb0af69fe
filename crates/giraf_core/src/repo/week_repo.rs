//! Week schedule repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist weeks with their weekdays, activities and timers.
//! - Provide activity-level writes used outside full week updates.
//!
//! # Invariants
//! - `save_week` writes the complete week inside one transaction.
//! - One timer row per activity at most (`timers.activity_id` is unique).

use crate::model::resource::ResourceId;
use crate::model::schedule::{
    Activity, ActivityId, ActivityState, Day, Timer, TimerDescription, Week, WeekName, Weekday,
    WeekdayId, WeekId,
};
use crate::model::user::UserId;
use crate::repo::{bool_to_int, ensure_connection_ready, int_to_bool, RepoError, RepoResult};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};

const WEEK_SELECT_SQL: &str = "SELECT
    id,
    year,
    week_number,
    name,
    thumbnail_id
FROM weeks";

const ACTIVITY_SELECT_SQL: &str = "SELECT
    a.id,
    a.pictogram_id,
    a.sort_order,
    a.state,
    t.id AS timer_id,
    t.start_time,
    t.progress,
    t.full_length,
    t.paused
FROM activities a
LEFT JOIN timers t ON t.activity_id = a.id";

/// Input for appending one activity to a stored weekday.
///
/// `order` is chosen by the caller, normally `Weekday::next_order`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewActivity {
    pub pictogram_id: ResourceId,
    pub order: i64,
    pub state: ActivityState,
    pub timer: Option<TimerDescription>,
}

/// Repository interface for week schedules.
pub trait WeekRepository {
    fn get_week(&self, user_id: UserId, year: i32, week_number: u8) -> RepoResult<Option<Week>>;
    /// Every week of `user_id`, ordered by year then week number.
    fn list_weeks(&self, user_id: UserId) -> RepoResult<Vec<Week>>;
    fn list_week_names(&self, user_id: UserId) -> RepoResult<Vec<WeekName>>;
    /// Writes `week` as the complete stored state and returns it reloaded.
    fn save_week(&self, user_id: UserId, week: &Week) -> RepoResult<Week>;
    /// Returns `false` when no such week existed.
    fn delete_week(&self, user_id: UserId, year: i32, week_number: u8) -> RepoResult<bool>;
    fn create_activity(
        &self,
        weekday_id: WeekdayId,
        activity: &NewActivity,
    ) -> RepoResult<Activity>;
    /// Persists pictogram, order, state and timer of an existing activity.
    ///
    /// `timer: None` deletes the stored timer row.
    fn update_activity(&self, activity: &Activity) -> RepoResult<Activity>;
    fn delete_activity(&self, activity_id: ActivityId) -> RepoResult<()>;
}

/// SQLite-backed week repository.
pub struct SqliteWeekRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteWeekRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(
            conn,
            &[
                (
                    "weeks",
                    &["id", "user_id", "year", "week_number", "name", "thumbnail_id"],
                ),
                ("weekdays", &["id", "week_id", "day"]),
                (
                    "activities",
                    &["id", "weekday_id", "pictogram_id", "sort_order", "state"],
                ),
                (
                    "timers",
                    &[
                        "id",
                        "activity_id",
                        "start_time",
                        "progress",
                        "full_length",
                        "paused",
                    ],
                ),
            ],
        )?;
        Ok(Self { conn })
    }
}

impl WeekRepository for SqliteWeekRepository<'_> {
    fn get_week(&self, user_id: UserId, year: i32, week_number: u8) -> RepoResult<Option<Week>> {
        let mut stmt = self.conn.prepare(&format!(
            "{WEEK_SELECT_SQL} WHERE user_id = ?1 AND year = ?2 AND week_number = ?3;"
        ))?;
        let mut rows = stmt.query(params![user_id.to_string(), year, week_number])?;
        match rows.next()? {
            Some(row) => Ok(Some(load_week(self.conn, row)?)),
            None => Ok(None),
        }
    }

    fn list_weeks(&self, user_id: UserId) -> RepoResult<Vec<Week>> {
        let mut stmt = self.conn.prepare(&format!(
            "{WEEK_SELECT_SQL} WHERE user_id = ?1 ORDER BY year ASC, week_number ASC;"
        ))?;
        let mut rows = stmt.query([user_id.to_string()])?;
        let mut weeks = Vec::new();
        while let Some(row) = rows.next()? {
            weeks.push(load_week(self.conn, row)?);
        }
        Ok(weeks)
    }

    fn list_week_names(&self, user_id: UserId) -> RepoResult<Vec<WeekName>> {
        let mut stmt = self.conn.prepare(
            "SELECT year, week_number, name
             FROM weeks
             WHERE user_id = ?1
             ORDER BY year ASC, week_number ASC;",
        )?;
        let mut rows = stmt.query([user_id.to_string()])?;
        let mut names = Vec::new();
        while let Some(row) = rows.next()? {
            names.push(WeekName {
                year: row.get("year")?,
                week_number: parse_week_number(row.get("week_number")?)?,
                name: row.get("name")?,
            });
        }
        Ok(names)
    }

    fn save_week(&self, user_id: UserId, week: &Week) -> RepoResult<Week> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        tx.execute(
            "INSERT INTO weeks (user_id, year, week_number, name, thumbnail_id)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(user_id, year, week_number) DO UPDATE SET
                name = excluded.name,
                thumbnail_id = excluded.thumbnail_id;",
            params![
                user_id.to_string(),
                week.year,
                week.week_number,
                week.name.as_str(),
                week.thumbnail_id,
            ],
        )?;
        let week_id: WeekId = tx.query_row(
            "SELECT id FROM weeks WHERE user_id = ?1 AND year = ?2 AND week_number = ?3;",
            params![user_id.to_string(), week.year, week.week_number],
            |row| row.get(0),
        )?;

        let kept_days: Vec<u8> = week.days().iter().map(|weekday| weekday.day.number()).collect();
        let stored_days = load_day_numbers(&tx, week_id)?;
        for day in stored_days
            .into_iter()
            .filter(|day| !kept_days.contains(day))
        {
            tx.execute(
                "DELETE FROM weekdays WHERE week_id = ?1 AND day = ?2;",
                params![week_id, day],
            )?;
        }

        for weekday in week.days() {
            tx.execute(
                "INSERT INTO weekdays (week_id, day) VALUES (?1, ?2)
                 ON CONFLICT(week_id, day) DO NOTHING;",
                params![week_id, weekday.day.number()],
            )?;
            let weekday_id: WeekdayId = tx.query_row(
                "SELECT id FROM weekdays WHERE week_id = ?1 AND day = ?2;",
                params![week_id, weekday.day.number()],
                |row| row.get(0),
            )?;

            tx.execute("DELETE FROM activities WHERE weekday_id = ?1;", [weekday_id])?;
            for activity in &weekday.activities {
                let activity_id = insert_activity(
                    &tx,
                    weekday_id,
                    activity.pictogram_id,
                    activity.order,
                    activity.state,
                )?;
                if let Some(timer) = &activity.timer {
                    upsert_timer(&tx, activity_id, &describe(timer))?;
                }
            }
        }

        tx.commit()?;

        self.get_week(user_id, week.year, week.week_number)?
            .ok_or_else(|| RepoError::InvalidData(format!("week {week_id} vanished after save")))
    }

    fn delete_week(&self, user_id: UserId, year: i32, week_number: u8) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "DELETE FROM weeks WHERE user_id = ?1 AND year = ?2 AND week_number = ?3;",
            params![user_id.to_string(), year, week_number],
        )?;
        Ok(changed > 0)
    }

    fn create_activity(
        &self,
        weekday_id: WeekdayId,
        activity: &NewActivity,
    ) -> RepoResult<Activity> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let activity_id = insert_activity(
            &tx,
            weekday_id,
            activity.pictogram_id,
            activity.order,
            activity.state,
        )?;
        if let Some(timer) = &activity.timer {
            upsert_timer(&tx, activity_id, timer)?;
        }
        tx.commit()?;

        load_activity(self.conn, activity_id)?.ok_or(RepoError::ActivityNotFound(activity_id))
    }

    fn update_activity(&self, activity: &Activity) -> RepoResult<Activity> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "UPDATE activities
             SET pictogram_id = ?2, sort_order = ?3, state = ?4
             WHERE id = ?1;",
            params![
                activity.key,
                activity.pictogram_id,
                activity.order,
                activity.state.as_str(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::ActivityNotFound(activity.key));
        }

        match &activity.timer {
            Some(timer) => upsert_timer(&tx, activity.key, &describe(timer))?,
            None => {
                tx.execute("DELETE FROM timers WHERE activity_id = ?1;", [activity.key])?;
            }
        }
        tx.commit()?;

        load_activity(self.conn, activity.key)?.ok_or(RepoError::ActivityNotFound(activity.key))
    }

    fn delete_activity(&self, activity_id: ActivityId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM activities WHERE id = ?1;", [activity_id])?;
        if changed == 0 {
            return Err(RepoError::ActivityNotFound(activity_id));
        }
        Ok(())
    }
}

fn insert_activity(
    conn: &Connection,
    weekday_id: WeekdayId,
    pictogram_id: ResourceId,
    order: i64,
    state: ActivityState,
) -> RepoResult<ActivityId> {
    conn.execute(
        "INSERT INTO activities (weekday_id, pictogram_id, sort_order, state)
         VALUES (?1, ?2, ?3, ?4);",
        params![weekday_id, pictogram_id, order, state.as_str()],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Inserts the timer or overwrites the existing row in place, keeping its id.
fn upsert_timer(
    conn: &Connection,
    activity_id: ActivityId,
    timer: &TimerDescription,
) -> RepoResult<()> {
    conn.execute(
        "INSERT INTO timers (activity_id, start_time, progress, full_length, paused)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(activity_id) DO UPDATE SET
            start_time = excluded.start_time,
            progress = excluded.progress,
            full_length = excluded.full_length,
            paused = excluded.paused;",
        params![
            activity_id,
            timer.start_time,
            timer.progress,
            timer.full_length,
            bool_to_int(timer.paused),
        ],
    )?;
    Ok(())
}

fn describe(timer: &Timer) -> TimerDescription {
    TimerDescription {
        start_time: timer.start_time,
        progress: timer.progress,
        full_length: timer.full_length,
        paused: timer.paused,
    }
}

fn load_day_numbers(conn: &Connection, week_id: WeekId) -> RepoResult<Vec<u8>> {
    let mut stmt = conn.prepare("SELECT day FROM weekdays WHERE week_id = ?1;")?;
    let mut rows = stmt.query([week_id])?;
    let mut days = Vec::new();
    while let Some(row) = rows.next()? {
        days.push(row.get(0)?);
    }
    Ok(days)
}

fn load_week(conn: &Connection, row: &Row<'_>) -> RepoResult<Week> {
    let key: WeekId = row.get("id")?;
    let year: i32 = row.get("year")?;
    let week_number = parse_week_number(row.get("week_number")?)?;
    let mut week = Week::shell(year, week_number, row.get::<_, String>("name")?);
    week.key = key;
    week.thumbnail_id = row.get("thumbnail_id")?;

    let mut stmt =
        conn.prepare("SELECT id, day FROM weekdays WHERE week_id = ?1 ORDER BY day ASC;")?;
    let mut rows = stmt.query([key])?;
    while let Some(day_row) = rows.next()? {
        let weekday_id: WeekdayId = day_row.get("id")?;
        let day_number: i64 = day_row.get("day")?;
        let day = Day::from_number(day_number).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid day `{day_number}` in weekdays.day"))
        })?;
        week.update_day(Weekday {
            key: weekday_id,
            day,
            activities: load_activities(conn, weekday_id)?,
        });
    }

    Ok(week)
}

fn load_activities(conn: &Connection, weekday_id: WeekdayId) -> RepoResult<Vec<Activity>> {
    let mut stmt = conn.prepare(&format!(
        "{ACTIVITY_SELECT_SQL}
         WHERE a.weekday_id = ?1
         ORDER BY a.sort_order ASC, a.id ASC;"
    ))?;
    let mut rows = stmt.query([weekday_id])?;
    let mut activities = Vec::new();
    while let Some(row) = rows.next()? {
        activities.push(parse_activity_row(row)?);
    }
    Ok(activities)
}

fn load_activity(conn: &Connection, activity_id: ActivityId) -> RepoResult<Option<Activity>> {
    let mut stmt = conn.prepare(&format!("{ACTIVITY_SELECT_SQL} WHERE a.id = ?1;"))?;
    let mut rows = stmt.query([activity_id])?;
    match rows.next()? {
        Some(row) => Ok(Some(parse_activity_row(row)?)),
        None => Ok(None),
    }
}

fn parse_activity_row(row: &Row<'_>) -> RepoResult<Activity> {
    let state_text: String = row.get("state")?;
    let state = ActivityState::parse(&state_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid activity state `{state_text}` in activities.state"))
    })?;

    let timer_id: Option<i64> = row.get("timer_id")?;
    let timer = match timer_id {
        Some(key) => Some(Timer {
            key,
            start_time: row.get("start_time")?,
            progress: row.get("progress")?,
            full_length: row.get("full_length")?,
            paused: int_to_bool(row.get("paused")?, "timers.paused")?,
        }),
        None => None,
    };

    Ok(Activity {
        key: row.get("id")?,
        pictogram_id: row.get("pictogram_id")?,
        order: row.get("sort_order")?,
        state,
        timer,
    })
}

fn parse_week_number(value: i64) -> RepoResult<u8> {
    u8::try_from(value)
        .ok()
        .filter(|number| (1..=53).contains(number))
        .ok_or_else(|| {
            RepoError::InvalidData(format!("invalid week number `{value}` in weeks.week_number"))
        })
}
