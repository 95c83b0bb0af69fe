//! User/department repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist accounts, departments, guardian links and launcher settings.
//! - Load users with their guardian/citizen id lists resolved.
//!
//! # Invariants
//! - Guardian links are rows in `guardian_relations`; both id lists on
//!   `User` are derived from that single table.
//! - Users without a settings row read back `Settings::default()`.

use crate::model::user::{
    CompleteMark, DefaultTimer, Department, DepartmentId, NewUser, Orientation, Role, Settings,
    User, UserId,
};
use crate::repo::{
    bool_to_int, ensure_connection_ready, int_to_bool, map_constraint, parse_user_id, RepoError,
    RepoResult,
};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

const USER_SELECT_SQL: &str = "SELECT id, username, role, department_id FROM users";

/// Repository interface for users and departments.
pub trait UserRepository {
    fn create_department(&self, name: &str) -> RepoResult<Department>;
    fn get_department(&self, id: DepartmentId) -> RepoResult<Option<Department>>;
    fn create_user(&self, user: &NewUser) -> RepoResult<User>;
    fn get_user(&self, id: UserId) -> RepoResult<Option<User>>;
    fn find_user_by_username(&self, username: &str) -> RepoResult<Option<User>>;
    /// Deletes the account; its weeks, settings, guardian links and
    /// ownership rows cascade.
    fn delete_user(&self, id: UserId) -> RepoResult<()>;
    /// Inserts one guardian link; linking twice is a no-op.
    fn add_guardian_relation(&self, guardian_id: UserId, citizen_id: UserId) -> RepoResult<()>;
    fn get_settings(&self, user_id: UserId) -> RepoResult<Settings>;
    fn save_settings(&self, user_id: UserId, settings: &Settings) -> RepoResult<()>;
}

/// SQLite-backed user repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(
            conn,
            &[
                ("departments", &["id", "name"]),
                ("users", &["id", "username", "role", "department_id"]),
                ("guardian_relations", &["guardian_id", "citizen_id"]),
                ("user_settings", &["user_id", "nr_of_days_to_display"]),
            ],
        )?;
        Ok(Self { conn })
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create_department(&self, name: &str) -> RepoResult<Department> {
        self.conn
            .execute("INSERT INTO departments (name) VALUES (?1);", [name])
            .map_err(|err| map_constraint(err, || format!("department `{name}` exists")))?;
        let id = self.conn.last_insert_rowid();
        Ok(Department {
            id,
            name: name.to_string(),
            member_ids: Vec::new(),
            resource_ids: Vec::new(),
        })
    }

    fn get_department(&self, id: DepartmentId) -> RepoResult<Option<Department>> {
        let name: Option<String> = self
            .conn
            .query_row("SELECT name FROM departments WHERE id = ?1;", [id], |row| {
                row.get(0)
            })
            .optional()?;
        let Some(name) = name else {
            return Ok(None);
        };

        let mut member_ids = Vec::new();
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM users WHERE department_id = ?1 ORDER BY username ASC;")?;
        let mut rows = stmt.query([id])?;
        while let Some(row) = rows.next()? {
            let value: String = row.get(0)?;
            member_ids.push(parse_user_id(&value, "users.id")?);
        }

        let mut resource_ids = Vec::new();
        let mut stmt = self.conn.prepare(
            "SELECT resource_id
             FROM department_resources
             WHERE department_id = ?1
             ORDER BY resource_id ASC;",
        )?;
        let mut rows = stmt.query([id])?;
        while let Some(row) = rows.next()? {
            resource_ids.push(row.get(0)?);
        }

        Ok(Some(Department {
            id,
            name,
            member_ids,
            resource_ids,
        }))
    }

    fn create_user(&self, user: &NewUser) -> RepoResult<User> {
        let id = Uuid::new_v4();
        let username = user.username.trim();
        self.conn
            .execute(
                "INSERT INTO users (id, username, role, department_id)
                 VALUES (?1, ?2, ?3, ?4);",
                params![
                    id.to_string(),
                    username,
                    user.role.as_str(),
                    user.department_id,
                ],
            )
            .map_err(|err| map_constraint(err, || format!("username `{username}` is taken")))?;

        Ok(User {
            id,
            username: username.to_string(),
            role: user.role,
            department_id: user.department_id,
            guardian_ids: Vec::new(),
            citizen_ids: Vec::new(),
        })
    }

    fn get_user(&self, id: UserId) -> RepoResult<Option<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(load_user(self.conn, row)?)),
            None => Ok(None),
        }
    }

    fn find_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} WHERE username = ?1 COLLATE NOCASE;"))?;
        let mut rows = stmt.query([username.trim()])?;
        match rows.next()? {
            Some(row) => Ok(Some(load_user(self.conn, row)?)),
            None => Ok(None),
        }
    }

    fn delete_user(&self, id: UserId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM users WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::UserNotFound(id));
        }
        Ok(())
    }

    fn add_guardian_relation(&self, guardian_id: UserId, citizen_id: UserId) -> RepoResult<()> {
        for id in [guardian_id, citizen_id] {
            if !user_exists(self.conn, id)? {
                return Err(RepoError::UserNotFound(id));
            }
        }
        self.conn.execute(
            "INSERT OR IGNORE INTO guardian_relations (guardian_id, citizen_id)
             VALUES (?1, ?2);",
            params![guardian_id.to_string(), citizen_id.to_string()],
        )?;
        Ok(())
    }

    fn get_settings(&self, user_id: UserId) -> RepoResult<Settings> {
        if !user_exists(self.conn, user_id)? {
            return Err(RepoError::UserNotFound(user_id));
        }

        let mut stmt = self.conn.prepare(
            "SELECT
                orientation,
                complete_mark,
                cancel_mark,
                default_timer,
                timer_seconds,
                activities_count,
                theme,
                nr_of_days_to_display,
                greyscale
             FROM user_settings
             WHERE user_id = ?1;",
        )?;
        let mut rows = stmt.query([user_id.to_string()])?;
        match rows.next()? {
            Some(row) => parse_settings_row(row),
            None => Ok(Settings::default()),
        }
    }

    fn save_settings(&self, user_id: UserId, settings: &Settings) -> RepoResult<()> {
        if !user_exists(self.conn, user_id)? {
            return Err(RepoError::UserNotFound(user_id));
        }

        self.conn.execute(
            "INSERT INTO user_settings (
                user_id,
                orientation,
                complete_mark,
                cancel_mark,
                default_timer,
                timer_seconds,
                activities_count,
                theme,
                nr_of_days_to_display,
                greyscale
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(user_id) DO UPDATE SET
                orientation = excluded.orientation,
                complete_mark = excluded.complete_mark,
                cancel_mark = excluded.cancel_mark,
                default_timer = excluded.default_timer,
                timer_seconds = excluded.timer_seconds,
                activities_count = excluded.activities_count,
                theme = excluded.theme,
                nr_of_days_to_display = excluded.nr_of_days_to_display,
                greyscale = excluded.greyscale;",
            params![
                user_id.to_string(),
                orientation_to_db(settings.orientation),
                complete_mark_to_db(settings.complete_mark),
                complete_mark_to_db(settings.cancel_mark),
                default_timer_to_db(settings.default_timer),
                settings.timer_seconds,
                settings.activities_count,
                settings.theme.as_str(),
                i64::from(settings.nr_of_days_to_display),
                bool_to_int(settings.greyscale),
            ],
        )?;
        Ok(())
    }
}

fn load_user(conn: &Connection, row: &Row<'_>) -> RepoResult<User> {
    let id_text: String = row.get("id")?;
    let id = parse_user_id(&id_text, "users.id")?;

    let role_text: String = row.get("role")?;
    let role = Role::parse(&role_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid role `{role_text}` in users.role"))
    })?;

    let guardian_ids = load_linked_users(
        conn,
        "SELECT guardian_id FROM guardian_relations WHERE citizen_id = ?1 ORDER BY guardian_id;",
        &id_text,
        "guardian_relations.guardian_id",
    )?;
    let citizen_ids = load_linked_users(
        conn,
        "SELECT citizen_id FROM guardian_relations WHERE guardian_id = ?1 ORDER BY citizen_id;",
        &id_text,
        "guardian_relations.citizen_id",
    )?;

    Ok(User {
        id,
        username: row.get("username")?,
        role,
        department_id: row.get("department_id")?,
        guardian_ids,
        citizen_ids,
    })
}

fn load_linked_users(
    conn: &Connection,
    sql: &str,
    user_id: &str,
    column: &'static str,
) -> RepoResult<Vec<UserId>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([user_id])?;
    let mut ids = Vec::new();
    while let Some(row) = rows.next()? {
        let value: String = row.get(0)?;
        ids.push(parse_user_id(&value, column)?);
    }
    Ok(ids)
}

fn user_exists(conn: &Connection, id: UserId) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1);",
        [id.to_string()],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn parse_settings_row(row: &Row<'_>) -> RepoResult<Settings> {
    let orientation_text: String = row.get("orientation")?;
    let complete_text: String = row.get("complete_mark")?;
    let cancel_text: String = row.get("cancel_mark")?;
    let timer_text: String = row.get("default_timer")?;
    let days: i64 = row.get("nr_of_days_to_display")?;

    let invalid = |column: &str, value: &str| {
        RepoError::InvalidData(format!("invalid value `{value}` in user_settings.{column}"))
    };

    Ok(Settings {
        orientation: parse_orientation(&orientation_text)
            .ok_or_else(|| invalid("orientation", &orientation_text))?,
        complete_mark: parse_complete_mark(&complete_text)
            .ok_or_else(|| invalid("complete_mark", &complete_text))?,
        cancel_mark: parse_complete_mark(&cancel_text)
            .ok_or_else(|| invalid("cancel_mark", &cancel_text))?,
        default_timer: parse_default_timer(&timer_text)
            .ok_or_else(|| invalid("default_timer", &timer_text))?,
        timer_seconds: row.get("timer_seconds")?,
        activities_count: row.get("activities_count")?,
        theme: row.get("theme")?,
        nr_of_days_to_display: u8::try_from(days)
            .map_err(|_| invalid("nr_of_days_to_display", &days.to_string()))?,
        greyscale: int_to_bool(row.get("greyscale")?, "user_settings.greyscale")?,
    })
}

fn orientation_to_db(value: Orientation) -> &'static str {
    match value {
        Orientation::Portrait => "portrait",
        Orientation::Landscape => "landscape",
    }
}

fn parse_orientation(value: &str) -> Option<Orientation> {
    match value {
        "portrait" => Some(Orientation::Portrait),
        "landscape" => Some(Orientation::Landscape),
        _ => None,
    }
}

fn complete_mark_to_db(value: CompleteMark) -> &'static str {
    match value {
        CompleteMark::Removed => "removed",
        CompleteMark::Checkmark => "checkmark",
        CompleteMark::MovedRight => "moved_right",
    }
}

fn parse_complete_mark(value: &str) -> Option<CompleteMark> {
    match value {
        "removed" => Some(CompleteMark::Removed),
        "checkmark" => Some(CompleteMark::Checkmark),
        "moved_right" => Some(CompleteMark::MovedRight),
        _ => None,
    }
}

fn default_timer_to_db(value: DefaultTimer) -> &'static str {
    match value {
        DefaultTimer::Hourglass => "hourglass",
        DefaultTimer::AnalogClock => "analog_clock",
    }
}

fn parse_default_timer(value: &str) -> Option<DefaultTimer> {
    match value {
        "hourglass" => Some(DefaultTimer::Hourglass),
        "analog_clock" => Some(DefaultTimer::AnalogClock),
        _ => None,
    }
}
