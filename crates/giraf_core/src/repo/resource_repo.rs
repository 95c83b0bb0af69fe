//! Pictogram/choice repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist frames (pictograms and choices) in the `resources` table.
//! - Own ownership join rows (`user_resources`, `department_resources`).
//!
//! # Invariants
//! - A frame and its ownership rows are written in one transaction, on
//!   create and on update.
//! - Choice options must reference existing pictograms, never choices.
//! - `ensure_default_pictogram` inserts at most one placeholder row.

use crate::model::access::AccessLevel;
use crate::model::resource::{
    Choice, Frame, FrameKind, NewChoice, NewPictogram, Pictogram, ResourceId, ResourceOwnership,
};
use crate::repo::{
    bool_to_int, ensure_connection_ready, int_to_bool, now_epoch_ms, parse_user_id, RepoError,
    RepoResult,
};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};

const RESOURCE_SELECT_SQL: &str = "SELECT
    id,
    kind,
    title,
    access_level,
    has_image,
    last_edit
FROM resources";

/// Repository interface for ownable frames.
pub trait ResourceRepository {
    fn create_pictogram(
        &self,
        pictogram: &NewPictogram,
        ownership: &ResourceOwnership,
    ) -> RepoResult<Pictogram>;
    fn create_choice(&self, choice: &NewChoice, ownership: &ResourceOwnership)
        -> RepoResult<Choice>;
    fn get_frame(&self, id: ResourceId) -> RepoResult<Option<Frame>>;
    /// Returns `None` for missing ids and for ids that belong to a choice.
    fn get_pictogram(&self, id: ResourceId) -> RepoResult<Option<Pictogram>>;
    fn get_ownership(&self, id: ResourceId) -> RepoResult<ResourceOwnership>;
    /// Lists pictograms with ownership, optionally filtered by title
    /// substring (case-insensitive), ordered by title then id.
    fn list_pictograms(
        &self,
        title_filter: Option<&str>,
    ) -> RepoResult<Vec<(Pictogram, ResourceOwnership)>>;
    /// Persists title, access level, last edit and (for choices) options,
    /// and adds `new_owners` in the same transaction. Existing ownership
    /// rows are kept.
    fn update_frame(&self, frame: &Frame, new_owners: &ResourceOwnership) -> RepoResult<()>;
    fn set_has_image(&self, id: ResourceId, has_image: bool, last_edit: i64) -> RepoResult<()>;
    fn delete_resource(&self, id: ResourceId) -> RepoResult<()>;
    /// Returns the public placeholder pictogram, creating it on first call.
    fn ensure_default_pictogram(&self, title: &str) -> RepoResult<Pictogram>;
}

/// SQLite-backed frame repository.
pub struct SqliteResourceRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteResourceRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(
            conn,
            &[
                (
                    "resources",
                    &["id", "kind", "title", "access_level", "has_image", "last_edit"],
                ),
                ("choice_options", &["choice_id", "position", "pictogram_id"]),
                ("user_resources", &["user_id", "resource_id"]),
                ("department_resources", &["department_id", "resource_id"]),
            ],
        )?;
        Ok(Self { conn })
    }
}

impl ResourceRepository for SqliteResourceRepository<'_> {
    fn create_pictogram(
        &self,
        pictogram: &NewPictogram,
        ownership: &ResourceOwnership,
    ) -> RepoResult<Pictogram> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let last_edit = now_epoch_ms();
        let id = insert_resource(
            &tx,
            FrameKind::Pictogram,
            pictogram.title.as_str(),
            pictogram.access_level,
            last_edit,
        )?;
        insert_owners(&tx, id, ownership)?;
        tx.commit()?;

        Ok(Pictogram {
            key: id,
            title: pictogram.title.clone(),
            access_level: pictogram.access_level,
            last_edit,
            has_image: false,
        })
    }

    fn create_choice(
        &self,
        choice: &NewChoice,
        ownership: &ResourceOwnership,
    ) -> RepoResult<Choice> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let last_edit = now_epoch_ms();
        let id = insert_resource(
            &tx,
            FrameKind::Choice,
            choice.title.as_str(),
            choice.access_level,
            last_edit,
        )?;
        let created = Choice::new(
            id,
            choice.title.clone(),
            choice.access_level,
            last_edit,
            choice.options.iter().copied(),
        );
        replace_options(&tx, id, created.options())?;
        insert_owners(&tx, id, ownership)?;
        tx.commit()?;
        Ok(created)
    }

    fn get_frame(&self, id: ResourceId) -> RepoResult<Option<Frame>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{RESOURCE_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_frame_row(self.conn, row)?)),
            None => Ok(None),
        }
    }

    fn get_pictogram(&self, id: ResourceId) -> RepoResult<Option<Pictogram>> {
        match self.get_frame(id)? {
            Some(Frame::Pictogram(pictogram)) => Ok(Some(pictogram)),
            _ => Ok(None),
        }
    }

    fn get_ownership(&self, id: ResourceId) -> RepoResult<ResourceOwnership> {
        load_ownership(self.conn, id)
    }

    fn list_pictograms(
        &self,
        title_filter: Option<&str>,
    ) -> RepoResult<Vec<(Pictogram, ResourceOwnership)>> {
        let pattern = title_filter
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| format!("%{}%", escape_like(value)));

        let mut stmt = self.conn.prepare(&format!(
            "{RESOURCE_SELECT_SQL}
             WHERE kind = 'pictogram'
               AND (?1 IS NULL OR title LIKE ?1 ESCAPE '\\')
             ORDER BY title COLLATE NOCASE ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([pattern])?;
        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            if let Frame::Pictogram(pictogram) = parse_frame_row(self.conn, row)? {
                let ownership = load_ownership(self.conn, pictogram.key)?;
                result.push((pictogram, ownership));
            }
        }
        Ok(result)
    }

    fn update_frame(&self, frame: &Frame, new_owners: &ResourceOwnership) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "UPDATE resources
             SET title = ?2, access_level = ?3, last_edit = ?4
             WHERE id = ?1 AND kind = ?5;",
            params![
                frame.key(),
                frame.title(),
                frame.access_level().as_str(),
                frame.last_edit(),
                frame.kind().as_str(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::ResourceNotFound(frame.key()));
        }
        if let Frame::Choice(choice) = frame {
            replace_options(&tx, choice.key, choice.options())?;
        }
        insert_owners(&tx, frame.key(), new_owners)?;
        tx.commit()?;
        Ok(())
    }

    fn set_has_image(&self, id: ResourceId, has_image: bool, last_edit: i64) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE resources
             SET has_image = ?2, last_edit = ?3
             WHERE id = ?1 AND kind = 'pictogram';",
            params![id, bool_to_int(has_image), last_edit],
        )?;
        if changed == 0 {
            return Err(RepoError::ResourceNotFound(id));
        }
        Ok(())
    }

    fn delete_resource(&self, id: ResourceId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM resources WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::ResourceNotFound(id));
        }
        Ok(())
    }

    fn ensure_default_pictogram(&self, title: &str) -> RepoResult<Pictogram> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let existing: Option<ResourceId> = tx
            .query_row(
                "SELECT id
                 FROM resources
                 WHERE kind = 'pictogram'
                   AND access_level = 'public'
                   AND title = ?1
                 ORDER BY id ASC
                 LIMIT 1;",
                [title],
                |row| row.get(0),
            )
            .optional()?;

        let id = match existing {
            Some(id) => id,
            None => insert_resource(
                &tx,
                FrameKind::Pictogram,
                title,
                AccessLevel::Public,
                now_epoch_ms(),
            )?,
        };
        tx.commit()?;

        self.get_pictogram(id)?
            .ok_or(RepoError::ResourceNotFound(id))
    }
}

fn insert_resource(
    conn: &Connection,
    kind: FrameKind,
    title: &str,
    access_level: AccessLevel,
    last_edit: i64,
) -> RepoResult<ResourceId> {
    conn.execute(
        "INSERT INTO resources (kind, title, access_level, has_image, last_edit)
         VALUES (?1, ?2, ?3, 0, ?4);",
        params![kind.as_str(), title, access_level.as_str(), last_edit],
    )?;
    Ok(conn.last_insert_rowid())
}

fn insert_owners(conn: &Connection, id: ResourceId, ownership: &ResourceOwnership) -> RepoResult<()> {
    for user_id in &ownership.user_ids {
        conn.execute(
            "INSERT OR IGNORE INTO user_resources (user_id, resource_id) VALUES (?1, ?2);",
            params![user_id.to_string(), id],
        )?;
    }
    for department_id in &ownership.department_ids {
        conn.execute(
            "INSERT OR IGNORE INTO department_resources (department_id, resource_id)
             VALUES (?1, ?2);",
            params![department_id, id],
        )?;
    }
    Ok(())
}

fn replace_options(conn: &Connection, choice_id: ResourceId, options: &[ResourceId]) -> RepoResult<()> {
    conn.execute("DELETE FROM choice_options WHERE choice_id = ?1;", [choice_id])?;
    for (position, option) in options.iter().enumerate() {
        let kind: Option<String> = conn
            .query_row("SELECT kind FROM resources WHERE id = ?1;", [option], |row| {
                row.get(0)
            })
            .optional()?;
        if kind.as_deref() != Some(FrameKind::Pictogram.as_str()) {
            return Err(RepoError::ResourceNotFound(*option));
        }
        conn.execute(
            "INSERT INTO choice_options (choice_id, position, pictogram_id)
             VALUES (?1, ?2, ?3);",
            params![choice_id, position as i64, option],
        )?;
    }
    Ok(())
}

fn load_ownership(conn: &Connection, id: ResourceId) -> RepoResult<ResourceOwnership> {
    let mut ownership = ResourceOwnership::default();

    let mut stmt = conn.prepare(
        "SELECT user_id FROM user_resources WHERE resource_id = ?1 ORDER BY user_id ASC;",
    )?;
    let mut rows = stmt.query([id])?;
    while let Some(row) = rows.next()? {
        let value: String = row.get(0)?;
        ownership
            .user_ids
            .push(parse_user_id(&value, "user_resources.user_id")?);
    }

    let mut stmt = conn.prepare(
        "SELECT department_id
         FROM department_resources
         WHERE resource_id = ?1
         ORDER BY department_id ASC;",
    )?;
    let mut rows = stmt.query([id])?;
    while let Some(row) = rows.next()? {
        ownership.department_ids.push(row.get(0)?);
    }

    Ok(ownership)
}

fn load_options(conn: &Connection, choice_id: ResourceId) -> RepoResult<Vec<ResourceId>> {
    let mut stmt = conn.prepare(
        "SELECT pictogram_id FROM choice_options WHERE choice_id = ?1 ORDER BY position ASC;",
    )?;
    let mut rows = stmt.query([choice_id])?;
    let mut options = Vec::new();
    while let Some(row) = rows.next()? {
        options.push(row.get(0)?);
    }
    Ok(options)
}

fn parse_frame_row(conn: &Connection, row: &Row<'_>) -> RepoResult<Frame> {
    let key: ResourceId = row.get("id")?;

    let kind_text: String = row.get("kind")?;
    let kind = FrameKind::parse(&kind_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid frame kind `{kind_text}` in resources.kind"))
    })?;

    let level_text: String = row.get("access_level")?;
    let access_level = AccessLevel::parse(&level_text)
        .map_err(|err| RepoError::InvalidData(format!("{err} in resources.access_level")))?;

    let title: String = row.get("title")?;
    let last_edit: i64 = row.get("last_edit")?;

    Ok(match kind {
        FrameKind::Pictogram => Frame::Pictogram(Pictogram {
            key,
            title,
            access_level,
            last_edit,
            has_image: int_to_bool(row.get("has_image")?, "resources.has_image")?,
        }),
        FrameKind::Choice => Frame::Choice(Choice::new(
            key,
            title,
            access_level,
            last_edit,
            load_options(conn, key)?,
        )),
    })
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
