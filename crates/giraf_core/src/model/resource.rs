//! Ownable, visibility-gated resources.
//!
//! # Responsibility
//! - Model pictograms and choices as variants of one `Frame` sum type.
//! - Provide per-variant merge functions for update payloads.
//!
//! # Invariants
//! - `key` is assigned by storage and never changes.
//! - A choice's visibility is decided by its own `access_level`, not by
//!   the levels of its options.
//! - Choice options keep insertion order and contain no duplicates.

use crate::model::access::AccessLevel;
use crate::model::user::{DepartmentId, UserId};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Primary key shared by all frame variants.
pub type ResourceId = i64;

/// Storage discriminator for frame rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameKind {
    Pictogram,
    Choice,
}

impl FrameKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pictogram => "pictogram",
            Self::Choice => "choice",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pictogram" => Some(Self::Pictogram),
            "choice" => Some(Self::Choice),
            _ => None,
        }
    }
}

/// Single image-backed pictogram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pictogram {
    pub key: ResourceId,
    pub title: String,
    pub access_level: AccessLevel,
    /// Epoch milliseconds of the last mutation.
    pub last_edit: i64,
    /// Whether the image store holds bytes for this pictogram.
    pub has_image: bool,
}

/// Titled, ordered set of alternative pictograms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub key: ResourceId,
    pub title: String,
    pub access_level: AccessLevel,
    pub last_edit: i64,
    options: Vec<ResourceId>,
}

impl Choice {
    /// Builds a choice; duplicate options are dropped keeping first position.
    pub fn new(
        key: ResourceId,
        title: impl Into<String>,
        access_level: AccessLevel,
        last_edit: i64,
        options: impl IntoIterator<Item = ResourceId>,
    ) -> Self {
        let mut choice = Self {
            key,
            title: title.into(),
            access_level,
            last_edit,
            options: Vec::new(),
        };
        choice.add_all(options);
        choice
    }

    /// Ordered pictogram option ids.
    pub fn options(&self) -> &[ResourceId] {
        &self.options
    }

    /// Appends one option unless already present.
    pub fn add(&mut self, option: ResourceId) {
        if !self.options.contains(&option) {
            self.options.push(option);
        }
    }

    /// Appends every option in iteration order.
    pub fn add_all(&mut self, options: impl IntoIterator<Item = ResourceId>) {
        for option in options {
            self.add(option);
        }
    }

    /// Removes every option.
    pub fn clear(&mut self) {
        self.options.clear();
    }
}

/// Tagged union over every ownable resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Frame {
    Pictogram(Pictogram),
    Choice(Choice),
}

impl Frame {
    pub fn key(&self) -> ResourceId {
        match self {
            Self::Pictogram(pictogram) => pictogram.key,
            Self::Choice(choice) => choice.key,
        }
    }

    pub fn kind(&self) -> FrameKind {
        match self {
            Self::Pictogram(_) => FrameKind::Pictogram,
            Self::Choice(_) => FrameKind::Choice,
        }
    }

    pub fn access_level(&self) -> AccessLevel {
        match self {
            Self::Pictogram(pictogram) => pictogram.access_level,
            Self::Choice(choice) => choice.access_level,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Self::Pictogram(pictogram) => pictogram.title.as_str(),
            Self::Choice(choice) => choice.title.as_str(),
        }
    }

    pub fn last_edit(&self) -> i64 {
        match self {
            Self::Pictogram(pictogram) => pictogram.last_edit,
            Self::Choice(choice) => choice.last_edit,
        }
    }

    fn touch(&mut self, now_ms: i64) {
        match self {
            Self::Pictogram(pictogram) => pictogram.last_edit = now_ms,
            Self::Choice(choice) => choice.last_edit = now_ms,
        }
    }
}

/// Input for pictogram creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPictogram {
    pub title: String,
    pub access_level: AccessLevel,
}

/// Input for choice creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChoice {
    pub title: String,
    pub access_level: AccessLevel,
    pub options: Vec<ResourceId>,
}

/// Replacement values for a pictogram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PictogramUpdate {
    pub title: String,
    pub access_level: AccessLevel,
}

/// Replacement values for a choice. `options` replaces the full set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceUpdate {
    pub title: String,
    pub access_level: AccessLevel,
    pub options: Vec<ResourceId>,
}

/// Update payload matching one frame variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameUpdate {
    Pictogram(PictogramUpdate),
    Choice(ChoiceUpdate),
}

impl FrameUpdate {
    pub fn kind(&self) -> FrameKind {
        match self {
            Self::Pictogram(_) => FrameKind::Pictogram,
            Self::Choice(_) => FrameKind::Choice,
        }
    }
}

/// Raised when an update payload targets a different frame variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameKindMismatch {
    pub expected: FrameKind,
    pub actual: FrameKind,
}

impl Display for FrameKindMismatch {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "cannot merge {} update into {} frame",
            self.actual.as_str(),
            self.expected.as_str()
        )
    }
}

impl Error for FrameKindMismatch {}

/// Applies `update` to `frame` and stamps `last_edit`.
pub fn merge_frame(
    frame: &mut Frame,
    update: FrameUpdate,
    now_ms: i64,
) -> Result<(), FrameKindMismatch> {
    match (&mut *frame, update) {
        (Frame::Pictogram(pictogram), FrameUpdate::Pictogram(update)) => {
            merge_pictogram(pictogram, update)
        }
        (Frame::Choice(choice), FrameUpdate::Choice(update)) => merge_choice(choice, update),
        (frame, update) => {
            return Err(FrameKindMismatch {
                expected: frame.kind(),
                actual: update.kind(),
            })
        }
    }
    frame.touch(now_ms);
    Ok(())
}

/// Pictogram merge: title and access level are replaced.
pub fn merge_pictogram(pictogram: &mut Pictogram, update: PictogramUpdate) {
    pictogram.title = update.title;
    pictogram.access_level = update.access_level;
}

/// Choice merge: title and access level are replaced, options are cleared
/// and re-added in payload order.
pub fn merge_choice(choice: &mut Choice, update: ChoiceUpdate) {
    choice.title = update.title;
    choice.access_level = update.access_level;
    choice.clear();
    choice.add_all(update.options);
}

/// Ownership rows attached to one resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceOwnership {
    /// Direct owners (`user_resources`).
    pub user_ids: Vec<UserId>,
    /// Owning departments (`department_resources`).
    pub department_ids: Vec<DepartmentId>,
}

impl ResourceOwnership {
    pub fn owned_by_user(user_id: UserId) -> Self {
        Self {
            user_ids: vec![user_id],
            department_ids: Vec::new(),
        }
    }

    pub fn owned_by_department(department_id: DepartmentId) -> Self {
        Self {
            user_ids: Vec::new(),
            department_ids: vec![department_id],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pictogram(key: ResourceId) -> Pictogram {
        Pictogram {
            key,
            title: "cat".to_string(),
            access_level: AccessLevel::Public,
            last_edit: 10,
            has_image: false,
        }
    }

    #[test]
    fn choice_drops_duplicate_options() {
        let mut choice = Choice::new(1, "food", AccessLevel::Public, 0, [4, 5, 4]);
        assert_eq!(choice.options(), &[4, 5]);

        choice.add(5);
        choice.add(6);
        assert_eq!(choice.options(), &[4, 5, 6]);

        choice.clear();
        assert!(choice.options().is_empty());
    }

    #[test]
    fn merge_replaces_choice_options_and_stamps_last_edit() {
        let mut frame = Frame::Choice(Choice::new(1, "old", AccessLevel::Public, 0, [1, 2]));
        merge_frame(
            &mut frame,
            FrameUpdate::Choice(ChoiceUpdate {
                title: "new".to_string(),
                access_level: AccessLevel::Private,
                options: vec![3],
            }),
            99,
        )
        .expect("same kind merge");

        let Frame::Choice(choice) = frame else {
            panic!("frame kind changed");
        };
        assert_eq!(choice.title, "new");
        assert_eq!(choice.access_level, AccessLevel::Private);
        assert_eq!(choice.options(), &[3]);
        assert_eq!(choice.last_edit, 99);
    }

    #[test]
    fn merge_rejects_mismatched_variant() {
        let mut frame = Frame::Pictogram(pictogram(7));
        let err = merge_frame(
            &mut frame,
            FrameUpdate::Choice(ChoiceUpdate {
                title: "x".to_string(),
                access_level: AccessLevel::Public,
                options: Vec::new(),
            }),
            99,
        )
        .expect_err("kind mismatch must fail");

        assert_eq!(err.expected, FrameKind::Pictogram);
        assert_eq!(err.actual, FrameKind::Choice);
        assert_eq!(frame.last_edit(), 10);
    }
}
