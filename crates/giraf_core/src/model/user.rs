//! Users, departments and launcher settings.
//!
//! # Responsibility
//! - Define the identity records that authorization decisions run against.
//! - Represent guardian/citizen links as id lists loaded from join rows.
//!
//! # Invariants
//! - `UserId` is stable and never reused.
//! - `guardian_ids` / `citizen_ids` mirror the `guardian_relations` table;
//!   users never hold references to other `User` values.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable user identifier.
pub type UserId = Uuid;

/// Department primary key.
pub type DepartmentId = i64;

/// Role assigned to one user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Citizen,
    Guardian,
    Trustee,
    Department,
    SuperUser,
}

impl Role {
    /// Stable storage value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Citizen => "citizen",
            Self::Guardian => "guardian",
            Self::Trustee => "trustee",
            Self::Department => "department",
            Self::SuperUser => "super_user",
        }
    }

    /// Parses a storage value produced by [`Role::as_str`].
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "citizen" => Some(Self::Citizen),
            "guardian" => Some(Self::Guardian),
            "trustee" => Some(Self::Trustee),
            "department" => Some(Self::Department),
            "super_user" => Some(Self::SuperUser),
            _ => None,
        }
    }

    fn rank(self) -> u8 {
        match self {
            Self::Citizen => 0,
            Self::Guardian => 1,
            Self::Trustee => 2,
            Self::Department => 3,
            Self::SuperUser => 4,
        }
    }

    /// Strictly higher in the account hierarchy; used for register/delete.
    pub fn outranks(self, other: Role) -> bool {
        self.rank() > other.rank()
    }

    /// Roles that administer the members of their own department.
    pub fn administers_department(self) -> bool {
        matches!(self, Self::Department | Self::SuperUser)
    }
}

/// Account record as seen by the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub role: Role,
    /// Owning department. `None` for users outside any department.
    pub department_id: Option<DepartmentId>,
    /// Users registered as guardians of this user.
    pub guardian_ids: Vec<UserId>,
    /// Users this user is registered guardian of.
    pub citizen_ids: Vec<UserId>,
}

impl User {
    /// Returns whether `candidate` is a registered guardian of this user.
    pub fn is_guarded_by(&self, candidate: UserId) -> bool {
        self.guardian_ids.contains(&candidate)
    }
}

/// Input for account creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub role: Role,
    pub department_id: Option<DepartmentId>,
}

/// Department with member and resource ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: DepartmentId,
    pub name: String,
    pub member_ids: Vec<UserId>,
    pub resource_ids: Vec<i64>,
}

/// Screen orientation preference for the launcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    Portrait,
    Landscape,
}

/// How completed/canceled activities are marked in the launcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompleteMark {
    Removed,
    Checkmark,
    MovedRight,
}

/// Visual timer style used when an activity starts a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DefaultTimer {
    Hourglass,
    AnalogClock,
}

/// Launcher options stored per user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub orientation: Orientation,
    pub complete_mark: CompleteMark,
    pub cancel_mark: CompleteMark,
    pub default_timer: DefaultTimer,
    pub timer_seconds: Option<i64>,
    pub activities_count: Option<i64>,
    pub theme: String,
    /// Between 1 and 7.
    pub nr_of_days_to_display: u8,
    pub greyscale: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            orientation: Orientation::Portrait,
            complete_mark: CompleteMark::Checkmark,
            cancel_mark: CompleteMark::Removed,
            default_timer: DefaultTimer::AnalogClock,
            timer_seconds: Some(900),
            activities_count: None,
            theme: "girafYellow".to_string(),
            nr_of_days_to_display: 7,
            greyscale: false,
        }
    }
}

impl Settings {
    /// Returns whether the settings can be persisted as-is.
    pub fn is_valid(&self) -> bool {
        (1..=7).contains(&self.nr_of_days_to_display)
            && !self.theme.trim().is_empty()
            && self.timer_seconds.map_or(true, |value| value > 0)
            && self.activities_count.map_or(true, |value| value >= 0)
    }
}
