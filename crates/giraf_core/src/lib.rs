//! Core domain logic for the Giraf pictogram and scheduling backend.
//! This crate is the single source of truth for authorization and schedule
//! invariants.

pub mod auth;
pub mod config;
pub mod db;
pub mod image_store;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, GirafConfig};
pub use db::{open_configured_db, open_db, open_db_in_memory, DbError};
pub use image_store::{FsImageStore, ImageStore};
pub use logging::{
    default_log_level, init_logging, init_logging_from_config, logging_status, LoggingError,
};
pub use model::access::AccessLevel;
pub use model::resource::{Choice, Frame, Pictogram, ResourceId, ResourceOwnership};
pub use model::schedule::{Activity, ActivityState, Day, Timer, Week, Weekday};
pub use model::user::{Role, Settings, User, UserId};
pub use repo::resource_repo::{ResourceRepository, SqliteResourceRepository};
pub use repo::user_repo::{SqliteUserRepository, UserRepository};
pub use repo::week_repo::{SqliteWeekRepository, WeekRepository};
pub use repo::{RepoError, RepoResult};
pub use service::activity_service::ActivityService;
pub use service::choice_service::ChoiceService;
pub use service::pictogram_service::PictogramService;
pub use service::response::{ErrorCode, Response, ResponseEnvelope, ServiceError, ServiceResult};
pub use service::user_service::UserService;
pub use service::week_service::WeekService;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
