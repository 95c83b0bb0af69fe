//! Account, settings and guardian-relation use cases.
//!
//! Credentials are handled by the identity provider; accounts here are
//! identity records only.

use crate::auth::{can_assign_guardian, can_delete_user, can_register};
use crate::model::user::{NewUser, Role, Settings, User, UserId};
use crate::repo::user_repo::UserRepository;
use crate::service::response::{ServiceError, ServiceResult};
use crate::service::{authorize_user_target, log_outcome};
use std::time::Instant;

pub struct UserService<U: UserRepository> {
    users: U,
}

impl<U: UserRepository> UserService<U> {
    pub fn new(users: U) -> Self {
        Self { users }
    }

    pub fn get_user(&self, actor: Option<&User>, user_id: UserId) -> ServiceResult<User> {
        authorize_user_target(&self.users, actor, user_id)
    }

    /// Creates an account with a lower role in the actor's department.
    pub fn register_user(&self, actor: Option<&User>, account: &NewUser) -> ServiceResult<User> {
        let started_at = Instant::now();
        let result = self.register_user_inner(actor, account);
        let detail = match &result {
            Ok(user) => format!("user_id={} role={}", user.id, user.role.as_str()),
            Err(_) => format!("role={}", account.role.as_str()),
        };
        log_outcome("user_register", "user", started_at, &detail, &result);
        result
    }

    fn register_user_inner(&self, actor: Option<&User>, account: &NewUser) -> ServiceResult<User> {
        let actor = actor.ok_or(ServiceError::NotAuthorized)?;
        if account.username.trim().is_empty() {
            return Err(ServiceError::MissingProperties("username"));
        }
        if let Some(department_id) = account.department_id {
            if self.users.get_department(department_id)?.is_none() {
                return Err(ServiceError::InvalidProperties(format!(
                    "unknown department {department_id}"
                )));
            }
        }
        if !can_register(actor, account) {
            return Err(ServiceError::NotAuthorized);
        }
        if self.users.find_user_by_username(&account.username)?.is_some() {
            return Err(ServiceError::InvalidProperties(
                "username is taken".to_string(),
            ));
        }
        Ok(self.users.create_user(account)?)
    }

    /// Deletes an account the actor can reach and outranks.
    pub fn delete_user(&self, actor: Option<&User>, user_id: UserId) -> ServiceResult<()> {
        let started_at = Instant::now();
        let result = self.delete_user_inner(actor, user_id);
        log_outcome(
            "user_delete",
            "user",
            started_at,
            &format!("user_id={user_id}"),
            &result,
        );
        result
    }

    /// Stored settings, or defaults when the user never saved any.
    pub fn get_settings(&self, actor: Option<&User>, user_id: UserId) -> ServiceResult<Settings> {
        authorize_user_target(&self.users, actor, user_id)?;
        Ok(self.users.get_settings(user_id)?)
    }

    pub fn update_settings(
        &self,
        actor: Option<&User>,
        user_id: UserId,
        settings: &Settings,
    ) -> ServiceResult<Settings> {
        let started_at = Instant::now();
        let result = authorize_user_target(&self.users, actor, user_id).and_then(|_| {
            if !settings.is_valid() {
                return Err(ServiceError::InvalidProperties(
                    "settings values out of range".to_string(),
                ));
            }
            self.users.save_settings(user_id, settings)?;
            Ok(settings.clone())
        });
        log_outcome("settings_update", "user", started_at, "", &result);
        result
    }

    fn delete_user_inner(&self, actor: Option<&User>, user_id: UserId) -> ServiceResult<()> {
        let actor = actor.ok_or(ServiceError::NotAuthorized)?;
        let target = authorize_user_target(&self.users, Some(actor), user_id)?;
        if !can_delete_user(actor, &target) {
            return Err(ServiceError::NotAuthorized);
        }
        self.users.delete_user(user_id)?;
        Ok(())
    }

    /// Registers `guardian_id` as guardian of `citizen_id`.
    ///
    /// The actor needs access to the citizen and must be the guardian
    /// itself or an administrator of the citizen's department.
    pub fn add_guardian_relation(
        &self,
        actor: Option<&User>,
        guardian_id: UserId,
        citizen_id: UserId,
    ) -> ServiceResult<()> {
        let started_at = Instant::now();
        let result = self.add_guardian_relation_inner(actor, guardian_id, citizen_id);
        log_outcome("guardian_relation_add", "user", started_at, "", &result);
        result
    }

    fn add_guardian_relation_inner(
        &self,
        actor: Option<&User>,
        guardian_id: UserId,
        citizen_id: UserId,
    ) -> ServiceResult<()> {
        let actor = actor.ok_or(ServiceError::NotAuthorized)?;
        let citizen = authorize_user_target(&self.users, Some(actor), citizen_id)?;
        let guardian = self
            .users
            .get_user(guardian_id)?
            .ok_or(ServiceError::UserNotFound)?;
        if guardian.role != Role::Guardian || citizen.role != Role::Citizen {
            return Err(ServiceError::InvalidProperties(format!(
                "expected guardian/citizen roles, got {}/{}",
                guardian.role.as_str(),
                citizen.role.as_str()
            )));
        }
        if !can_assign_guardian(actor, &guardian, &citizen) {
            return Err(ServiceError::NotAuthorized);
        }
        self.users.add_guardian_relation(guardian_id, citizen_id)?;
        Ok(())
    }

    /// Citizens registered under `guardian_id`.
    pub fn list_citizens(
        &self,
        actor: Option<&User>,
        guardian_id: UserId,
    ) -> ServiceResult<Vec<User>> {
        let guardian = authorize_user_target(&self.users, actor, guardian_id)?;
        let mut citizens = Vec::with_capacity(guardian.citizen_ids.len());
        for citizen_id in &guardian.citizen_ids {
            if let Some(citizen) = self.users.get_user(*citizen_id)? {
                citizens.push(citizen);
            }
        }
        Ok(citizens)
    }
}
