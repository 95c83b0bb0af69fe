//! Uniform result wrapper for core operations.
//!
//! # Responsibility
//! - Define the closed `ErrorCode` set surfaced to callers.
//! - Separate expected failures (envelope) from infrastructure faults (`Err`).
//!
//! # Invariants
//! - `Response::Success` always maps to `ErrorCode::NoError`.
//! - Repository and image I/O faults never become a `Failure` envelope.

use crate::model::resource::{FrameKindMismatch, ResourceId};
use crate::repo::RepoError;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Stable error keys; serialized with their variant names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    NoError,
    NotFound,
    NotAuthorized,
    UserNotFound,
    MissingProperties,
    WeekNotFound,
    InvalidDay,
    ActivityNotFound,
    NoWeekScheduleFound,
    ThumbnailDoesNotExist,
    ResourceNotFound,
    InvalidProperties,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoError => "NoError",
            Self::NotFound => "NotFound",
            Self::NotAuthorized => "NotAuthorized",
            Self::UserNotFound => "UserNotFound",
            Self::MissingProperties => "MissingProperties",
            Self::WeekNotFound => "WeekNotFound",
            Self::InvalidDay => "InvalidDay",
            Self::ActivityNotFound => "ActivityNotFound",
            Self::NoWeekScheduleFound => "NoWeekScheduleFound",
            Self::ThumbnailDoesNotExist => "ThumbnailDoesNotExist",
            Self::ResourceNotFound => "ResourceNotFound",
            Self::InvalidProperties => "InvalidProperties",
        }
    }
}

impl Display for ErrorCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Failure of a core operation.
#[derive(Debug)]
pub enum ServiceError {
    NotFound,
    NotAuthorized,
    UserNotFound,
    /// Names the absent or blank property.
    MissingProperties(&'static str),
    WeekNotFound,
    InvalidDay(String),
    ActivityNotFound,
    NoWeekScheduleFound,
    ThumbnailDoesNotExist,
    ResourceNotFound(ResourceId),
    InvalidProperties(String),
    /// Storage fault.
    Repo(RepoError),
    /// Image store fault.
    Image(std::io::Error),
}

impl ServiceError {
    /// Error key for expected failures; `None` for infrastructure faults.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::NotFound => Some(ErrorCode::NotFound),
            Self::NotAuthorized => Some(ErrorCode::NotAuthorized),
            Self::UserNotFound => Some(ErrorCode::UserNotFound),
            Self::MissingProperties(_) => Some(ErrorCode::MissingProperties),
            Self::WeekNotFound => Some(ErrorCode::WeekNotFound),
            Self::InvalidDay(_) => Some(ErrorCode::InvalidDay),
            Self::ActivityNotFound => Some(ErrorCode::ActivityNotFound),
            Self::NoWeekScheduleFound => Some(ErrorCode::NoWeekScheduleFound),
            Self::ThumbnailDoesNotExist => Some(ErrorCode::ThumbnailDoesNotExist),
            Self::ResourceNotFound(_) => Some(ErrorCode::ResourceNotFound),
            Self::InvalidProperties(_) => Some(ErrorCode::InvalidProperties),
            Self::Repo(_) | Self::Image(_) => None,
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingProperties(property) => write!(f, "missing property: {property}"),
            Self::InvalidDay(details) => write!(f, "invalid day: {details}"),
            Self::ResourceNotFound(id) => write!(f, "referenced resource not found: {id}"),
            Self::InvalidProperties(details) => write!(f, "invalid properties: {details}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Image(err) => write!(f, "image store failure: {err}"),
            other => match other.code() {
                Some(code) => f.write_str(code.as_str()),
                None => f.write_str("service failure"),
            },
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Image(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::UserNotFound(_) => Self::UserNotFound,
            RepoError::ResourceNotFound(id) => Self::ResourceNotFound(id),
            RepoError::ActivityNotFound(_) => Self::ActivityNotFound,
            RepoError::Conflict(details) => Self::InvalidProperties(details),
            other => Self::Repo(other),
        }
    }
}

impl From<std::io::Error> for ServiceError {
    fn from(value: std::io::Error) -> Self {
        Self::Image(value)
    }
}

impl From<FrameKindMismatch> for ServiceError {
    fn from(value: FrameKindMismatch) -> Self {
        Self::InvalidProperties(value.to_string())
    }
}

/// Two-variant result of a core operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response<T> {
    Success(T),
    Failure {
        code: ErrorCode,
        message: Option<String>,
    },
}

impl<T> Response<T> {
    /// Folds expected failures into `Failure`; infrastructure faults stay `Err`.
    pub fn from_result(result: ServiceResult<T>) -> Result<Self, ServiceError> {
        match result {
            Ok(value) => Ok(Self::Success(value)),
            Err(err) => match err.code() {
                Some(code) => Ok(Self::Failure {
                    code,
                    message: Some(err.to_string()),
                }),
                None => Err(err),
            },
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Success(_) => ErrorCode::NoError,
            Self::Failure { code, .. } => *code,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn into_envelope(self) -> ResponseEnvelope<T> {
        match self {
            Self::Success(data) => ResponseEnvelope {
                success: true,
                error_key: ErrorCode::NoError,
                data: Some(data),
            },
            Self::Failure { code, .. } => ResponseEnvelope {
                success: false,
                error_key: code,
                data: None,
            },
        }
    }
}

/// Serializable form of [`Response`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope<T> {
    pub success: bool,
    pub error_key: ErrorCode,
    pub data: Option<T>,
}
