use thiserror::Error;

use crate::auth::AuthError;
use crate::database::StoreError;
use crate::types::ParseError;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// No session, or a role that may not perform the operation
    #[error("{0}")]
    Unauthorized(String),

    #[error(transparent)]
    InvalidArgument(#[from] ParseError),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Auth(AuthError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ServiceError::Conflict(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ServiceError::NotFound(message.into())
    }
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingSession | AuthError::InsufficientRole | AuthError::InvalidCredentials => {
                ServiceError::Unauthorized(err.to_string())
            }
            other => ServiceError::Auth(other),
        }
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::Store(StoreError::Decode(err))
    }
}

impl From<tokio::task::JoinError> for ServiceError {
    fn from(err: tokio::task::JoinError) -> Self {
        ServiceError::Internal(format!("background task failed: {}", err))
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
