use std::fmt;

use thiserror::Error;

use crate::application::ports::GatewayError;
use crate::config::LoadError;
use crate::domain::error::DomainError;
use crate::infra::error::InfraError;

const STATUS_FORBIDDEN: u16 = 403;
const STATUS_NOT_FOUND: u16 = 404;
const STATUS_REQUEST_TIMEOUT: u16 = 408;
const DEFAULT_ERROR_MESSAGE: &str = "Request failed";

/// Failure of a document lookup, as seen by views and loaders.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("document not found")]
    NotFound,
    #[error("this note is protected by a password")]
    NeedsPassword,
    #[error("the password is not correct")]
    InvalidPassword,
    #[error(transparent)]
    Remote(GatewayError),
    #[error("local logic error: {0}")]
    LocalLogic(String),
}

impl FetchError {
    pub fn local(message: impl Into<String>) -> Self {
        Self::LocalLogic(message.into())
    }

    /// Classify a gateway failure. A 403 means "needs password" unless one was supplied.
    pub fn classify(error: GatewayError, password_supplied: bool) -> Self {
        match error.status_code() {
            Some(STATUS_NOT_FOUND) => Self::NotFound,
            Some(STATUS_FORBIDDEN) if password_supplied => Self::InvalidPassword,
            Some(STATUS_FORBIDDEN) => Self::NeedsPassword,
            _ => Self::Remote(error),
        }
    }

    pub fn status_class(&self) -> StatusClass {
        match self {
            FetchError::NotFound => StatusClass::Code(STATUS_NOT_FOUND),
            FetchError::NeedsPassword | FetchError::InvalidPassword => {
                StatusClass::Code(STATUS_FORBIDDEN)
            }
            FetchError::Remote(GatewayError::Status { status, .. }) => StatusClass::Code(*status),
            FetchError::Remote(GatewayError::Transport(_)) => {
                StatusClass::Code(STATUS_REQUEST_TIMEOUT)
            }
            FetchError::Remote(GatewayError::Decode(_)) | FetchError::LocalLogic(_) => {
                StatusClass::Generic
            }
        }
    }
}

/// Status shown on the error view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Code(u16),
    Generic,
}

impl fmt::Display for StatusClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusClass::Code(code) => write!(f, "{code}"),
            StatusClass::Generic => f.write_str("Error"),
        }
    }
}

/// What a failed load renders instead of the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorView {
    pub status: StatusClass,
    pub message: String,
}

impl ErrorView {
    pub fn from_error(error: &FetchError) -> Self {
        let message = error.to_string();
        Self {
            status: error.status_class(),
            message: if message.trim().is_empty() {
                DEFAULT_ERROR_MESSAGE.to_string()
            } else {
                message
            },
        }
    }
}

impl From<&FetchError> for ErrorView {
    fn from(error: &FetchError) -> Self {
        Self::from_error(error)
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Config(#[from] LoadError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
}
