//! Error taxonomy
//!
//! Everything here is a configuration or lifecycle error, raised while the
//! app is being built, registered or started. The per-tick path has no error
//! type because nothing in it can fail.

use crate::config::ConfigError;
use crate::context::{Capability, ContextId};
use crate::hal::ButtonId;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Context '{context}' requires {capability}, which is not configured")]
    MissingCapability {
        context: String,
        capability: Capability,
    },

    #[error("Context id {0} is already registered")]
    DuplicateContext(ContextId),

    #[error("No context registered with id {0}")]
    UnknownContext(ContextId),

    #[error("No context registered")]
    NoContext,

    #[error("App has not been started")]
    NotStarted,

    #[error("App is already running")]
    AlreadyStarted,

    #[error("Context '{context}' failed to initialize: {source}")]
    ContextInitFailed {
        context: String,
        #[source]
        source: Box<AppError>,
    },

    /// Free-form failure raised by a context's own initialisation
    #[error("{0}")]
    Context(String),

    #[error("Button id {0} is invalid, ids start at 1")]
    InvalidButton(ButtonId),

    #[error("Button id {0} is defined more than once")]
    DuplicateButton(ButtonId),

    #[error("Buttons are configured but no input source was given")]
    MissingInputSource,

    #[error("Invalid input timing: {0}")]
    InvalidTiming(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Stable, diagnosable code for each [`AppError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    MissingCapability,
    DuplicateContext,
    UnknownContext,
    NoContext,
    NotStarted,
    AlreadyStarted,
    ContextInitFailed,
    ContextError,
    InvalidButton,
    DuplicateButton,
    MissingInputSource,
    InvalidTiming,
    ConfigError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::MissingCapability => "MISSING_CAPABILITY",
            ErrorCode::DuplicateContext => "DUPLICATE_CONTEXT",
            ErrorCode::UnknownContext => "UNKNOWN_CONTEXT",
            ErrorCode::NoContext => "NO_CONTEXT",
            ErrorCode::NotStarted => "NOT_STARTED",
            ErrorCode::AlreadyStarted => "ALREADY_STARTED",
            ErrorCode::ContextInitFailed => "CONTEXT_INIT_FAILED",
            ErrorCode::ContextError => "CONTEXT_ERROR",
            ErrorCode::InvalidButton => "INVALID_BUTTON",
            ErrorCode::DuplicateButton => "DUPLICATE_BUTTON",
            ErrorCode::MissingInputSource => "MISSING_INPUT_SOURCE",
            ErrorCode::InvalidTiming => "INVALID_TIMING",
            ErrorCode::ConfigError => "CONFIG_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AppError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::MissingCapability { .. } => ErrorCode::MissingCapability,
            AppError::DuplicateContext(_) => ErrorCode::DuplicateContext,
            AppError::UnknownContext(_) => ErrorCode::UnknownContext,
            AppError::NoContext => ErrorCode::NoContext,
            AppError::NotStarted => ErrorCode::NotStarted,
            AppError::AlreadyStarted => ErrorCode::AlreadyStarted,
            AppError::ContextInitFailed { .. } => ErrorCode::ContextInitFailed,
            AppError::Context(_) => ErrorCode::ContextError,
            AppError::InvalidButton(_) => ErrorCode::InvalidButton,
            AppError::DuplicateButton(_) => ErrorCode::DuplicateButton,
            AppError::MissingInputSource => ErrorCode::MissingInputSource,
            AppError::InvalidTiming(_) => ErrorCode::InvalidTiming,
            AppError::Config(_) => ErrorCode::ConfigError,
        }
    }
}
