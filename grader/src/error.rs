//! Grader Error Types
//!
//! [`GradingServiceError`] is what the scoring client raises; [`GradingError`]
//! is what the dispatcher deals in. Only batch-level precondition failures
//! (`Validation`, `NotFound`, `Database`) leave the dispatcher as errors. All
//! other variants are captured per portfolio into a failed outcome.

use sea_orm::DbErr;
use serde::Serialize;
use std::path::PathBuf;

/// A failed call to the scoring service.
///
/// Every variant is the same failure to callers, but the message keeps
/// which one happened.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GradingServiceError {
    /// No response within the client timeout.
    #[error("ML request timeout: {detail}")]
    Timeout { portfolio_id: i64, detail: String },
    /// The service answered with a non-success status.
    #[error("ML service error ({status}): {detail}")]
    Status {
        portfolio_id: i64,
        status: u16,
        detail: String,
    },
    /// Connection failure, or a body that could not be read or decoded.
    #[error("ML request failed: {detail}")]
    Transport {
        portfolio_id: i64,
        status: Option<u16>,
        detail: String,
    },
}

impl GradingServiceError {
    pub fn portfolio_id(&self) -> i64 {
        match self {
            Self::Timeout { portfolio_id, .. }
            | Self::Status { portfolio_id, .. }
            | Self::Transport { portfolio_id, .. } => *portfolio_id,
        }
    }

    /// HTTP status, if one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Timeout { .. } => None,
            Self::Status { status, .. } => Some(*status),
            Self::Transport { status, .. } => *status,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "timeout",
            Self::Status { .. } => "status",
            Self::Transport { .. } => "transport",
        }
    }
}

/// Why a single portfolio failed, as reported in a batch outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NotFound,
    FileMissing,
    Service,
    Persistence,
    Cancelled,
    Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum GradingError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Service(#[from] GradingServiceError),
    #[error("portfolio file not found: {}", .0.display())]
    FileMissing(PathBuf),
    /// The file may exist but could not be inspected (permissions, not a directory, ...).
    #[error("cannot access portfolio file {}: {source}", path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The grade was produced but could not be stored; it is discarded.
    #[error("failed to store grading result: {0}")]
    Persistence(DbErr),
    #[error("grading cancelled before dispatch")]
    Cancelled,
    #[error("grading task aborted: {0}")]
    Internal(String),
    #[error("database error: {0}")]
    Database(#[from] DbErr),
}

impl GradingError {
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            GradingError::NotFound(_) => FailureKind::NotFound,
            GradingError::FileMissing(_) => FailureKind::FileMissing,
            GradingError::Service(_) => FailureKind::Service,
            GradingError::Persistence(_) => FailureKind::Persistence,
            GradingError::Cancelled => FailureKind::Cancelled,
            GradingError::Validation(_)
            | GradingError::FileAccess { .. }
            | GradingError::Internal(_)
            | GradingError::Database(_) => FailureKind::Internal,
        }
    }
}
