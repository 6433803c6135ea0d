use sea_orm::DbErr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Database(#[from] DbErr),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ServiceError::Validation(errors.to_string())
    }
}
