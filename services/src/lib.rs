pub mod error;
pub mod grading_service;

pub use error::ServiceError;
pub use grading_service::{AssignmentResultRow, FinalGradeInput, GradingService};
