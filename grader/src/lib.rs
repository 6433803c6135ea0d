//! # Grader
//!
//! Batch AI grading for assignment portfolios.
//!
//! ## Key Concepts
//! - **GradeRequest**: one unit of grading work (portfolio, absolute file path, rubric text).
//! - **GradingClient**: the call to the external scoring service ([`client::MlClient`] over HTTP).
//! - **Stores**: where portfolios and rubrics are read from and results are upserted to.
//! - **BatchDispatcher**: grades every portfolio of an assignment with bounded
//!   concurrency, isolating per-item failures into a [`report::BatchReport`].

pub mod client;
pub mod dispatcher;
pub mod error;
pub mod report;
pub mod request;
pub mod store;

pub use client::{ClientConfig, GradingClient, MlClient};
pub use dispatcher::{BatchDispatcher, DispatchConfig};
pub use error::{FailureKind, GradingError, GradingServiceError};
pub use report::{BatchReport, GradingOutcome};
pub use request::{GradeRequest, GradeResult};
pub use store::{DbStore, GradingStore, PortfolioRecord, PortfolioStore, ResultStore, RubricStore, StoredResult};
