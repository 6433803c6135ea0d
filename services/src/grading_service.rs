//! Staff-side review of AI grades: recording final grades, listing an
//! assignment's results, and publishing them to students.

use crate::error::ServiceError;
use chrono::{DateTime, Utc};
use db::models::{
    ai_grading, assignment,
    final_grading::{self, FinalStatus},
    portfolio,
};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;
use std::collections::HashMap;
use validator::Validate;

#[derive(Debug, Clone, Validate)]
pub struct FinalGradeInput {
    #[validate(range(min = 0.0, max = 100.0, message = "final_grade must be between 0 and 100"))]
    pub final_grade: f64,

    /// Defaults to draft.
    pub status: Option<FinalStatus>,
}

/// One portfolio of an assignment with whatever grades it has so far.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssignmentResultRow {
    pub portfolio_id: i64,
    pub student_no: String,
    pub portfolio_link: String,
    pub upload_date: DateTime<Utc>,
    pub ai_grade: Option<f64>,
    pub ai_review_report: Option<String>,
    pub graded_at: Option<DateTime<Utc>>,
    pub final_grade: Option<f64>,
    pub final_status: Option<FinalStatus>,
    pub final_updated_at: Option<DateTime<Utc>>,
}

pub struct GradingService;

impl GradingService {
    /// Record the human-confirmed grade for a portfolio, overwriting any earlier one.
    pub async fn set_final_grade(
        db: &DatabaseConnection,
        portfolio_id: i64,
        input: FinalGradeInput,
    ) -> Result<final_grading::Model, ServiceError> {
        if !input.final_grade.is_finite() {
            return Err(ServiceError::Validation(
                "final_grade must be a number".to_string(),
            ));
        }
        input.validate()?;

        let portfolio = portfolio::Entity::find_by_id(portfolio_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("portfolio {portfolio_id} not found")))?;

        let status = input.status.unwrap_or_default();
        let row = final_grading::Entity::upsert(
            db,
            &portfolio.student_no,
            portfolio_id,
            status,
            input.final_grade,
        )
        .await?;

        tracing::info!(
            portfolio_id,
            student_no = %portfolio.student_no,
            final_grade = input.final_grade,
            status = %status,
            "final grade recorded"
        );
        Ok(row)
    }

    /// Every portfolio of the assignment, newest upload first, with its AI and
    /// final grades when present.
    pub async fn list_results_by_assignment(
        db: &DatabaseConnection,
        assignment_id: i64,
    ) -> Result<Vec<AssignmentResultRow>, ServiceError> {
        let portfolios = portfolio::Entity::find()
            .filter(portfolio::Column::AssignmentId.eq(assignment_id))
            .order_by_desc(portfolio::Column::UploadDate)
            .order_by_desc(portfolio::Column::Id)
            .all(db)
            .await?;
        if portfolios.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = portfolios.iter().map(|p| p.id).collect();

        let mut ai: HashMap<i64, ai_grading::Model> = ai_grading::Entity::find()
            .filter(ai_grading::Column::PortfolioId.is_in(ids.clone()))
            .all(db)
            .await?
            .into_iter()
            .map(|g| (g.portfolio_id, g))
            .collect();

        let mut finals: HashMap<(i64, String), final_grading::Model> =
            final_grading::Entity::find()
                .filter(final_grading::Column::PortfolioId.is_in(ids))
                .all(db)
                .await?
                .into_iter()
                .map(|f| ((f.portfolio_id, f.student_no.clone()), f))
                .collect();

        Ok(portfolios
            .into_iter()
            .map(|p| {
                let ai = ai.remove(&p.id);
                let fin = finals.remove(&(p.id, p.student_no.clone()));
                AssignmentResultRow {
                    portfolio_id: p.id,
                    student_no: p.student_no,
                    portfolio_link: p.portfolio_link,
                    upload_date: p.upload_date,
                    ai_grade: ai.as_ref().and_then(|g| g.ai_grade),
                    ai_review_report: ai.as_ref().and_then(|g| g.ai_review_report.clone()),
                    graded_at: ai.as_ref().map(|g| g.graded_at),
                    final_grade: fin.as_ref().map(|f| f.final_grade),
                    final_status: fin.as_ref().map(|f| f.status),
                    final_updated_at: fin.as_ref().map(|f| f.updated_at),
                }
            })
            .collect())
    }

    /// Mark every final grade of the assignment as published. Returns the row count.
    pub async fn publish_assignment_grades(
        db: &DatabaseConnection,
        assignment_id: i64,
    ) -> Result<u64, ServiceError> {
        if !assignment::Entity::exists(db, assignment_id).await? {
            return Err(ServiceError::NotFound(format!(
                "assignment {assignment_id} not found"
            )));
        }
        let published = final_grading::Entity::publish_for_assignment(db, assignment_id).await?;
        tracing::info!(assignment_id, published, "final grades published");
        Ok(published)
    }
}
