//! Collaborator stores used by the dispatcher.
//!
//! The traits keep the dispatcher independent of the relational schema;
//! [`DbStore`] implements all three over the sea-orm entities in `db`.

use crate::request::GradeResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use db::models::{ai_grading, assignment, portfolio, rubric};
use sea_orm::{DatabaseConnection, DbErr, EntityTrait};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortfolioRecord {
    pub portfolio_id: i64,
    pub assignment_id: i64,
    pub student_no: String,
    /// Stored link, e.g. `/uploads/essay.pdf`; resolved against the storage root.
    pub portfolio_link: String,
}

impl From<portfolio::Model> for PortfolioRecord {
    fn from(m: portfolio::Model) -> Self {
        Self {
            portfolio_id: m.id,
            assignment_id: m.assignment_id,
            student_no: m.student_no,
            portfolio_link: m.portfolio_link,
        }
    }
}

/// A persisted AI grading row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredResult {
    pub portfolio_id: i64,
    pub ai_grade: Option<f64>,
    pub ai_review_report: Option<String>,
    pub graded_at: DateTime<Utc>,
}

impl From<ai_grading::Model> for StoredResult {
    fn from(m: ai_grading::Model) -> Self {
        Self {
            portfolio_id: m.portfolio_id,
            ai_grade: m.ai_grade,
            ai_review_report: m.ai_review_report,
            graded_at: m.graded_at,
        }
    }
}

#[async_trait]
pub trait PortfolioStore: Send + Sync {
    async fn assignment_exists(&self, assignment_id: i64) -> Result<bool, DbErr>;

    /// Portfolios of an assignment, in the order they are graded and reported.
    async fn list_for_assignment(&self, assignment_id: i64) -> Result<Vec<PortfolioRecord>, DbErr>;

    async fn find(&self, portfolio_id: i64) -> Result<Option<PortfolioRecord>, DbErr>;
}

#[async_trait]
pub trait RubricStore: Send + Sync {
    /// Text of the most recently created rubric; `None` if there is none or it has no text.
    async fn latest_rubric_text(&self, assignment_id: i64) -> Result<Option<String>, DbErr>;
}

#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Insert or overwrite the result for one portfolio, refreshing `graded_at`.
    async fn upsert(&self, portfolio_id: i64, result: &GradeResult) -> Result<StoredResult, DbErr>;

    async fn find_result(&self, portfolio_id: i64) -> Result<Option<StoredResult>, DbErr>;
}

/// Everything the dispatcher needs from storage.
pub trait GradingStore: PortfolioStore + RubricStore + ResultStore {}

impl<T: PortfolioStore + RubricStore + ResultStore> GradingStore for T {}

#[derive(Debug, Clone)]
pub struct DbStore {
    db: DatabaseConnection,
}

impl DbStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl PortfolioStore for DbStore {
    async fn assignment_exists(&self, assignment_id: i64) -> Result<bool, DbErr> {
        assignment::Entity::exists(&self.db, assignment_id).await
    }

    async fn list_for_assignment(&self, assignment_id: i64) -> Result<Vec<PortfolioRecord>, DbErr> {
        Ok(portfolio::Entity::list_by_assignment(&self.db, assignment_id)
            .await?
            .into_iter()
            .map(PortfolioRecord::from)
            .collect())
    }

    async fn find(&self, portfolio_id: i64) -> Result<Option<PortfolioRecord>, DbErr> {
        Ok(portfolio::Entity::find_by_id(portfolio_id)
            .one(&self.db)
            .await?
            .map(PortfolioRecord::from))
    }
}

#[async_trait]
impl RubricStore for DbStore {
    async fn latest_rubric_text(&self, assignment_id: i64) -> Result<Option<String>, DbErr> {
        Ok(rubric::Entity::latest_for_assignment(&self.db, assignment_id)
            .await?
            .and_then(|r| r.rubric_text)
            .filter(|t| !t.trim().is_empty()))
    }
}

#[async_trait]
impl ResultStore for DbStore {
    async fn upsert(&self, portfolio_id: i64, result: &GradeResult) -> Result<StoredResult, DbErr> {
        ai_grading::Entity::upsert(
            &self.db,
            portfolio_id,
            result.ai_grade,
            result.ai_review_report.clone(),
        )
        .await
        .map(StoredResult::from)
    }

    async fn find_result(&self, portfolio_id: i64) -> Result<Option<StoredResult>, DbErr> {
        Ok(ai_grading::Entity::for_portfolio(&self.db, portfolio_id)
            .await?
            .map(StoredResult::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use db::test_utils::setup_test_db;

    #[tokio::test]
    async fn newest_rubric_decides_the_text() {
        let db = setup_test_db().await;
        let a = assignment::Entity::create_assignment(&db, "A1", "2025A", "EDU101")
            .await
            .unwrap();
        let store = DbStore::new(db.clone());
        assert_eq!(store.latest_rubric_text(a.id).await.unwrap(), None);

        let t0 = Utc.with_ymd_and_hms(2025, 5, 1, 8, 0, 0).unwrap();
        rubric::Entity::create_rubric(&db, a.id, "typed", Some("Use evidence"), t0)
            .await
            .unwrap();
        assert_eq!(
            store.latest_rubric_text(a.id).await.unwrap().as_deref(),
            Some("Use evidence")
        );

        // An uploaded rubric has no text; being newest, it wins and yields no text.
        rubric::Entity::create_rubric(&db, a.id, "uploaded.pdf", None, t0 + Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(store.latest_rubric_text(a.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn upsert_round_trips_through_find_result() {
        let db = setup_test_db().await;
        let a = assignment::Entity::create_assignment(&db, "A1", "2025A", "EDU101")
            .await
            .unwrap();
        let p = portfolio::Entity::create_portfolio(&db, a.id, "u1", "/uploads/x.pdf")
            .await
            .unwrap();
        let store = DbStore::new(db);

        let stored = store
            .upsert(
                p.id,
                &GradeResult {
                    ai_grade: Some(88.0),
                    ai_review_report: Some("clear".into()),
                },
            )
            .await
            .unwrap();

        assert_eq!(store.find_result(p.id).await.unwrap(), Some(stored));
        assert_eq!(
            store.find(p.id).await.unwrap().map(|r| r.portfolio_link),
            Some("/uploads/x.pdf".to_string())
        );
    }
}
