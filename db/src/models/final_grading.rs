//! Human-confirmed grades. A staff member reviews the AI grade and records the
//! final one as a draft; publishing flips drafts to `published` for a whole
//! assignment at once.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::{Expr, OnConflict, Query};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "final_gradings")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub student_no: String,
    pub portfolio_id: i64,
    pub status: FinalStatus,
    pub final_grade: f64,
    pub updated_at: DateTime<Utc>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "UPPERCASE")]
pub enum FinalStatus {
    #[default]
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "published")]
    Published,
}

impl fmt::Display for FinalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FinalStatus::Draft => "draft",
            FinalStatus::Published => "published",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for FinalStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "draft" => Ok(FinalStatus::Draft),
            "published" => Ok(FinalStatus::Published),
            other => Err(format!("invalid FinalStatus: {other}")),
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::portfolio::Entity",
        from = "Column::PortfolioId",
        to = "super::portfolio::Column::Id",
        on_delete = "Cascade"
    )]
    Portfolio,
}

impl Related<super::portfolio::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Portfolio.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Entity {
    /// Insert-or-overwrite the final grade keyed by (student, portfolio).
    pub async fn upsert(
        db: &DatabaseConnection,
        student_no: &str,
        portfolio_id: i64,
        status: FinalStatus,
        final_grade: f64,
    ) -> Result<Model, DbErr> {
        let active = ActiveModel {
            student_no: Set(student_no.to_string()),
            portfolio_id: Set(portfolio_id),
            status: Set(status),
            final_grade: Set(final_grade),
            updated_at: Set(Utc::now()),
            ..Default::default()
        };

        Entity::insert(active)
            .on_conflict(
                OnConflict::columns([Column::StudentNo, Column::PortfolioId])
                    .update_columns([Column::Status, Column::FinalGrade, Column::UpdatedAt])
                    .to_owned(),
            )
            .exec(db)
            .await?;

        Entity::find()
            .filter(Column::StudentNo.eq(student_no))
            .filter(Column::PortfolioId.eq(portfolio_id))
            .one(db)
            .await?
            .ok_or_else(|| {
                DbErr::RecordNotFound(format!("final grading for portfolio {portfolio_id} vanished"))
            })
    }

    /// Publish every final grade belonging to the assignment's portfolios.
    /// Returns the number of rows touched.
    pub async fn publish_for_assignment(
        db: &DatabaseConnection,
        assignment_id: i64,
    ) -> Result<u64, DbErr> {
        let portfolio_ids = Query::select()
            .column(super::portfolio::Column::Id)
            .from(super::portfolio::Entity)
            .and_where(Expr::col(super::portfolio::Column::AssignmentId).eq(assignment_id))
            .to_owned();

        let res = Entity::update_many()
            .col_expr(Column::Status, Expr::value(FinalStatus::Published.to_string()))
            .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(Column::PortfolioId.in_subquery(portfolio_ids))
            .exec(db)
            .await?;

        Ok(res.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{assignment, portfolio};
    use crate::test_utils::setup_test_db;
    use sea_orm::PaginatorTrait;

    #[tokio::test]
    async fn upsert_keeps_one_row_per_student_and_portfolio() {
        let db = setup_test_db().await;
        let a = assignment::Entity::create_assignment(&db, "A1", "2025A", "EDU101")
            .await
            .unwrap();
        let p = portfolio::Entity::create_portfolio(&db, a.id, "u1", "/uploads/p.pdf")
            .await
            .unwrap();

        Entity::upsert(&db, "u1", p.id, FinalStatus::Draft, 60.0)
            .await
            .unwrap();
        let row = Entity::upsert(&db, "u1", p.id, FinalStatus::Draft, 68.0)
            .await
            .unwrap();

        assert_eq!(Entity::find().count(&db).await.unwrap(), 1);
        assert_eq!(row.final_grade, 68.0);
        assert_eq!(row.status, FinalStatus::Draft);
    }

    #[tokio::test]
    async fn publish_only_touches_the_given_assignment() {
        let db = setup_test_db().await;
        let a = assignment::Entity::create_assignment(&db, "A1", "2025A", "EDU101")
            .await
            .unwrap();
        let b = assignment::Entity::create_assignment(&db, "A2", "2025A", "EDU101")
            .await
            .unwrap();
        let pa = portfolio::Entity::create_portfolio(&db, a.id, "u1", "/uploads/a.pdf")
            .await
            .unwrap();
        let pb = portfolio::Entity::create_portfolio(&db, b.id, "u2", "/uploads/b.pdf")
            .await
            .unwrap();
        Entity::upsert(&db, "u1", pa.id, FinalStatus::Draft, 70.0)
            .await
            .unwrap();
        Entity::upsert(&db, "u2", pb.id, FinalStatus::Draft, 80.0)
            .await
            .unwrap();

        let touched = Entity::publish_for_assignment(&db, a.id).await.unwrap();
        assert_eq!(touched, 1);

        let rows = Entity::find().all(&db).await.unwrap();
        let status_of = |pid: i64| rows.iter().find(|r| r.portfolio_id == pid).unwrap().status;
        assert_eq!(status_of(pa.id), FinalStatus::Published);
        assert_eq!(status_of(pb.id), FinalStatus::Draft);
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("PUBLISHED".parse::<FinalStatus>(), Ok(FinalStatus::Published));
        assert_eq!("draft".parse::<FinalStatus>(), Ok(FinalStatus::Draft));
        assert!("final".parse::<FinalStatus>().is_err());
    }
}
