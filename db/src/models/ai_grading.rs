//! Automated grading results, one row per portfolio.
//!
//! Rows are only ever written through [`Entity::upsert`], which inserts the
//! first result for a portfolio and overwrites it on every later success.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ActiveValue::Set, DatabaseConnection, DbErr, EntityTrait};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "ai_gradings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub portfolio_id: i64,
    pub ai_grade: Option<f64>,
    #[sea_orm(column_type = "Text", nullable)]
    pub ai_review_report: Option<String>,
    /// Refreshed on every write.
    pub graded_at: DateTime<Utc>,
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
    /// Insert-or-overwrite the result for `portfolio_id` and return the stored row.
    ///
    /// Atomic per portfolio; nothing is coordinated across portfolios.
    pub async fn upsert(
        db: &DatabaseConnection,
        portfolio_id: i64,
        ai_grade: Option<f64>,
        ai_review_report: Option<String>,
    ) -> Result<Model, DbErr> {
        let active = ActiveModel {
            portfolio_id: Set(portfolio_id),
            ai_grade: Set(ai_grade),
            ai_review_report: Set(ai_review_report),
            graded_at: Set(Utc::now()),
        };

        Entity::insert(active)
            .on_conflict(
                OnConflict::column(Column::PortfolioId)
                    .update_columns([Column::AiGrade, Column::AiReviewReport, Column::GradedAt])
                    .to_owned(),
            )
            .exec(db)
            .await?;

        Entity::find_by_id(portfolio_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                DbErr::RecordNotFound(format!("ai grading for portfolio {portfolio_id} vanished"))
            })
    }

    pub async fn for_portfolio(
        db: &DatabaseConnection,
        portfolio_id: i64,
    ) -> Result<Option<Model>, DbErr> {
        Entity::find_by_id(portfolio_id).one(db).await
    }
}
