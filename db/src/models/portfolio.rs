use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder,
};

/// A student's uploaded portfolio file for one assignment.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "portfolios")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub assignment_id: i64,
    pub student_no: String,
    /// Web-style link to the stored upload, e.g. `/uploads/1700000000-essay.pdf`.
    pub portfolio_link: String,
    pub upload_date: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::assignment::Entity",
        from = "Column::AssignmentId",
        to = "super::assignment::Column::Id",
        on_delete = "Cascade"
    )]
    Assignment,
}

impl Related<super::assignment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Assignment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Entity {
    pub async fn create_portfolio(
        db: &DatabaseConnection,
        assignment_id: i64,
        student_no: &str,
        portfolio_link: &str,
    ) -> Result<Model, DbErr> {
        let active = ActiveModel {
            assignment_id: Set(assignment_id),
            student_no: Set(student_no.to_string()),
            portfolio_link: Set(portfolio_link.to_string()),
            upload_date: Set(Utc::now()),
            ..Default::default()
        };
        active.insert(db).await
    }

    /// Insert with a caller-chosen id (imports and fixtures).
    pub async fn create_portfolio_with_id(
        db: &DatabaseConnection,
        id: i64,
        assignment_id: i64,
        student_no: &str,
        portfolio_link: &str,
    ) -> Result<Model, DbErr> {
        let active = ActiveModel {
            id: Set(id),
            assignment_id: Set(assignment_id),
            student_no: Set(student_no.to_string()),
            portfolio_link: Set(portfolio_link.to_string()),
            upload_date: Set(Utc::now()),
        };
        active.insert(db).await
    }

    /// All portfolios for an assignment in enumeration order (id ascending).
    pub async fn list_by_assignment(
        db: &DatabaseConnection,
        assignment_id: i64,
    ) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::AssignmentId.eq(assignment_id))
            .order_by_asc(Column::Id)
            .all(db)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::assignment;
    use crate::test_utils::setup_test_db;

    #[tokio::test]
    async fn list_by_assignment_is_scoped_and_ordered() {
        let db = setup_test_db().await;
        let a = assignment::Entity::create_assignment(&db, "A1", "2025A", "EDU101")
            .await
            .unwrap();
        let b = assignment::Entity::create_assignment(&db, "A2", "2025A", "EDU101")
            .await
            .unwrap();

        Entity::create_portfolio_with_id(&db, 30, a.id, "s3", "/uploads/c.pdf")
            .await
            .unwrap();
        Entity::create_portfolio_with_id(&db, 10, a.id, "s1", "/uploads/a.pdf")
            .await
            .unwrap();
        Entity::create_portfolio_with_id(&db, 20, b.id, "s2", "/uploads/b.pdf")
            .await
            .unwrap();

        let ids: Vec<i64> = Entity::list_by_assignment(&db, a.id)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![10, 30]);
    }
}
