//! Grading rubrics (many per assignment). The newest one is what the
//! scoring service is given.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder,
};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "rubrics")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub assignment_id: i64,
    pub rubric_name: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub rubric_text: Option<String>,
    pub rubric_file_path: Option<String>,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
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
    pub async fn create_rubric(
        db: &DatabaseConnection,
        assignment_id: i64,
        rubric_name: &str,
        rubric_text: Option<&str>,
        created_at: DateTime<Utc>,
    ) -> Result<Model, DbErr> {
        let active = ActiveModel {
            assignment_id: Set(assignment_id),
            rubric_name: Set(rubric_name.to_string()),
            rubric_text: Set(rubric_text.map(str::to_string)),
            rubric_file_path: Set(None),
            created_by: Set(None),
            created_at: Set(created_at),
            ..Default::default()
        };
        active.insert(db).await
    }

    /// Latest (most recently created) rubric for an assignment.
    /// Ties on `created_at` go to the higher id.
    pub async fn latest_for_assignment(
        db: &DatabaseConnection,
        assignment_id: i64,
    ) -> Result<Option<Model>, DbErr> {
        Entity::find()
            .filter(Column::AssignmentId.eq(assignment_id))
            .order_by_desc(Column::CreatedAt)
            .order_by_desc(Column::Id)
            .one(db)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::assignment;
    use crate::test_utils::setup_test_db;
    use chrono::{Duration, TimeZone};

    #[tokio::test]
    async fn latest_is_by_creation_time_not_id() {
        let db = setup_test_db().await;
        let a = assignment::Entity::create_assignment(&db, "A1", "2025A", "EDU101")
            .await
            .unwrap();
        let t0 = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();

        Entity::create_rubric(&db, a.id, "v2", Some("newest"), t0 + Duration::days(2))
            .await
            .unwrap();
        Entity::create_rubric(&db, a.id, "v1", Some("older"), t0)
            .await
            .unwrap();

        let latest = Entity::latest_for_assignment(&db, a.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.rubric_name, "v2");
        assert_eq!(latest.rubric_text.as_deref(), Some("newest"));
    }

    #[tokio::test]
    async fn no_rubric_yields_none() {
        let db = setup_test_db().await;
        let a = assignment::Entity::create_assignment(&db, "A1", "2025A", "EDU101")
            .await
            .unwrap();

        assert!(Entity::latest_for_assignment(&db, a.id)
            .await
            .unwrap()
            .is_none());
    }
}
