use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, DatabaseConnection, DbErr, EntityTrait};

/// An assignment that students submit portfolios against.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "assignments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub assignment_name: String,
    /// Cohort label, e.g. "2025A".
    pub batch: String,
    pub course_name: String,
    pub department: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub deadline_date: Option<DateTime<Utc>>,
    pub remark: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::portfolio::Entity")]
    Portfolios,
    #[sea_orm(has_many = "super::rubric::Entity")]
    Rubrics,
}

impl Related<super::portfolio::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Portfolios.def()
    }
}

impl Related<super::rubric::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Rubrics.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Entity {
    pub async fn create_assignment(
        db: &DatabaseConnection,
        assignment_name: &str,
        batch: &str,
        course_name: &str,
    ) -> Result<Model, DbErr> {
        let active = ActiveModel {
            assignment_name: Set(assignment_name.to_string()),
            batch: Set(batch.to_string()),
            course_name: Set(course_name.to_string()),
            department: Set(None),
            start_date: Set(None),
            deadline_date: Set(None),
            remark: Set(None),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        active.insert(db).await
    }

    pub async fn exists(db: &DatabaseConnection, assignment_id: i64) -> Result<bool, DbErr> {
        Ok(Entity::find_by_id(assignment_id).one(db).await?.is_some())
    }
}
