use sea_orm_migration::prelude::*;

use crate::migrations;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(migrations::m202601150001_create_assignments::Migration),
            Box::new(migrations::m202601150002_create_portfolios::Migration),
            Box::new(migrations::m202601150003_create_rubrics::Migration),
            Box::new(migrations::m202601150004_create_ai_gradings::Migration),
            Box::new(migrations::m202601150005_create_final_gradings::Migration),
        ]
    }
}
