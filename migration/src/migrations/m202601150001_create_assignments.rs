use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m202601150001_create_assignments"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("assignments"))
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Alias::new("id"))
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Alias::new("assignment_name")).string().not_null())
                    .col(ColumnDef::new(Alias::new("batch")).string().not_null())
                    .col(ColumnDef::new(Alias::new("course_name")).string().not_null())
                    .col(ColumnDef::new(Alias::new("department")).string().null())
                    .col(ColumnDef::new(Alias::new("start_date")).timestamp().null())
                    .col(ColumnDef::new(Alias::new("deadline_date")).timestamp().null())
                    .col(ColumnDef::new(Alias::new("remark")).text().null())
                    .col(
                        ColumnDef::new(Alias::new("created_at"))
                            .timestamp()
                            .not_null()
                            .default(Expr::cust("CURRENT_TIMESTAMP")),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Alias::new("assignments")).to_owned())
            .await
    }
}
