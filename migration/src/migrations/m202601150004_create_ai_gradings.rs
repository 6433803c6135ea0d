use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m202601150004_create_ai_gradings"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("ai_gradings"))
                    .if_not_exists()
                    // one row per portfolio: the key is the upsert target
                    .col(
                        ColumnDef::new(Alias::new("portfolio_id"))
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Alias::new("ai_grade")).double().null())
                    .col(ColumnDef::new(Alias::new("ai_review_report")).text().null())
                    .col(
                        ColumnDef::new(Alias::new("graded_at"))
                            .timestamp()
                            .not_null()
                            .default(Expr::cust("CURRENT_TIMESTAMP")),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ai_gradings_portfolio")
                            .from(Alias::new("ai_gradings"), Alias::new("portfolio_id"))
                            .to(Alias::new("portfolios"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Alias::new("ai_gradings")).to_owned())
            .await
    }
}
