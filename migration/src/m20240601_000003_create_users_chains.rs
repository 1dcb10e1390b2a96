use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UsersChains::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(UsersChains::UserId).integer().not_null())
                    .col(ColumnDef::new(UsersChains::ChainId).string().not_null())
                    .col(
                        ColumnDef::new(UsersChains::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(UsersChains::UserId)
                            .col(UsersChains::ChainId),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UsersChains::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(Iden)]
enum UsersChains {
    Table,
    UserId,
    ChainId,
    CreatedAt,
}
