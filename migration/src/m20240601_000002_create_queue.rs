use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Queue::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Queue::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Queue::UserId).integer().not_null())
                    .col(ColumnDef::new(Queue::Action).string().not_null())
                    .col(ColumnDef::new(Queue::Params).text().not_null())
                    .col(ColumnDef::new(Queue::Result).string().null())
                    .col(ColumnDef::new(Queue::Error).text().null())
                    .col(
                        ColumnDef::new(Queue::TryCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Queue::ProcessedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Queue::NextTryAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Queue::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Pending rows are polled every few seconds
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("queue_processed_at_idx")
                    .table(Queue::Table)
                    .col(Queue::ProcessedAt)
                    .col(Queue::NextTryAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Queue::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(Iden)]
enum Queue {
    Table,
    Id,
    UserId,
    Action,
    Params,
    Result,
    Error,
    TryCount,
    ProcessedAt,
    NextTryAt,
    CreatedAt,
}
