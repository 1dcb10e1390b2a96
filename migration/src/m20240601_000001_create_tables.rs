use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Chains::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Chains::ChainId).string().not_null().primary_key())
                    .col(ColumnDef::new(Chains::ExtIds).json().not_null())
                    .col(ColumnDef::new(Chains::Content).text().null())
                    .col(
                        ColumnDef::new(Chains::Status)
                            .string()
                            .not_null()
                            .default("queue"),
                    )
                    .col(ColumnDef::new(Chains::Synced).boolean().null())
                    .col(ColumnDef::new(Chains::EarliestEntryBlock).string().null())
                    .col(ColumnDef::new(Chains::LatestEntryBlock).string().null())
                    .col(
                        ColumnDef::new(Chains::WorkerId)
                            .integer()
                            .not_null()
                            .default(-1),
                    )
                    .col(
                        ColumnDef::new(Chains::SentToPool)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Chains::FactomTime)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Chains::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Chains::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("chains_sync_idx")
                    .table(Chains::Table)
                    .col(Chains::Synced)
                    .col(Chains::WorkerId)
                    .col(Chains::SentToPool)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Entries::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Entries::EntryHash).string().not_null().primary_key())
                    .col(ColumnDef::new(Entries::ChainId).string().not_null())
                    .col(ColumnDef::new(Entries::ExtIds).json().not_null())
                    .col(ColumnDef::new(Entries::Content).text().not_null())
                    .col(
                        ColumnDef::new(Entries::Status)
                            .string()
                            .not_null()
                            .default("queue"),
                    )
                    .col(
                        ColumnDef::new(Entries::FactomTime)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Entries::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Entries::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("entries_chain_id_idx")
                    .table(Entries::Table)
                    .col(Entries::ChainId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(EBlocks::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(EBlocks::KeyMr).string().not_null().primary_key())
                    .col(ColumnDef::new(EBlocks::ChainId).string().not_null())
                    .col(ColumnDef::new(EBlocks::PrevKeyMr).string().not_null())
                    .col(ColumnDef::new(EBlocks::Timestamp).big_integer().not_null())
                    .col(ColumnDef::new(EBlocks::DbHeight).big_integer().not_null())
                    .col(
                        ColumnDef::new(EBlocks::BlockSequenceNumber)
                            .big_integer()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(EntriesEBlocks::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(EntriesEBlocks::EntryHash).string().not_null())
                    .col(ColumnDef::new(EntriesEBlocks::KeyMr).string().not_null())
                    .primary_key(
                        Index::create()
                            .col(EntriesEBlocks::EntryHash)
                            .col(EntriesEBlocks::KeyMr),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(EntriesEBlocks::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(EBlocks::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Entries::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Chains::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(Iden)]
enum Chains {
    Table,
    ChainId,
    ExtIds,
    Content,
    Status,
    Synced,
    EarliestEntryBlock,
    LatestEntryBlock,
    WorkerId,
    SentToPool,
    FactomTime,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Entries {
    Table,
    EntryHash,
    ChainId,
    ExtIds,
    Content,
    Status,
    FactomTime,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum EBlocks {
    #[iden = "eblocks"]
    Table,
    KeyMr,
    ChainId,
    PrevKeyMr,
    Timestamp,
    DbHeight,
    BlockSequenceNumber,
}

#[derive(Iden)]
enum EntriesEBlocks {
    #[iden = "entries_eblocks"]
    Table,
    EntryHash,
    KeyMr,
}
